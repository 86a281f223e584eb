use crate::domain_model::{TokenId, UserId};
use std::time::Duration;

/// Registry of live refresh tokens, keyed by `subject:token_id`.
///
/// A present record means the refresh token may still be exchanged; an
/// absent one (deleted or expired through its TTL) means it is revoked.
#[async_trait::async_trait]
pub trait RevocationStore: Send + Sync {
    /// Register a freshly issued refresh token for `ttl`.
    async fn set_active(
        &self,
        subject: &UserId,
        token_id: &TokenId,
        ttl: Duration,
    ) -> Result<(), RevocationStoreError>;

    /// Delete the record. `token_id` is whatever the caller presented and may
    /// not be a well-formed id.
    async fn revoke(&self, subject: &UserId, token_id: &str) -> Result<(), RevocationStoreError>;

    async fn is_active(
        &self,
        subject: &UserId,
        token_id: &TokenId,
    ) -> Result<bool, RevocationStoreError>;

    /// Delete every record of `subject`, returning how many were removed.
    async fn revoke_all(&self, subject: &UserId) -> Result<u64, RevocationStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RevocationStoreError {
    #[error("refresh token record not found")]
    NotFound,
    #[error("store error: {0}")]
    Store(String),
}

/// Store key for one refresh token record.
pub fn record_key(prefix: &str, subject: &UserId, token_id: &str) -> String {
    if prefix.is_empty() {
        format!("{}:{}", subject, token_id)
    } else {
        format!("{}:{}:{}", prefix, subject, token_id)
    }
}

/// Whole seconds covering `ttl`, never below one. `SET ... EX 0` is an error
/// in redis and a zero TTL would make the record dead on arrival.
pub fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}
