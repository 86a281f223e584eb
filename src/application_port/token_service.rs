use crate::domain_model::{Identity, TokenId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Failure kinds visible to callers of the token core.
///
/// `Authorization` never says which check failed; the cause only goes to
/// the log.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("unauthorized: {0}")]
    Authorization(&'static str),
    #[error("internal error: {0}")]
    Internal(String),
}

impl TokenError {
    /// HTTP status an outer layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            TokenError::Authorization(_) => 401,
            TokenError::Internal(_) => 500,
        }
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, TokenError::Authorization(_))
    }
}

/// What to do when the previous refresh token cannot be revoked during
/// rotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevokePolicy {
    /// Log and keep issuing.
    #[default]
    BestEffort,
    /// Refuse to issue a new pair.
    Strict,
}

#[derive(Debug, Clone, Serialize)]
pub struct IdToken {
    #[serde(rename = "idToken")]
    pub token: String,
    #[serde(skip)]
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshToken {
    #[serde(rename = "refreshToken")]
    pub token: String,
    #[serde(skip)]
    pub id: TokenId,
    #[serde(skip)]
    pub subject: UserId,
    #[serde(skip)]
    pub expires_at: DateTime<Utc>,
}

/// Serialized as `{"idToken": "...", "refreshToken": "..."}`.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    #[serde(flatten)]
    pub id_token: IdToken,
    #[serde(flatten)]
    pub refresh_token: RefreshToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenInfo {
    pub token_id: TokenId,
    pub subject: UserId,
    pub expires_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait TokenService: Send + Sync {
    /// Issue a fresh pair for `identity`, revoking `previous_token_id` first
    /// when one is given.
    async fn new_pair_from_user(
        &self,
        identity: &Identity,
        previous_token_id: Option<&str>,
    ) -> Result<TokenPair, TokenError>;

    fn validate_id_token(&self, token: &str) -> Result<Identity, TokenError>;

    /// Signature and expiry only; the revocation store is not consulted.
    fn validate_refresh_token(&self, token: &str) -> Result<RefreshTokenInfo, TokenError>;

    /// Like `validate_refresh_token`, and additionally requires a live record.
    async fn validate_active_refresh_token(
        &self,
        token: &str,
    ) -> Result<RefreshTokenInfo, TokenError>;

    /// Revoke every refresh token of `uid`.
    async fn sign_out(&self, uid: &UserId) -> Result<u64, TokenError>;
}
