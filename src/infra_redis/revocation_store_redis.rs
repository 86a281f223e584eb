use crate::domain_model::{TokenId, UserId};
use crate::domain_port::*;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::debug;

const SCAN_BATCH: usize = 100;

pub struct RedisRevocationStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisRevocationStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisRevocationStore {
            conn,
            prefix: prefix.into(),
        }
    }

    fn key(&self, subject: &UserId, token_id: &str) -> String {
        record_key(&self.prefix, subject, token_id)
    }
}

#[async_trait::async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn set_active(
        &self,
        subject: &UserId,
        token_id: &TokenId,
        ttl: Duration,
    ) -> Result<(), RevocationStoreError> {
        let key = self.key(subject, &token_id.to_string());
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(&key, 1u8, ttl_secs(ttl))
            .await
            .map_err(|e| RevocationStoreError::Store(e.to_string()))?;
        Ok(())
    }

    async fn revoke(&self, subject: &UserId, token_id: &str) -> Result<(), RevocationStoreError> {
        let key = self.key(subject, token_id);
        let mut conn = self.conn.clone();
        let removed: u64 = conn
            .del(&key)
            .await
            .map_err(|e| RevocationStoreError::Store(e.to_string()))?;
        if removed < 1 {
            return Err(RevocationStoreError::NotFound);
        }
        Ok(())
    }

    async fn is_active(
        &self,
        subject: &UserId,
        token_id: &TokenId,
    ) -> Result<bool, RevocationStoreError> {
        let key = self.key(subject, &token_id.to_string());
        let mut conn = self.conn.clone();
        let exists: bool = conn
            .exists(&key)
            .await
            .map_err(|e| RevocationStoreError::Store(e.to_string()))?;
        Ok(exists)
    }

    async fn revoke_all(&self, subject: &UserId) -> Result<u64, RevocationStoreError> {
        let pattern = self.key(subject, "*");
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| RevocationStoreError::Store(e.to_string()))?;
            if !keys.is_empty() {
                let n: u64 = conn
                    .del(&keys)
                    .await
                    .map_err(|e| RevocationStoreError::Store(e.to_string()))?;
                removed += n;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }
        debug!(uid = %subject, removed, "scanned and deleted refresh token records");
        Ok(removed)
    }
}
