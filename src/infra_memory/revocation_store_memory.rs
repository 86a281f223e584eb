use crate::domain_model::{TokenId, UserId};
use crate::domain_port::*;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Expired records are swept on every Nth `set_active`.
const SWEEP_EVERY: usize = 256;

/// In-process stand-in for redis. Records carry a deadline and are dropped
/// lazily once it has passed. Records nobody reads again are reclaimed by a
/// sweep every `SWEEP_EVERY` inserts, so the map stays bounded by the
/// number of live sessions plus one sweep interval.
pub struct MemoryRevocationStore {
    records: DashMap<String, DateTime<Utc>>,
    clock: Arc<dyn Clock>,
    inserts: AtomicUsize,
}

impl MemoryRevocationStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        MemoryRevocationStore {
            records: DashMap::new(),
            clock,
            inserts: AtomicUsize::new(0),
        }
    }

    /// Live records across all users.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.records.iter().filter(|r| *r.value() > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key(subject: &UserId, token_id: &str) -> String {
        record_key("", subject, token_id)
    }
}

#[async_trait::async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn set_active(
        &self,
        subject: &UserId,
        token_id: &TokenId,
        ttl: Duration,
    ) -> Result<(), RevocationStoreError> {
        let now = self.clock.now();
        let secs = ttl_secs(ttl);
        let deadline = i64::try_from(secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|delta| now.checked_add_signed(delta))
            .ok_or_else(|| RevocationStoreError::Store(format!("ttl out of range: {}s", secs)))?;

        if self.inserts.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.records.retain(|_, expires| *expires > now);
        }
        self.records
            .insert(Self::key(subject, &token_id.to_string()), deadline);
        Ok(())
    }

    async fn revoke(&self, subject: &UserId, token_id: &str) -> Result<(), RevocationStoreError> {
        let now = self.clock.now();
        match self.records.remove(&Self::key(subject, token_id)) {
            Some((_, deadline)) if deadline > now => Ok(()),
            _ => Err(RevocationStoreError::NotFound),
        }
    }

    async fn is_active(
        &self,
        subject: &UserId,
        token_id: &TokenId,
    ) -> Result<bool, RevocationStoreError> {
        let now = self.clock.now();
        let key = Self::key(subject, &token_id.to_string());
        let live = self
            .records
            .get(&key)
            .map(|deadline| *deadline > now)
            .unwrap_or(false);
        if !live {
            self.records.remove(&key);
        }
        Ok(live)
    }

    async fn revoke_all(&self, subject: &UserId) -> Result<u64, RevocationStoreError> {
        let now = self.clock.now();
        let prefix = Self::key(subject, "");
        // Collect first; removing while iterating would deadlock on the shard.
        let keys: Vec<String> = self
            .records
            .iter()
            .filter(|r| r.key().starts_with(&prefix))
            .map(|r| r.key().clone())
            .collect();

        let mut removed = 0;
        for key in keys {
            if let Some((_, deadline)) = self.records.remove(&key) {
                if deadline > now {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_port::ManualClock;

    fn store() -> (MemoryRevocationStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        (MemoryRevocationStore::new(clock.clone()), clock)
    }

    fn uid(s: &str) -> UserId {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn set_then_revoke() {
        let (store, _) = store();
        let id = TokenId::new_random();
        store.set_active(&uid("u1"), &id, Duration::from_secs(60)).await.unwrap();
        assert!(store.is_active(&uid("u1"), &id).await.unwrap());

        store.revoke(&uid("u1"), &id.to_string()).await.unwrap();
        assert!(!store.is_active(&uid("u1"), &id).await.unwrap());
        assert!(matches!(
            store.revoke(&uid("u1"), &id.to_string()).await,
            Err(RevocationStoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn record_is_scoped_to_subject() {
        let (store, _) = store();
        let id = TokenId::new_random();
        store.set_active(&uid("u1"), &id, Duration::from_secs(60)).await.unwrap();
        assert!(!store.is_active(&uid("u2"), &id).await.unwrap());
        assert!(store.revoke(&uid("u2"), &id.to_string()).await.is_err());
    }

    #[tokio::test]
    async fn expires_after_ttl() {
        let (store, clock) = store();
        let id = TokenId::new_random();
        store.set_active(&uid("u1"), &id, Duration::from_secs(60)).await.unwrap();
        clock.advance(Duration::from_secs(59));
        assert!(store.is_active(&uid("u1"), &id).await.unwrap());
        clock.advance(Duration::from_secs(1));
        assert!(!store.is_active(&uid("u1"), &id).await.unwrap());
        assert!(store.revoke(&uid("u1"), &id.to_string()).await.is_err());
    }

    #[tokio::test]
    async fn revoke_all_counts_live_records_only() {
        let (store, clock) = store();
        store
            .set_active(&uid("u1"), &TokenId::new_random(), Duration::from_secs(10))
            .await
            .unwrap();
        for _ in 0..2 {
            store
                .set_active(&uid("u1"), &TokenId::new_random(), Duration::from_secs(100))
                .await
                .unwrap();
        }
        store
            .set_active(&uid("u10"), &TokenId::new_random(), Duration::from_secs(100))
            .await
            .unwrap();
        clock.advance(Duration::from_secs(20));

        assert_eq!(store.revoke_all(&uid("u1")).await.unwrap(), 2);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn unread_expired_records_are_swept() {
        let (store, clock) = store();
        for _ in 0..SWEEP_EVERY - 1 {
            store
                .set_active(&uid("u1"), &TokenId::new_random(), Duration::from_secs(10))
                .await
                .unwrap();
        }
        assert_eq!(store.records.len(), SWEEP_EVERY - 1);

        clock.advance(Duration::from_secs(11));
        let id = TokenId::new_random();
        store.set_active(&uid("u2"), &id, Duration::from_secs(10)).await.unwrap();

        assert_eq!(store.records.len(), 1);
        assert!(store.is_active(&uid("u2"), &id).await.unwrap());
    }

    #[tokio::test]
    async fn out_of_range_ttl_is_a_store_error() {
        let (store, _) = store();
        let result = store
            .set_active(&uid("u1"), &TokenId::new_random(), Duration::from_secs(u64::MAX / 2))
            .await;
        assert!(matches!(result, Err(RevocationStoreError::Store(_))));
        assert_eq!(store.records.len(), 0);
    }
}
