use crate::application_impl::{KeyMaterial, TokenIssuer, TokenValidator};
use crate::application_port::*;
use crate::domain_model::{Identity, UserId};
use crate::domain_port::{Clock, RevocationStore, RevocationStoreError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub issuer: String,
    pub id_ttl: Duration,
    pub refresh_ttl: Duration,
    pub revoke_policy: RevokePolicy,
}

pub struct RealTokenService {
    issuer: TokenIssuer,
    validator: TokenValidator,
    store: Arc<dyn RevocationStore>,
    clock: Arc<dyn Clock>,
    config: TokenConfig,
}

impl RealTokenService {
    pub fn new(
        keys: KeyMaterial,
        config: TokenConfig,
        store: Arc<dyn RevocationStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            issuer: TokenIssuer::new(keys.clone(), config.issuer.clone(), clock.clone()),
            validator: TokenValidator::new(keys, config.issuer.clone(), clock.clone()),
            store,
            clock,
            config,
        }
    }

    async fn revoke_previous(&self, uid: &UserId, previous: &str) -> Result<(), TokenError> {
        let err = match self.store.revoke(uid, previous).await {
            Ok(()) => {
                debug!(uid = %uid, token_id = %previous, "previous refresh token revoked");
                return Ok(());
            }
            Err(e) => e,
        };

        match (self.config.revoke_policy, err) {
            (RevokePolicy::BestEffort, e) => {
                warn!(uid = %uid, token_id = %previous, error = %e, "could not revoke previous refresh token");
                Ok(())
            }
            (RevokePolicy::Strict, RevocationStoreError::NotFound) => {
                warn!(uid = %uid, token_id = %previous, "previous refresh token does not exist");
                Err(TokenError::Authorization("invalid refresh token"))
            }
            (RevokePolicy::Strict, RevocationStoreError::Store(e)) => {
                error!(uid = %uid, token_id = %previous, error = %e, "could not revoke previous refresh token");
                Err(TokenError::Internal(e))
            }
        }
    }
}

#[async_trait::async_trait]
impl TokenService for RealTokenService {
    async fn new_pair_from_user(
        &self,
        identity: &Identity,
        previous_token_id: Option<&str>,
    ) -> Result<TokenPair, TokenError> {
        let uid = &identity.uid;

        // Revoke before issuing so old and new overlap only until the new
        // record is set.
        if let Some(previous) = previous_token_id.filter(|p| !p.is_empty()) {
            self.revoke_previous(uid, previous).await?;
        }

        let pair = self
            .issuer
            .issue_pair(identity, self.config.id_ttl, self.config.refresh_ttl)?;

        let remaining = (pair.refresh_token.expires_at - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        self.store
            .set_active(uid, &pair.refresh_token.id, remaining)
            .await
            .map_err(|e| {
                error!(uid = %uid, token_id = %pair.refresh_token.id, error = %e, "error storing refresh token id");
                TokenError::Internal(e.to_string())
            })?;

        info!(uid = %uid, token_id = %pair.refresh_token.id, "issued token pair");
        Ok(pair)
    }

    fn validate_id_token(&self, token: &str) -> Result<Identity, TokenError> {
        self.validator.validate_id(token)
    }

    fn validate_refresh_token(&self, token: &str) -> Result<RefreshTokenInfo, TokenError> {
        self.validator.validate_refresh(token)
    }

    async fn validate_active_refresh_token(
        &self,
        token: &str,
    ) -> Result<RefreshTokenInfo, TokenError> {
        let info = self.validator.validate_refresh(token)?;
        let active = self
            .store
            .is_active(&info.subject, &info.token_id)
            .await
            .map_err(|e| {
                error!(uid = %info.subject, token_id = %info.token_id, error = %e, "error checking refresh token id");
                TokenError::Internal(e.to_string())
            })?;
        if !active {
            debug!(uid = %info.subject, token_id = %info.token_id, "refresh token revoked");
            return Err(TokenError::Authorization(
                "unable to verify user from refresh token",
            ));
        }
        Ok(info)
    }

    async fn sign_out(&self, uid: &UserId) -> Result<u64, TokenError> {
        let removed = self.store.revoke_all(uid).await.map_err(|e| {
            error!(uid = %uid, error = %e, "error revoking refresh tokens");
            TokenError::Internal(e.to_string())
        })?;
        info!(uid = %uid, removed, "signed out");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::TokenId;
    use crate::domain_port::ManualClock;
    use crate::infra_memory::MemoryRevocationStore;
    use chrono::Utc;

    fn service(
        policy: RevokePolicy,
    ) -> (RealTokenService, Arc<MemoryRevocationStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = Arc::new(MemoryRevocationStore::new(clock.clone()));
        let keys = KeyMaterial::from_pem(
            include_bytes!("../../cert/rsa_private_test.pem"),
            include_bytes!("../../cert/rsa_public_test.pem"),
            "anotsorandomtestsecret",
        )
        .unwrap();
        let config = TokenConfig {
            issuer: "ballot-auth".to_string(),
            id_ttl: Duration::from_secs(900),
            refresh_ttl: Duration::from_secs(259200),
            revoke_policy: policy,
        };
        let svc = RealTokenService::new(keys, config, store.clone(), clock.clone());
        (svc, store, clock)
    }

    fn identity() -> Identity {
        Identity::new("u1".parse().unwrap(), "a@b.com")
    }

    async fn active(store: &MemoryRevocationStore, id: &TokenId) -> bool {
        store.is_active(&identity().uid, id).await.unwrap()
    }

    #[tokio::test]
    async fn issues_and_registers() {
        let (svc, store, _) = service(RevokePolicy::BestEffort);
        let pair = svc.new_pair_from_user(&identity(), None).await.unwrap();

        assert_eq!(svc.validate_id_token(&pair.id_token.token).unwrap(), identity());
        let info = svc.validate_refresh_token(&pair.refresh_token.token).unwrap();
        assert_eq!(info.subject.as_str(), "u1");
        assert_eq!(info.token_id, pair.refresh_token.id);
        assert!(active(&store, &info.token_id).await);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn empty_previous_means_none() {
        let (svc, store, _) = service(RevokePolicy::Strict);
        svc.new_pair_from_user(&identity(), Some("")).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn rotation_swaps_records() {
        let (svc, store, _) = service(RevokePolicy::Strict);
        let first = svc.new_pair_from_user(&identity(), None).await.unwrap();
        let first_id = first.refresh_token.id.to_string();
        let second = svc
            .new_pair_from_user(&identity(), Some(&first_id))
            .await
            .unwrap();

        assert!(!active(&store, &first.refresh_token.id).await);
        assert!(active(&store, &second.refresh_token.id).await);
        assert_ne!(first.refresh_token.id, second.refresh_token.id);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn missing_previous_is_swallowed_by_default() {
        let (svc, store, _) = service(RevokePolicy::BestEffort);
        let pair = svc
            .new_pair_from_user(&identity(), Some("nonexistent-id"))
            .await
            .unwrap();
        assert!(svc.validate_id_token(&pair.id_token.token).is_ok());
        assert!(active(&store, &pair.refresh_token.id).await);
    }

    #[tokio::test]
    async fn missing_previous_fails_when_strict() {
        let (svc, store, _) = service(RevokePolicy::Strict);
        let err = svc
            .new_pair_from_user(&identity(), Some("nonexistent-id"))
            .await
            .unwrap_err();
        assert!(err.is_authorization());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn cross_check_rejects_rotated_token() {
        let (svc, _, _) = service(RevokePolicy::BestEffort);
        let first = svc.new_pair_from_user(&identity(), None).await.unwrap();
        assert!(
            svc.validate_active_refresh_token(&first.refresh_token.token)
                .await
                .is_ok()
        );

        let first_id = first.refresh_token.id.to_string();
        svc.new_pair_from_user(&identity(), Some(&first_id))
            .await
            .unwrap();

        // Still well formed and unexpired, but its record is gone.
        assert!(svc.validate_refresh_token(&first.refresh_token.token).is_ok());
        let err = svc
            .validate_active_refresh_token(&first.refresh_token.token)
            .await
            .unwrap_err();
        assert!(err.is_authorization());
    }

    #[tokio::test]
    async fn record_expires_with_token() {
        let (svc, store, clock) = service(RevokePolicy::BestEffort);
        let pair = svc.new_pair_from_user(&identity(), None).await.unwrap();
        clock.advance(Duration::from_secs(259200 + 1));
        assert!(!active(&store, &pair.refresh_token.id).await);
        assert!(
            svc.validate_active_refresh_token(&pair.refresh_token.token)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn sign_out_removes_all_sessions() {
        let (svc, store, _) = service(RevokePolicy::BestEffort);
        for _ in 0..3 {
            svc.new_pair_from_user(&identity(), None).await.unwrap();
        }
        let other = Identity::new("u2".parse().unwrap(), "c@d.com");
        let kept = svc.new_pair_from_user(&other, None).await.unwrap();

        assert_eq!(svc.sign_out(&identity().uid).await.unwrap(), 3);
        assert_eq!(store.len(), 1);
        assert!(store.is_active(&other.uid, &kept.refresh_token.id).await.unwrap());
    }
}
