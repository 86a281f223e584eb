use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::{self, Settings};
use anyhow::anyhow;
use chrono::{TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;

pub struct Server {
    pub token_service: Arc<dyn TokenService>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let token_settings = &settings.token;
        let config = token_config(token_settings)?;
        let keys = KeyMaterial::load(
            &token_settings.private_key_path,
            &token_settings.public_key_path,
            &token_settings.refresh_secret,
        )?;
        info!(
            private_key = %token_settings.private_key_path,
            public_key = %token_settings.public_key_path,
            "loaded token key material"
        );

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let store: Arc<dyn RevocationStore> = match settings.revocation.backend.as_str() {
            "memory" => {
                warn!("using in-process revocation store; records are lost on exit");
                Arc::new(MemoryRevocationStore::new(clock.clone()))
            }
            "redis" => {
                let redis_client = redis::Client::open(settings.revocation.redis_url.as_str())?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(RedisRevocationStore::new(
                    redis_manager,
                    settings.revocation.key_prefix.clone(),
                ))
            }
            other => return Err(anyhow!("Unknown revocation backend: {}", other)),
        };

        debug!(?config);

        let token_service: Arc<dyn TokenService> =
            Arc::new(RealTokenService::new(keys, config, store, clock));

        Ok(Server { token_service })
    }
}

fn token_config(token: &settings::Token) -> anyhow::Result<TokenConfig> {
    Ok(TokenConfig {
        issuer: token.issuer.clone(),
        id_ttl: ttl_from_secs("id_ttl_secs", token.id_ttl_secs)?,
        refresh_ttl: ttl_from_secs("refresh_ttl_secs", token.refresh_ttl_secs)?,
        revoke_policy: token.revoke_policy,
    })
}

/// A TTL must be positive and small enough that `now + ttl` is a valid
/// timestamp.
fn ttl_from_secs(name: &str, secs: u64) -> anyhow::Result<Duration> {
    if secs == 0 {
        return Err(anyhow!("token.{} must be greater than zero", name));
    }
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|delta| Utc::now().checked_add_signed(delta))
        .ok_or_else(|| anyhow!("token.{} is out of range: {}", name, secs))?;
    Ok(Duration::from_secs(secs))
}
