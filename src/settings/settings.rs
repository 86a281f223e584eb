use crate::application_port::RevokePolicy;
use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub log: Log,
    pub revocation: Revocation,
    pub token: Token,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Deserialize)]
pub struct Revocation {
    pub backend: String, // "memory" or "redis"
    pub redis_url: String,
    #[serde(default)]
    pub key_prefix: String,
}

impl fmt::Debug for Revocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Revocation")
            .field("backend", &self.backend)
            .field("redis_url", &redact_url(&self.redis_url))
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

/// Hides the `user:password@` part of a connection URL.
fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.rsplit_once('@') {
        Some((_, host)) => format!("{}://<redacted>@{}", scheme, host),
        None => url.to_string(),
    }
}

#[derive(Deserialize)]
pub struct Token {
    pub private_key_path: String,
    pub public_key_path: String,
    pub refresh_secret: String,
    pub id_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
    pub issuer: String,
    #[serde(default)]
    pub revoke_policy: RevokePolicy,
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("private_key_path", &self.private_key_path)
            .field("public_key_path", &self.public_key_path)
            .field("refresh_secret", &"<redacted>")
            .field("id_ttl_secs", &self.id_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("issuer", &self.issuer)
            .field("revoke_policy", &self.revoke_policy)
            .finish()
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Environment overrides, e.g. `BALLOT_TOKEN__REFRESH_SECRET`.
const ENV_PREFIX: &str = "BALLOT";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
