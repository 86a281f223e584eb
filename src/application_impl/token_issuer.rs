use crate::application_impl::{KeyMaterial, sign_claims};
use crate::application_port::{IdToken, RefreshToken, TokenError, TokenPair};
use crate::domain_model::{Identity, TokenId};
use crate::domain_port::Clock;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct IdTokenClaims {
    pub user: Identity,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RefreshTokenClaims {
    pub sub: String, // user id as string
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// Mints ID and refresh tokens. Persists nothing.
pub struct TokenIssuer {
    keys: KeyMaterial,
    issuer: String,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(keys: KeyMaterial, issuer: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        TokenIssuer {
            keys,
            issuer: issuer.into(),
            clock,
        }
    }

    pub fn issue_pair(
        &self,
        identity: &Identity,
        id_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Result<TokenPair, TokenError> {
        let iat = self.clock.now();
        let id_token = self.encode_id(identity, iat, id_ttl)?;
        let refresh_token = self.encode_refresh(identity, iat, refresh_ttl)?;
        Ok(TokenPair {
            id_token,
            refresh_token,
        })
    }

    fn encode_id(
        &self,
        identity: &Identity,
        iat: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<IdToken, TokenError> {
        let exp = expiry(iat, ttl)?;
        let claims = IdTokenClaims {
            user: identity.clone(),
            iat: iat.timestamp(),
            exp: exp.timestamp(),
            iss: self.issuer.clone(),
        };
        let token = sign_claims(self.keys.id_signing.as_ref(), &claims).map_err(|e| {
            error!(uid = %identity.uid, error = %e, "error generating id token");
            TokenError::Internal(format!("id token signing failed: {}", e))
        })?;
        Ok(IdToken {
            token,
            expires_at: exp,
        })
    }

    fn encode_refresh(
        &self,
        identity: &Identity,
        iat: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<RefreshToken, TokenError> {
        let id = TokenId::new_random();
        let exp = expiry(iat, ttl)?;
        let claims = RefreshTokenClaims {
            sub: identity.uid.to_string(),
            jti: id.to_string(),
            iat: iat.timestamp(),
            exp: exp.timestamp(),
            iss: self.issuer.clone(),
        };
        let token = sign_claims(self.keys.refresh_signing.as_ref(), &claims).map_err(|e| {
            error!(uid = %identity.uid, error = %e, "error generating refresh token");
            TokenError::Internal(format!("refresh token signing failed: {}", e))
        })?;
        Ok(RefreshToken {
            token,
            id,
            subject: identity.uid.clone(),
            expires_at: exp,
        })
    }
}

/// `iat + ttl` truncated to the whole second written into `exp`.
fn expiry(iat: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, TokenError> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|delta| iat.checked_add_signed(delta))
        .and_then(|exp| DateTime::from_timestamp(exp.timestamp(), 0))
        .ok_or_else(|| {
            error!(ttl_secs = ttl.as_secs(), "token ttl out of range");
            TokenError::Internal(format!("token ttl out of range: {}s", ttl.as_secs()))
        })
}
