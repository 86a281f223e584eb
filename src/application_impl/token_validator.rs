use crate::application_impl::{IdTokenClaims, KeyMaterial, RefreshTokenClaims, verify_claims};
use crate::application_port::{RefreshTokenInfo, TokenError};
use crate::domain_model::{Identity, TokenId, UserId};
use crate::domain_port::Clock;
use chrono::DateTime;
use std::sync::Arc;
use tracing::debug;

const ID_TOKEN_REJECTED: &str = "unable to verify user from id token";
const REFRESH_TOKEN_REJECTED: &str = "unable to verify user from refresh token";

/// Stateless verification of both token kinds.
pub struct TokenValidator {
    keys: KeyMaterial,
    issuer: String,
    clock: Arc<dyn Clock>,
}

impl TokenValidator {
    pub fn new(keys: KeyMaterial, issuer: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        TokenValidator {
            keys,
            issuer: issuer.into(),
            clock,
        }
    }

    pub fn validate_id(&self, token: &str) -> Result<Identity, TokenError> {
        let claims: IdTokenClaims =
            verify_claims(self.keys.id_signing.as_ref(), token, &self.issuer).map_err(|e| {
                debug!(error = %e, "id token rejected");
                TokenError::Authorization(ID_TOKEN_REJECTED)
            })?;
        if !self.is_unexpired(claims.exp) {
            debug!(uid = %claims.user.uid, exp = claims.exp, "id token expired");
            return Err(TokenError::Authorization(ID_TOKEN_REJECTED));
        }
        Ok(claims.user)
    }

    pub fn validate_refresh(&self, token: &str) -> Result<RefreshTokenInfo, TokenError> {
        let claims: RefreshTokenClaims =
            verify_claims(self.keys.refresh_signing.as_ref(), token, &self.issuer).map_err(
                |e| {
                    debug!(error = %e, "refresh token rejected");
                    TokenError::Authorization(REFRESH_TOKEN_REJECTED)
                },
            )?;
        if !self.is_unexpired(claims.exp) {
            debug!(sub = %claims.sub, exp = claims.exp, "refresh token expired");
            return Err(TokenError::Authorization(REFRESH_TOKEN_REJECTED));
        }

        let subject = claims.sub.parse::<UserId>().map_err(|e| {
            debug!(sub = %claims.sub, error = %e, "refresh token subject malformed");
            TokenError::Authorization(REFRESH_TOKEN_REJECTED)
        })?;
        let token_id = claims.jti.parse::<TokenId>().map_err(|e| {
            debug!(jti = %claims.jti, error = %e, "refresh token id malformed");
            TokenError::Authorization(REFRESH_TOKEN_REJECTED)
        })?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or(TokenError::Authorization(REFRESH_TOKEN_REJECTED))?;

        Ok(RefreshTokenInfo {
            token_id,
            subject,
            expires_at,
        })
    }

    // valid iff now < exp
    fn is_unexpired(&self, exp: i64) -> bool {
        self.clock.now().timestamp() < exp
    }
}
