use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// A sign/verify capability for JWT claims.
///
/// ID tokens and refresh tokens are signed by two independent strategies so
/// that other services only ever need the RSA public key.
pub trait SigningStrategy: Send + Sync {
    fn algorithm(&self) -> Algorithm;
    fn encoding_key(&self) -> &EncodingKey;
    fn decoding_key(&self) -> &DecodingKey;
}

/// RS256 over a PEM encoded RSA key pair.
pub struct RsaSigning {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl RsaSigning {
    pub fn from_pem(
        private_pem: &[u8],
        public_pem: &[u8],
    ) -> Result<Self, jsonwebtoken::errors::Error> {
        Ok(RsaSigning {
            encoding: EncodingKey::from_rsa_pem(private_pem)?,
            decoding: DecodingKey::from_rsa_pem(public_pem)?,
        })
    }
}

impl SigningStrategy for RsaSigning {
    fn algorithm(&self) -> Algorithm {
        Algorithm::RS256
    }

    fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }
}

impl fmt::Debug for RsaSigning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RsaSigning(RS256)")
    }
}

/// HS256 over a shared secret.
pub struct SecretSigning {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SecretSigning {
    pub fn new(secret: &[u8]) -> Self {
        SecretSigning {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

impl SigningStrategy for SecretSigning {
    fn algorithm(&self) -> Algorithm {
        Algorithm::HS256
    }

    fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }
}

impl fmt::Debug for SecretSigning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretSigning(HS256)")
    }
}

pub fn sign_claims<C: Serialize>(
    strategy: &dyn SigningStrategy,
    claims: &C,
) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::new(strategy.algorithm()),
        claims,
        strategy.encoding_key(),
    )
}

/// Checks signature, algorithm and issuer. Expiry is left to the caller,
/// which compares `exp` against its own clock without leeway.
pub fn verify_claims<C: DeserializeOwned>(
    strategy: &dyn SigningStrategy,
    token: &str,
    issuer: &str,
) -> Result<C, jsonwebtoken::errors::Error> {
    let mut v = Validation::new(strategy.algorithm());
    v.validate_exp = false;
    v.validate_aud = false;
    v.set_issuer(&[issuer]);
    v.set_required_spec_claims(&["exp", "iss"]);
    let data = decode::<C>(token, strategy.decoding_key(), &v)?;
    Ok(data.claims)
}
