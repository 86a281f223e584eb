use crate::application_impl::{RsaSigning, SecretSigning, SigningStrategy, sign_claims, verify_claims};
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

const PROBE_ISSUER: &str = "key-material-probe";

#[derive(Serialize, Deserialize)]
struct ProbeClaims {
    iss: String,
    exp: i64,
}

/// Signing keys for both token kinds. Loaded once at startup and shared
/// read-only afterwards.
#[derive(Clone)]
pub struct KeyMaterial {
    pub id_signing: Arc<dyn SigningStrategy>,
    pub refresh_signing: Arc<dyn SigningStrategy>,
}

impl KeyMaterial {
    pub fn new(
        id_signing: Arc<dyn SigningStrategy>,
        refresh_signing: Arc<dyn SigningStrategy>,
    ) -> Self {
        KeyMaterial {
            id_signing,
            refresh_signing,
        }
    }

    /// Parse PEM bytes and the refresh secret, then prove the RSA halves
    /// belong together by signing and verifying a probe token.
    pub fn from_pem(private_pem: &[u8], public_pem: &[u8], refresh_secret: &str) -> Result<Self> {
        if refresh_secret.is_empty() {
            return Err(anyhow!("refresh token secret is empty"));
        }
        let rsa = RsaSigning::from_pem(private_pem, public_pem)
            .context("could not parse RSA key pair")?;

        let probe = ProbeClaims {
            iss: PROBE_ISSUER.to_string(),
            exp: i64::MAX,
        };
        let token = sign_claims(&rsa, &probe).context("could not sign with RSA private key")?;
        verify_claims::<ProbeClaims>(&rsa, &token, PROBE_ISSUER)
            .context("RSA public key does not match private key")?;

        Ok(KeyMaterial::new(
            Arc::new(rsa),
            Arc::new(SecretSigning::new(refresh_secret.as_bytes())),
        ))
    }

    pub fn load(
        private_key_path: impl AsRef<Path>,
        public_key_path: impl AsRef<Path>,
        refresh_secret: &str,
    ) -> Result<Self> {
        let private_key_path = private_key_path.as_ref();
        let public_key_path = public_key_path.as_ref();
        let private_pem = std::fs::read(private_key_path).with_context(|| {
            format!("could not read private key pem file {:?}", private_key_path)
        })?;
        let public_pem = std::fs::read(public_key_path).with_context(|| {
            format!("could not read public key pem file {:?}", public_key_path)
        })?;
        Self::from_pem(&private_pem, &public_pem, refresh_secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVATE: &[u8] = include_bytes!("../../cert/rsa_private_test.pem");
    const PUBLIC: &[u8] = include_bytes!("../../cert/rsa_public_test.pem");
    const OTHER_PUBLIC: &[u8] = include_bytes!("../../cert/rsa_public_other_test.pem");

    #[test]
    fn loads_matching_pair() {
        let keys = KeyMaterial::from_pem(PRIVATE, PUBLIC, "anotsorandomtestsecret").unwrap();
        assert_eq!(keys.id_signing.algorithm(), jsonwebtoken::Algorithm::RS256);
        assert_eq!(keys.refresh_signing.algorithm(), jsonwebtoken::Algorithm::HS256);
    }

    #[test]
    fn rejects_mismatched_pair() {
        assert!(KeyMaterial::from_pem(PRIVATE, OTHER_PUBLIC, "secret").is_err());
    }

    #[test]
    fn rejects_empty_secret() {
        assert!(KeyMaterial::from_pem(PRIVATE, PUBLIC, "").is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = KeyMaterial::load("cert/missing.pem", "cert/rsa_public_test.pem", "s")
            .err()
            .unwrap();
        assert!(err.to_string().contains("could not read private key"));
    }

    #[test]
    fn load_from_files() {
        assert!(
            KeyMaterial::load("cert/rsa_private_test.pem", "cert/rsa_public_test.pem", "s").is_ok()
        );
    }
}
