// JWKS rendering: public keys for every currently valid signing key

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rsa::RsaPublicKey;
use rsa::traits::PublicKeyParts;

use crate::config::SigningConfig;
use crate::db::KeyStore;
use crate::error::Result;
use crate::types::{JsonWebKey, JwkSet, KeyMaterial};

/// Publishes the verification keys for unexpired signing keys.
///
/// Expired keys are left out, which is what makes verifiers reject tokens
/// signed with them.
#[derive(Debug, Clone)]
pub struct JwksPublisher {
    store: KeyStore,
    config: Arc<SigningConfig>,
}

impl JwksPublisher {
    pub fn new(store: KeyStore, config: Arc<SigningConfig>) -> Self {
        Self { store, config }
    }

    pub fn publish(&self, now: i64) -> Result<JwkSet> {
        let keys = self
            .store
            .find_all_valid(now)?
            .iter()
            .map(|record| {
                let material = KeyMaterial::from_record(record)?;
                Ok(self.to_jwk(&material))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(JwkSet { keys })
    }

    fn to_jwk(&self, material: &KeyMaterial) -> JsonWebKey {
        JsonWebKey {
            kid: material.kid.to_string(),
            kty: "RSA".to_string(),
            key_use: "sig".to_string(),
            alg: self.config.algorithm(),
            n: encode_modulus(&material.public_key),
            e: encode_exponent(&material.public_key),
        }
    }
}

/// Base64url modulus, left-padded to the full modulus width
pub fn encode_modulus(key: &RsaPublicKey) -> String {
    let bytes = key.n().to_bytes_be();
    let mut padded = vec![0u8; key.size().saturating_sub(bytes.len())];
    padded.extend_from_slice(&bytes);
    URL_SAFE_NO_PAD.encode(padded)
}

/// Base64url exponent in its natural big-endian width
pub fn encode_exponent(key: &RsaPublicKey) -> String {
    URL_SAFE_NO_PAD.encode(key.e().to_bytes_be())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DEFAULT_BUSY_TIMEOUT;
    use crate::error::JwksError;
    use crate::key_management::KeyGenerator;
    use jsonwebtoken::Algorithm;

    #[test]
    fn test_component_widths() {
        let record = crate::types::KeyRecord {
            kid: 1,
            private_key_pem: KeyGenerator::new().generate().unwrap(),
            expires_at: 0,
        };
        let material = KeyMaterial::from_record(&record).unwrap();

        let n = URL_SAFE_NO_PAD.decode(encode_modulus(&material.public_key)).unwrap();
        let e = URL_SAFE_NO_PAD.decode(encode_exponent(&material.public_key)).unwrap();
        assert_eq!(n.len(), 256);
        assert_eq!(e, vec![0x01, 0x00, 0x01]);
        assert_eq!(encode_exponent(&material.public_key), "AQAB");
    }

    #[test]
    fn test_publish_uses_configured_algorithm() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::open(dir.path().join("keys.db"), DEFAULT_BUSY_TIMEOUT).unwrap();
        store
            .insert(&KeyGenerator::new().generate().unwrap(), 100)
            .unwrap();

        let config = SigningConfig::new(Algorithm::PS256, "s", "i").unwrap();
        let publisher = JwksPublisher::new(store, Arc::new(config));
        let jwks = publisher.publish(0).unwrap();
        assert_eq!(jwks.keys.len(), 1);
        assert_eq!(jwks.keys[0].alg, Algorithm::PS256);
        assert_eq!(jwks.keys[0].kty, "RSA");
        assert_eq!(jwks.keys[0].key_use, "sig");
    }

    #[test]
    fn test_publish_on_broken_store_is_store_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::open(dir.path().join("keys.db"), DEFAULT_BUSY_TIMEOUT).unwrap();
        rusqlite::Connection::open(store.path())
            .unwrap()
            .execute("ALTER TABLE keys RENAME TO retired_keys", [])
            .unwrap();

        let publisher = JwksPublisher::new(store, Arc::new(SigningConfig::default()));
        assert!(matches!(
            publisher.publish(0),
            Err(JwksError::StoreUnavailable(_))
        ));
    }

    #[test]
    fn test_publish_fails_on_malformed_valid_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::open(dir.path().join("keys.db"), DEFAULT_BUSY_TIMEOUT).unwrap();
        store.insert("junk", 100).unwrap();

        let publisher = JwksPublisher::new(store, Arc::new(SigningConfig::default()));
        assert!(matches!(publisher.publish(0), Err(JwksError::Signing { .. })));
        // The same junk row is out of the window once expired
        assert!(publisher.publish(100).unwrap().keys.is_empty());
    }
}
