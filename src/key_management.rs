// RSA key generation and derivation of key material from stored records

use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use tracing::debug;

use crate::error::{JwksError, Result};
use crate::types::{KeyMaterial, KeyRecord};

pub const KEY_BITS: usize = 2048;
pub const PUBLIC_EXPONENT: u64 = 65537;

/// Generates 2048-bit RSA keys with exponent 65537, serialized as PKCS#1 PEM
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyGenerator;

impl KeyGenerator {
    pub fn new() -> Self {
        KeyGenerator
    }

    /// Generate a fresh private key and return its unencrypted PKCS#1 PEM
    pub fn generate(&self) -> Result<String> {
        let mut rng = OsRng;
        let exponent = BigUint::from(PUBLIC_EXPONENT);
        let private_key = RsaPrivateKey::new_with_exp(&mut rng, KEY_BITS, &exponent)
            .map_err(|e| JwksError::KeyGeneration(e.to_string()))?;

        private_key
            .validate()
            .map_err(|e| JwksError::KeyGeneration(e.to_string()))?;
        if private_key.size() * 8 != KEY_BITS {
            return Err(JwksError::KeyGeneration(format!(
                "expected a {KEY_BITS}-bit modulus, got {} bits",
                private_key.size() * 8
            )));
        }

        let pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| JwksError::KeyGeneration(e.to_string()))?;
        debug!(bits = KEY_BITS, "Generated RSA private key");
        Ok(pem.to_string())
    }
}

impl KeyMaterial {
    /// Parse the stored PEM and derive the public half
    pub fn from_record(record: &KeyRecord) -> Result<Self> {
        let private_key = RsaPrivateKey::from_pkcs1_pem(&record.private_key_pem)
            .map_err(|e| JwksError::signing(record.kid, e))?;
        let public_key = RsaPublicKey::from(&private_key);

        Ok(KeyMaterial {
            kid: record.kid,
            private_key,
            public_key,
            expires_at: record.expires_at,
        })
    }

    /// Check if the key has expired at `now`
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }

    /// Check if the key is still valid at `now`
    pub fn is_valid(&self, now: i64) -> bool {
        !self.is_expired(now)
    }
}
