// Token issuance: pick a key by validity, sign claims whose expiry mirrors the key's

use std::sync::Arc;

use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::debug;

use crate::config::SigningConfig;
use crate::db::KeyStore;
use crate::error::{JwksError, Result};
use crate::types::{Claims, SignedToken, Validity};

/// Signs tokens with keys selected from the store.
///
/// The token's `exp` is the selected key's expiry rather than `now + ttl`, so
/// asking for an expired key yields a token that is already expired.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    store: KeyStore,
    config: Arc<SigningConfig>,
}

impl TokenIssuer {
    pub fn new(store: KeyStore, config: Arc<SigningConfig>) -> Self {
        Self { store, config }
    }

    pub fn issue(&self, want_expired: bool, now: i64) -> Result<SignedToken> {
        let validity = Validity::from_expired_flag(want_expired);
        let record = self
            .store
            .find_one(validity, now)?
            .ok_or(JwksError::NoSuitableKey(validity))?;

        let claims = Claims {
            sub: self.config.subject().to_string(),
            iss: self.config.issuer().to_string(),
            iat: now,
            exp: record.expires_at,
        };

        let mut header = Header::new(self.config.algorithm());
        header.kid = Some(record.kid.to_string());

        let encoding_key = EncodingKey::from_rsa_pem(record.private_key_pem.as_bytes())
            .map_err(|e| JwksError::signing(record.kid, e))?;
        let token =
            encode(&header, &claims, &encoding_key).map_err(|e| JwksError::signing(record.kid, e))?;

        debug!(kid = record.kid, exp = record.expires_at, %validity, "Issued token");
        Ok(SignedToken {
            token,
            kid: record.kid,
            expires_at: record.expires_at,
        })
    }
}
