// Data structures shared by the key store, issuer, publisher and HTTP layer

use std::fmt;

use jsonwebtoken::Algorithm;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};

/// Persisted signing key row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub kid: i64,                // Assigned by the store, never reused
    pub private_key_pem: String, // PKCS#1 PEM
    pub expires_at: i64,         // Unix seconds
}

/// Parsed RSA key pair with metadata, derived from a [`KeyRecord`]
#[derive(Clone)]
pub struct KeyMaterial {
    pub kid: i64,
    pub private_key: RsaPrivateKey,
    pub public_key: RsaPublicKey,
    pub expires_at: i64,
}

/// Validity predicate used to select keys.
///
/// `Valid` holds iff `expires_at > now`, `Expired` is its exact complement,
/// so every record falls into exactly one of the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Validity {
    Valid,
    Expired,
}

impl Validity {
    pub fn from_expired_flag(want_expired: bool) -> Self {
        if want_expired {
            Validity::Expired
        } else {
            Validity::Valid
        }
    }

    pub fn matches(self, expires_at: i64, now: i64) -> bool {
        match self {
            Validity::Valid => expires_at > now,
            Validity::Expired => expires_at <= now,
        }
    }

    /// SQL comparison against the `exp` column, bound to `now`
    pub(crate) fn sql_condition(self) -> &'static str {
        match self {
            Validity::Valid => "exp > ?1",
            Validity::Expired => "exp <= ?1",
        }
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validity::Valid => f.write_str("valid"),
            Validity::Expired => f.write_str("expired"),
        }
    }
}

/// JWT Claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject
    pub iss: String, // Issuer
    pub iat: i64,    // Issued at
    pub exp: i64,    // Expiry of the signing key
}

/// A signed token together with the key that signed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedToken {
    pub token: String,
    pub kid: i64,
    pub expires_at: i64,
}

/// JSON Web Key structure for JWKS response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKey {
    pub kid: String, // Key ID
    pub kty: String, // Key type (RSA)
    #[serde(rename = "use")]
    pub key_use: String, // Key usage (sig for signature)
    pub alg: Algorithm, // Must match the issuer's algorithm
    pub n: String,   // Modulus (base64url)
    pub e: String,   // Exponent (base64url)
}

/// JWKS response format
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<JsonWebKey>,
}

impl JwkSet {
    pub fn find(&self, kid: &str) -> Option<&JsonWebKey> {
        self.keys.iter().find(|key| key.kid == kid)
    }
}

/// Auth endpoint response
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
}

/// Query parameters for auth endpoint
#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    pub expired: Option<String>,
}

impl AuthQuery {
    /// `?expired` counts as set unless its value is `false` or `0`
    pub fn wants_expired(&self) -> bool {
        match self.expired.as_deref() {
            None => false,
            Some(value) => {
                let value = value.trim();
                !(value.eq_ignore_ascii_case("false") || value == "0")
            }
        }
    }
}
