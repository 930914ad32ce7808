// Error taxonomy for key generation, storage, signing and configuration

use thiserror::Error;

use crate::types::Validity;

pub type Result<T> = std::result::Result<T, JwksError>;

#[derive(Debug, Error)]
pub enum JwksError {
    /// The RSA primitive failed or produced a key that did not pass validation.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// The SQLite store could not be opened, read or written.
    #[error("key store unavailable: {0}")]
    StoreUnavailable(#[from] rusqlite::Error),

    /// No stored key satisfies the requested validity predicate.
    #[error("no {0} signing key available")]
    NoSuitableKey(Validity),

    /// Stored key material is malformed or the signing primitive failed.
    #[error("signing with key {kid} failed: {reason}")]
    Signing { kid: i64, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl JwksError {
    pub(crate) fn signing(kid: i64, err: impl std::fmt::Display) -> Self {
        JwksError::Signing {
            kid,
            reason: err.to_string(),
        }
    }

    /// Whether the caller should see a not-found condition rather than an internal failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, JwksError::NoSuitableKey(_))
    }
}
