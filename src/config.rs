// Process configuration (flags and environment) and the immutable signing settings

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use jsonwebtoken::Algorithm;

use crate::db::DEFAULT_BUSY_TIMEOUT_MS;
use crate::error::{JwksError, Result};

pub const DEFAULT_SUBJECT: &str = "userABC";
pub const DEFAULT_ISSUER: &str = "jwks-server";
/// Ten years
pub const MAX_KEY_LIFETIME_SECS: i64 = 10 * 365 * 24 * 3600;

/// Server configuration. Every flag can also be supplied through the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "jwks-issuer", version, about = "JWKS server with expiring RSA signing keys")]
pub struct Config {
    /// Address the HTTP server binds to
    #[arg(long, env = "JWKS_BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: SocketAddr,

    /// SQLite database file holding the signing keys
    #[arg(long, env = "JWKS_DATABASE", default_value = "totally_not_my_privateKeys.db")]
    pub database: PathBuf,

    /// Lifetime of seeded keys; the expired seed key lies the same distance in the past
    #[arg(long, env = "JWKS_KEY_LIFETIME_SECS", default_value_t = 3600)]
    pub key_lifetime_secs: i64,

    /// Token signing algorithm (RSA family only)
    #[arg(long, env = "JWKS_ALGORITHM", default_value = "RS256", value_parser = parse_rsa_algorithm)]
    pub algorithm: Algorithm,

    /// Placeholder subject placed in every issued token
    #[arg(long, env = "JWKS_SUBJECT", default_value = DEFAULT_SUBJECT)]
    pub subject: String,

    /// Issuer claim placed in every issued token
    #[arg(long, env = "JWKS_ISSUER", default_value = DEFAULT_ISSUER)]
    pub issuer: String,

    /// Upper bound on waiting for a locked database, in milliseconds
    #[arg(long, env = "JWKS_BUSY_TIMEOUT_MS", default_value_t = DEFAULT_BUSY_TIMEOUT_MS)]
    pub busy_timeout_ms: u64,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "JWKS_LOG", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn signing(&self) -> Result<SigningConfig> {
        SigningConfig::new(self.algorithm, self.subject.clone(), self.issuer.clone())
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_KEY_LIFETIME_SECS).contains(&self.key_lifetime_secs) {
            return Err(JwksError::Config(format!(
                "key lifetime must be between 1 and {MAX_KEY_LIFETIME_SECS} seconds, got {}",
                self.key_lifetime_secs
            )));
        }
        self.signing().map(|_| ())
    }
}

/// Signing settings shared by the issuer and the publisher.
///
/// Immutable once built; the publisher advertises exactly the algorithm the
/// issuer signs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningConfig {
    algorithm: Algorithm,
    subject: String,
    issuer: String,
}

impl SigningConfig {
    pub fn new(algorithm: Algorithm, subject: impl Into<String>, issuer: impl Into<String>) -> Result<Self> {
        if !is_rsa_algorithm(algorithm) {
            return Err(JwksError::Config(format!(
                "{algorithm:?} is not an RSA signing algorithm"
            )));
        }
        Ok(Self {
            algorithm,
            subject: subject.into(),
            issuer: issuer.into(),
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::RS256,
            subject: DEFAULT_SUBJECT.to_string(),
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }
}

fn is_rsa_algorithm(algorithm: Algorithm) -> bool {
    matches!(
        algorithm,
        Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512
    )
}

fn parse_rsa_algorithm(value: &str) -> std::result::Result<Algorithm, String> {
    let algorithm = Algorithm::from_str(value).map_err(|e| e.to_string())?;
    if is_rsa_algorithm(algorithm) {
        Ok(algorithm)
    } else {
        Err(format!("{value} is not an RSA signing algorithm"))
    }
}
