// JWKS server library: expiring RSA signing keys, token issuance and key publication

pub mod clock;
pub mod config;
pub mod db;
pub mod endpoints;
pub mod error;
pub mod issuer;
pub mod key_management;
pub mod publisher;
pub mod server;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{Config, SigningConfig};
pub use db::KeyStore;
pub use error::{JwksError, Result};
pub use issuer::TokenIssuer;
pub use key_management::KeyGenerator;
pub use publisher::JwksPublisher;
pub use types::{JsonWebKey, JwkSet, KeyMaterial, KeyRecord, SignedToken, Validity};
