// JWKS server binary
//
// Serves a JSON Web Key Set for the unexpired keys in its SQLite store and
// issues RS256 tokens, optionally signed with an expired key so clients can
// exercise their rejection paths.

use clap::Parser;
use jwks_issuer::{Config, server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    server::start_server(config).await
}
