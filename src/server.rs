// Server setup and configuration

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::config::{Config, SigningConfig};
use crate::db::KeyStore;
use crate::endpoints::{AppContext, AppState, auth_handler, jwks_handler};
use crate::issuer::TokenIssuer;
use crate::key_management::KeyGenerator;
use crate::publisher::JwksPublisher;

/// Wire the issuer and publisher over one store and one signing config
pub fn build_state(store: KeyStore, signing: SigningConfig, clock: Arc<dyn Clock>) -> AppState {
    let signing = Arc::new(signing);
    Arc::new(AppContext {
        issuer: TokenIssuer::new(store.clone(), Arc::clone(&signing)),
        publisher: JwksPublisher::new(store, signing),
        clock,
    })
}

/// Create the application router with all endpoints
pub fn create_app(app_state: AppState) -> Router {
    Router::new()
        .route("/.well-known/jwks.json", get(jwks_handler))
        .route("/jwks", get(jwks_handler)) // Alternative endpoint
        .route("/auth", post(auth_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

pub async fn start_server(config: Config) -> anyhow::Result<()> {
    config.validate()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Seed keys so clients always find one valid and one expired key
    let store = KeyStore::open(&config.database, config.busy_timeout())?;
    let seed_store = store.clone();
    let now = clock.now();
    let lifetime = config.key_lifetime_secs;
    let seeded = tokio::task::spawn_blocking(move || {
        seed_store.seed(&KeyGenerator::new(), now, lifetime)
    })
    .await??;

    let app = create_app(build_state(store, config.signing()?, clock));

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(
        addr = %config.bind_addr,
        database = %config.database.display(),
        seeded = seeded.len(),
        "JWKS server listening"
    );
    info!("Endpoints: GET /.well-known/jwks.json, GET /jwks, POST /auth[?expired]");

    axum::serve(listener, app).await?;

    Ok(())
}
