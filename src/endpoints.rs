// HTTP handlers for token issuance and the JWKS document

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::clock::Clock;
use crate::error::JwksError;
use crate::issuer::TokenIssuer;
use crate::publisher::JwksPublisher;
use crate::types::{AuthQuery, AuthResponse, JwkSet};

/// Everything the handlers need; the core components hold no request state.
pub struct AppContext {
    pub issuer: TokenIssuer,
    pub publisher: JwksPublisher,
    pub clock: Arc<dyn Clock>,
}

/// Application state shared with the router
pub type AppState = Arc<AppContext>;

/// Errors surfaced to HTTP clients
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no suitable signing key found")]
    NotFound,

    #[error("internal server error")]
    Internal,
}

/// API error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JwksError> for ApiError {
    fn from(err: JwksError) -> Self {
        if err.is_not_found() {
            warn!(error = %err, "Request could not be served");
            ApiError::NotFound
        } else {
            // Details stay in the logs
            error!(error = %err, "Request failed");
            ApiError::Internal
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        error!(error = %err, "Blocking task failed");
        ApiError::Internal
    }
}

/// JWKS endpoint handler - serves public keys of unexpired signing keys
pub async fn jwks_handler(State(state): State<AppState>) -> Result<Json<JwkSet>, ApiError> {
    let now = state.clock.now();
    let publisher = state.publisher.clone();
    let jwks = tokio::task::spawn_blocking(move || publisher.publish(now)).await??;
    Ok(Json(jwks))
}

/// Auth endpoint handler - issues a JWT, optionally signed with an expired key
pub async fn auth_handler(
    State(state): State<AppState>,
    Query(params): Query<AuthQuery>,
) -> Result<Json<AuthResponse>, ApiError> {
    let now = state.clock.now();
    let want_expired = params.wants_expired();
    let issuer = state.issuer.clone();
    let signed = tokio::task::spawn_blocking(move || issuer.issue(want_expired, now)).await??;
    Ok(Json(AuthResponse {
        token: signed.token,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let not_found: ApiError = JwksError::NoSuitableKey(crate::types::Validity::Expired).into();
        assert!(matches!(not_found, ApiError::NotFound));
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let internal: ApiError = JwksError::Signing {
            kid: 9,
            reason: "secret detail".to_string(),
        }
        .into();
        assert!(matches!(internal, ApiError::Internal));
        assert!(!internal.to_string().contains("secret detail"));
        assert_eq!(
            internal.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
