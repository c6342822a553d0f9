use axum::routing::get;
use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

use crate::handlers::{certs, health, metrics, tokeninfo};
use crate::middleware::{request_id_middleware, security_headers_middleware};
use crate::AppState;

/// The main listener: tokeninfo, JWKS publishing, and liveness.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/oauth2/tokeninfo", get(tokeninfo::tokeninfo))
        .route("/oauth2/connect/keys", get(certs::jwks))
        .route("/health", get(health::health_check))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// A separate listener for `/metrics` (spec §6), bound to
/// `metrics_listen_address` rather than sharing the public listener.
pub fn metrics_app(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(metrics::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
