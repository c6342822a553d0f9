//! HTTP surface: axum router, handlers, and the shared `AppState` wiring
//! together the `tokeninfo-core` subsystems assembled in `main.rs`. Mirrors
//! the teacher's `lib.rs` shape (central `AppState` plus `pub fn app(state)
//! -> Router`), with every service field replaced by this service's own.

use std::sync::Arc;

use tokeninfo_core::{JwtValidator, KeyLoader, ProxyCache, RevocationCache};
use tokeninfo_telemetry::Metrics;

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use router::{app, metrics_app};

/// Everything a handler needs, cloned cheaply per request the way axum's
/// `State` extractor expects.
#[derive(Clone)]
pub struct AppState {
    pub key_loader: Arc<KeyLoader>,
    pub revocation: Arc<RevocationCache>,
    pub jwt_validator: Arc<JwtValidator>,
    pub proxy_cache: Arc<ProxyCache>,
    pub metrics: Arc<Metrics>,
    /// Spec §4.7's `upstream_has_uuid_tokens` switch: when true, the proxy
    /// match predicate also requires the UUID shape; when false, any bearer
    /// that isn't a JWT is routed to the proxy.
    pub uuid_tokens: bool,
}
