//! `GET /health` (spec §6): 200 while the key loader holds at least one
//! key, 503 otherwise. Not tied to the success of the most recent refresh —
//! the JWKS loader's empty-response safety gate (spec §4.4) means a failed
//! refresh simply leaves the last-good key set in place.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let key_count = state.key_loader.keys().await.map(|keys| keys.len()).unwrap_or(0);

    if key_count > 0 {
        (StatusCode::OK, format!("OK\n{}\n", env!("CARGO_PKG_VERSION")))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("No keys available\n{}\n", env!("CARGO_PKG_VERSION")),
        )
    }
}
