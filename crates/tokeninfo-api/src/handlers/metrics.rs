//! `GET /metrics` (spec §6): the metrics registry serialized as JSON, served
//! on the separate `metrics_listen_address` listener configured in
//! `main.rs`.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::AppState;

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}
