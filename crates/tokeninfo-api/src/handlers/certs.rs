//! `GET /oauth2/connect/keys` (spec §6): republishes the current JWKS key
//! cache. Each entry's original wire fields survive in `CachedKey::raw`
//! precisely so this handler can re-encode them rather than reconstruct
//! them from an opaque `jsonwebtoken::DecodingKey`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::AppState;

#[derive(Serialize)]
struct JwksResponse {
    keys: Vec<Value>,
}

pub async fn jwks(State(state): State<AppState>) -> impl IntoResponse {
    let cached = match state.key_loader.keys().await {
        Ok(keys) => keys,
        Err(_) => return (StatusCode::INTERNAL_SERVER_ERROR, "key cache unavailable").into_response(),
    };

    let mut keys = Vec::with_capacity(cached.len());
    for entry in cached.values() {
        match serde_json::to_value(&entry.raw) {
            Ok(value) => keys.push(value),
            Err(_) => {
                return (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode a JWKS entry").into_response();
            }
        }
    }

    Json(JwksResponse { keys }).into_response()
}
