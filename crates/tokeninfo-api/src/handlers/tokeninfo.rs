//! `GET /oauth2/tokeninfo` (spec §4.8): dispatches between the JWT
//! validator (C5) and the opaque-token proxy (C7) on the shape of the
//! extracted bearer, the way the reference implementation's
//! `jwt.MatchHandler`/`proxy.MatchHandler` pair dispatches in front of a
//! shared tokeninfo endpoint.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokeninfo_core::{extract_bearer, looks_like_uuid, JwtValidator, OAuthError, ProxyError, ProxyOutcome};

use crate::error::{oauth_error_response, upstream_error_response, with_json_content_type, ApiError};
use crate::AppState;

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn matches_proxy(bearer: &str, uuid_tokens: bool) -> bool {
    if uuid_tokens {
        looks_like_uuid(bearer)
    } else {
        true
    }
}

pub async fn tokeninfo(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let query_token = params.get("access_token").map(String::as_str);

    let Some(bearer) = extract_bearer(authorization, query_token) else {
        return oauth_error_response(OAuthError::InvalidRequest);
    };

    if JwtValidator::looks_like_jwt(bearer) {
        return match state.jwt_validator.validate(bearer, now_unix()).await {
            Ok(info) => with_json_content_type((StatusCode::OK, Json(info)).into_response()),
            Err(kind) => ApiError::new(kind).into_response(),
        };
    }

    if !matches_proxy(bearer, state.uuid_tokens) {
        return oauth_error_response(OAuthError::InvalidToken);
    }

    match state.proxy_cache.fetch(bearer, uri.query(), authorization).await {
        Ok(ProxyOutcome::CacheHit { body }) => proxy_response(StatusCode::OK, body, true),
        Ok(ProxyOutcome::Fetched { status, body, .. }) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            proxy_response(status, body, false)
        }
        Err(ProxyError::Upstream(class)) => upstream_error_response(class),
    }
}

fn proxy_response(status: StatusCode, body: String, cache_hit: bool) -> Response {
    let mut response = (status, body).into_response();
    response.headers_mut().insert(
        "x-cache",
        HeaderValue::from_static(if cache_hit { "HIT" } else { "MISS" }),
    );
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
