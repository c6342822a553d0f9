//! Maps `tokeninfo-core`'s internal error taxonomy onto the wire: the two
//! standard OAuth error bodies for the tokeninfo/keys endpoints, and a bare
//! status passthrough for the opaque-token proxy path (spec §4.7/§4.3).

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tokeninfo_core::{ErrorKind, ErrorResponse, OAuthError, UpstreamErrorClass};
use tracing::debug;

/// Spec §6's literal content type for every tokeninfo/error JSON body.
/// `axum::Json` alone emits a bare `application/json`, so every JSON
/// response here overwrites it to match the wire contract exactly.
pub(crate) const JSON_CONTENT_TYPE: HeaderValue = HeaderValue::from_static("application/json; charset=UTF-8");

pub(crate) fn with_json_content_type(mut response: Response) -> Response {
    response.headers_mut().insert(header::CONTENT_TYPE, JSON_CONTENT_TYPE);
    response
}

pub struct ApiError {
    kind: ErrorKind,
}

impl ApiError {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let oauth_error = self.kind.to_oauth_error();
        debug!(reason = %self.kind, code = oauth_error.code(), "rejecting tokeninfo request");
        let status = StatusCode::from_u16(oauth_error.http_status()).unwrap_or(StatusCode::UNAUTHORIZED);
        with_json_content_type((status, Json(ErrorResponse::new(oauth_error))).into_response())
    }
}

impl From<ErrorKind> for ApiError {
    fn from(kind: ErrorKind) -> Self {
        ApiError::new(kind)
    }
}

/// A bare `invalid_request`/`invalid_token` response with no underlying
/// `ErrorKind` (the missing-bearer and unroutable-bearer cases from the
/// router, spec §4.8).
pub fn oauth_error_response(error: OAuthError) -> Response {
    let status = StatusCode::from_u16(error.http_status()).unwrap_or(StatusCode::BAD_REQUEST);
    with_json_content_type((status, Json(ErrorResponse::new(error))).into_response())
}

/// Proxy-path failures carry no OAuth error body (spec §4.3): the upstream's
/// classified status is forwarded as-is.
pub fn upstream_error_response(class: UpstreamErrorClass) -> Response {
    let status = StatusCode::from_u16(class.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    status.into_response()
}
