use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Attaches a correlation ID to every tokeninfo/certs/revocation request, so
/// a single log line can be traced across the JWKS and revocation-feed
/// pollers that run concurrently with request handling.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    // An upstream load balancer may already have stamped one on.
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    req.extensions_mut().insert(request_id);

    let mut response = next.run(req).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_id.to_string()) {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER, header_value);
    }

    response
}
