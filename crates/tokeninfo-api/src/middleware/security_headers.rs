use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};

/// Adds the defensive headers every tokeninfo/certs/revocation response
/// carries. The API never returns HTML, but a browser that follows a
/// misconfigured redirect (or renders an error body directly) should still
/// be told not to execute or frame anything it receives from here.
pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    // Responses are never meant to be framed.
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));

    // No body this service returns is executable; don't let a browser guess otherwise.
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );

    headers.insert(
        "strict-transport-security",
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );

    // JSON-only responses need no script/style/img sources at all.
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );

    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("no-referrer"),
    );

    headers.insert(
        "permissions-policy",
        HeaderValue::from_static("geolocation=(), microphone=(), camera=()"),
    );

    response
}
