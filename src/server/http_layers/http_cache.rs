use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Sets `Cache-Control: max-age` on successful responses. Errors are not cached.
pub async fn http_cache(
    State(max_age_sec): State<usize>,
    request: Request<Body>,
    next: Next,
) -> impl IntoResponse {
    let response = next.run(request).await.into_response();
    if !response.status().is_success() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let value = if max_age_sec == 0 {
        HeaderValue::from_static("no-store")
    } else {
        HeaderValue::from_str(&format!("private, max-age={}", max_age_sec))
            .unwrap_or_else(|_| HeaderValue::from_static("no-store"))
    };
    parts.headers.insert(header::CACHE_CONTROL, value);

    Response::from_parts(parts, body)
}
