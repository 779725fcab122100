//! Security headers and CORS (§10 ambient stack). The rate limiter and the
//! JWT/validation helpers the teacher carried here are superseded by
//! `shared::auth` and `shared::validation` and dropped (see DESIGN.md).

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use std::time::Duration;
use tracing::{info, warn};

/// Sets a fixed set of defensive headers on every response.
pub async fn security_headers_middleware(request: Request, next: Next) -> Result<Response, StatusCode> {
    let path = request.uri().path().to_string();
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(HeaderName::from_static("x-content-type-options"), HeaderValue::from_static("nosniff"));
    headers.insert(HeaderName::from_static("x-frame-options"), HeaderValue::from_static("DENY"));
    headers.insert(HeaderName::from_static("x-xss-protection"), HeaderValue::from_static("1; mode=block"));
    headers.insert(
        HeaderName::from_static("strict-transport-security"),
        HeaderValue::from_static("max-age=31536000; includeSubDomains; preload"),
    );
    headers.insert(
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        HeaderName::from_static("content-security-policy"),
        HeaderValue::from_static(
            "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' data:; connect-src 'self'; font-src 'self'; object-src 'none'; media-src 'self'; frame-src 'none';",
        ),
    );
    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static("geolocation=(), microphone=(), camera=(), payment=(), usb=(), magnetometer=(), gyroscope=()"),
    );
    headers.insert(HeaderName::from_static("x-permitted-cross-domain-policies"), HeaderValue::from_static("none"));

    if path.starts_with("/api/v1/auth/") {
        headers.insert(
            HeaderName::from_static("cache-control"),
            HeaderValue::from_static("no-store, no-cache, must-revalidate, private"),
        );
    }

    Ok(response)
}

/// Reads `CORS_ALLOWED_ORIGINS` (comma-separated, or `*`) per §10.3.
pub fn get_cors_layer() -> tower_http::cors::CorsLayer {
    use axum::http::{HeaderValue, Method};
    use tower_http::cors::{Any, CorsLayer};

    let cors_origins = std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| {
        warn!("CORS_ALLOWED_ORIGINS not set, using permissive mode");
        "*".to_string()
    });
    info!(origins = %cors_origins, "cors configured");

    let cors_layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::PATCH, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
            axum::http::header::ORIGIN,
            axum::http::HeaderName::from_static("x-requested-with"),
        ])
        .max_age(Duration::from_secs(3600));

    if cors_origins.trim() == "*" {
        return cors_layer.allow_origin(Any).allow_credentials(false);
    }

    let origins: Vec<HeaderValue> = cors_origins
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("invalid CORS origin '{s}': {e}");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        warn!("no valid CORS origins found, defaulting to permissive mode");
        cors_layer.allow_origin(Any).allow_credentials(false)
    } else {
        cors_layer.allow_origin(origins).allow_credentials(true)
    }
}
