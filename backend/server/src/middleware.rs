use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    extract::{ConnectInfo, Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use forms::IpRateLimiter;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::warn;

use crate::{error::AppError, state::AppState, utils::client_ip};

const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
    script-src 'self' 'unsafe-inline' https://www.googletagmanager.com https://www.google-analytics.com; \
    style-src 'self' 'unsafe-inline'; \
    img-src 'self' data: blob: https:; \
    font-src 'self'; \
    connect-src 'self' https://www.google-analytics.com; \
    frame-src 'self'";

const SECURITY_HEADERS: [(&str, &str); 8] = [
    ("x-dns-prefetch-control", "on"),
    ("x-xss-protection", "1; mode=block"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("permissions-policy", "camera=(), microphone=(), geolocation=()"),
    (
        "strict-transport-security",
        "max-age=63072000; includeSubDomains; preload",
    ),
    ("content-security-policy", CONTENT_SECURITY_POLICY),
];

/// Per-IP window check in front of the form routes.
pub async fn ip_rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    limit(&state.ip_limiter, request, next).await
}

/// Same check against the admin login's own, smaller allowance.
pub async fn login_rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    limit(&state.login_limiter, request, next).await
}

async fn limit(limiter: &IpRateLimiter, request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(request.headers(), peer);

    if let Err(limited) = limiter.check(&ip).await {
        warn!(
            ip = %ip,
            path = %request.uri().path(),
            retry_after = limited.retry_after_secs,
            "Rate limited"
        );

        return AppError::TooManyRequests {
            retry_after: limited.retry_after_secs,
        }
        .into_response();
    }

    next.run(request).await
}

pub fn with_security_headers(router: Router) -> Router {
    SECURITY_HEADERS
        .iter()
        .fold(router, |router, &(name, value)| {
            router.layer(SetResponseHeaderLayer::overriding(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            ))
        })
}
