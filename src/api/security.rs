use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Router;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::warn;

use super::{AppState, HEALTH_PATH};
use crate::config::ServerConfig;
use crate::errors::CloudSweepError;

pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 60;
pub const DEFAULT_BURST: u32 = 15;
pub const DEFAULT_CORS_ORIGINS: [&str; 2] = ["http://127.0.0.1:8080", "http://localhost:8080"];

/// Per-client token buckets keyed by peer address.
pub type ClientLimiter = DefaultKeyedRateLimiter<String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecuritySettings {
    pub cors_origins: Vec<String>,
    /// Zero switches rate limiting off.
    pub requests_per_minute: u32,
    pub burst: u32,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            burst: DEFAULT_BURST,
        }
    }
}

impl SecuritySettings {
    pub fn from_config(server: Option<&ServerConfig>) -> Self {
        let defaults = Self::default();
        let Some(server) = server else {
            return defaults;
        };
        Self {
            cors_origins: server.cors_origins.clone().unwrap_or(defaults.cors_origins),
            requests_per_minute: server.rate_limit_per_minute.unwrap_or(defaults.requests_per_minute),
            burst: server.rate_limit_burst.unwrap_or(defaults.burst),
        }
    }

    pub fn limiter(&self) -> Option<Arc<ClientLimiter>> {
        let rate = NonZeroU32::new(self.requests_per_minute)?;
        let burst = NonZeroU32::new(self.burst).unwrap_or(NonZeroU32::MIN);
        Some(Arc::new(RateLimiter::keyed(Quota::per_minute(rate).allow_burst(burst))))
    }

    /// Only the configured origins, with the methods and headers the API uses.
    pub fn cors_layer(&self) -> CorsLayer {
        let origins: Vec<HeaderValue> = self
            .cors_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, HeaderName::from_static("x-api-key")])
    }
}

/// Headers stamped on every response.
pub fn with_security_headers(router: Router) -> Router {
    let headers: [(HeaderName, &'static str); 6] = [
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        (header::X_FRAME_OPTIONS, "DENY"),
        (header::X_XSS_PROTECTION, "1; mode=block"),
        (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
        (HeaderName::from_static("permissions-policy"), "camera=(), microphone=(), geolocation=()"),
        (header::CONTENT_SECURITY_POLICY, "default-src 'none'; frame-ancestors 'none'"),
    ];
    headers.into_iter().fold(router, |router, (name, value)| {
        router.layer(SetResponseHeaderLayer::overriding(name, HeaderValue::from_static(value)))
    })
}

fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Reject clients that exceed their request budget. The health check is exempt.
pub async fn rate_limit_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(limiter) = state.rate_limiter.as_deref() else {
        return next.run(request).await;
    };
    if request.uri().path() == HEALTH_PATH {
        return next.run(request).await;
    }

    let client = client_key(&request);
    if limiter.check_key(&client).is_err() {
        warn!(client = %client, path = %request.uri().path(), "Rate limit exceeded");
        return CloudSweepError::RateLimited("Rate limit exceeded. Try again shortly.".into()).into_response();
    }
    next.run(request).await
}
