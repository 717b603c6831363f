use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{AppState, HEALTH_PATH};
use crate::errors::CloudSweepError;

pub const API_KEY_HEADER: &str = "X-API-Key";

fn presented_key(request: &Request) -> Option<&str> {
    let headers = request.headers();
    if let Some(key) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(key);
    }
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Require the configured API key on every route except the health check.
pub async fn api_key_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(request).await;
    };
    if request.uri().path() == HEALTH_PATH {
        return next.run(request).await;
    }

    match presented_key(&request) {
        Some(key) if key == expected => next.run(request).await,
        Some(_) => CloudSweepError::Forbidden("Invalid API key".into()).into_response(),
        None => CloudSweepError::Authentication("Missing API key".into()).into_response(),
    }
}
