pub mod auth;
pub mod errors;
pub mod models;
pub mod routes;
pub mod security;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

use crate::jobs::ScanService;
use security::{ClientLimiter, SecuritySettings};

pub const HEALTH_PATH: &str = "/api/health";

#[derive(Clone)]
pub struct AppState {
    pub service: ScanService,
    /// When set, every route but `/api/health` requires this key.
    pub api_key: Option<Arc<str>>,
    pub security: Arc<SecuritySettings>,
    /// Shared across router instances so budgets survive a rebuild.
    pub rate_limiter: Option<Arc<ClientLimiter>>,
}

impl AppState {
    pub fn new(service: ScanService) -> Self {
        Self::with_security(service, SecuritySettings::default())
    }

    pub fn with_security(service: ScanService, security: SecuritySettings) -> Self {
        Self {
            service,
            api_key: None,
            rate_limiter: security.limiter(),
            security: Arc::new(security),
        }
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.is_empty()).map(Arc::from);
        self
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = state.security.cors_layer();
    let router = Router::new()
        .route(HEALTH_PATH, get(routes::health::health_check))
        .route("/api/scanners", get(routes::scanners::list_scanners))
        .route("/api/scan-all", post(routes::scans::scan_all))
        .route("/api/scan/{scanner}", post(routes::scans::scan_one))
        .route("/api/org-scan", post(routes::scans::org_scan))
        .route("/api/jobs", get(routes::jobs::list_jobs))
        .route("/api/jobs/{id}", get(routes::jobs::get_job))
        .route("/api/jobs/{id}/results", get(routes::jobs::get_results))
        .route("/api/jobs/{id}/cancel", post(routes::jobs::cancel_job))
        .layer(middleware::from_fn_with_state(state.clone(), auth::api_key_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), security::rate_limit_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state);
    security::with_security_headers(router).layer(cors)
}
