use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::api::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "cloudsweep",
        "version": env!("CARGO_PKG_VERSION"),
        "build": {
            "git_hash": option_env!("GIT_HASH").unwrap_or("dev"),
            "timestamp": option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        },
        "scanners": state.service.scanners().len(),
        "active_jobs": state.service.active_count(),
    }))
}
