use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::api::AppState;

pub async fn list_scanners(State(state): State<AppState>) -> Json<Value> {
    let scanners = state.service.scanners();
    Json(json!({ "total": scanners.len(), "scanners": scanners }))
}
