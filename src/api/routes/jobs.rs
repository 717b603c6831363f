use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::api::AppState;
use crate::errors::JobError;

pub async fn list_jobs(State(state): State<AppState>) -> Json<Value> {
    let jobs = state.service.list().await;
    Json(json!({ "total": jobs.len(), "jobs": jobs }))
}

pub async fn get_job(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, JobError> {
    let job = state.service.status(&id).await?;
    let has_results = job.has_results();
    let mut body = serde_json::to_value(&job).unwrap_or_else(|_| json!({ "id": job.id }));
    body["has_results"] = json!(has_results);
    Ok(Json(body))
}

pub async fn get_results(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, JobError> {
    let results = state.service.results(&id).await?;
    Ok(Json(json!({
        "job_id": id,
        "totals": results.totals(),
        "results": results.as_ref(),
    })))
}

pub async fn cancel_job(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, JobError> {
    state.service.cancel(&id)?;
    Ok(Json(json!({ "job_id": id, "cancel_requested": true })))
}
