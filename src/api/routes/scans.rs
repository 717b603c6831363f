use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::de::DeserializeOwned;

use crate::api::models::{OrgScanRequest, ScanRequest, SubmitResponse};
use crate::api::AppState;
use crate::errors::CloudSweepError;
use crate::jobs::ScanScope;

/// An empty body means "all defaults".
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, CloudSweepError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    Ok(serde_json::from_slice(body)?)
}

pub async fn scan_one(
    State(state): State<AppState>,
    Path(scanner): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<SubmitResponse>), CloudSweepError> {
    let req: ScanRequest = parse_body(&body)?;
    let job = state
        .service
        .submit(&[scanner], ScanScope::Account { regions: req.regions })
        .await?;
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse::from(&job))))
}

pub async fn scan_all(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<SubmitResponse>), CloudSweepError> {
    let req: ScanRequest = parse_body(&body)?;
    let job = state.service.submit(&[], ScanScope::Account { regions: req.regions }).await?;
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse::from(&job))))
}

pub async fn org_scan(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<SubmitResponse>), CloudSweepError> {
    let req: OrgScanRequest = parse_body(&body)?;
    let scanners: Vec<String> = req.scanner.into_iter().collect();
    let scope = ScanScope::Organization { role_name: req.role, regions: req.regions };
    let job = state.service.submit(&scanners, scope).await?;
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse::from(&job))))
}
