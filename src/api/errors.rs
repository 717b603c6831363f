use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::errors::{CloudSweepError, JobError};

impl IntoResponse for CloudSweepError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            CloudSweepError::Job(JobError::NotFound(_)) => StatusCode::NOT_FOUND,
            CloudSweepError::Job(JobError::NotReady { .. }) => StatusCode::CONFLICT,
            CloudSweepError::Job(JobError::InvalidTransition { .. }) => StatusCode::CONFLICT,
            CloudSweepError::UnknownScanner { .. } => StatusCode::BAD_REQUEST,
            CloudSweepError::InvalidRegion(_) => StatusCode::BAD_REQUEST,
            CloudSweepError::Json(_) => StatusCode::BAD_REQUEST,
            CloudSweepError::Config(_) => StatusCode::BAD_REQUEST,
            CloudSweepError::Authentication(_) => StatusCode::UNAUTHORIZED,
            CloudSweepError::Forbidden(_) => StatusCode::FORBIDDEN,
            CloudSweepError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}

impl IntoResponse for JobError {
    fn into_response(self) -> axum::response::Response {
        CloudSweepError::from(self).into_response()
    }
}
