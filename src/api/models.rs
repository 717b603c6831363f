use serde::{Deserialize, Serialize};

use crate::jobs::{JobStatus, ScanJob};

#[derive(Debug, Default, Deserialize)]
pub struct ScanRequest {
    pub regions: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrgScanRequest {
    pub role: Option<String>,
    pub scanner: Option<String>,
    pub regions: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: String,
    pub status: JobStatus,
}

impl From<&ScanJob> for SubmitResponse {
    fn from(job: &ScanJob) -> Self {
        Self { job_id: job.id.clone(), status: job.status }
    }
}
