use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ScanResult;
use crate::pipeline::{flat_totals, OrgScanReport, Totals};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Status only moves forward: PENDING -> RUNNING -> COMPLETED | FAILED.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a job covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScanScope {
    /// The caller's own account.
    Account {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        regions: Option<Vec<String>>,
    },
    Organization {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        role_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        regions: Option<Vec<String>>,
    },
}

impl ScanScope {
    pub fn regions(&self) -> Option<&[String]> {
        match self {
            ScanScope::Account { regions } | ScanScope::Organization { regions, .. } => regions.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum JobResults {
    Flat(Vec<ScanResult>),
    Org(OrgScanReport),
}

impl JobResults {
    pub fn totals(&self) -> Totals {
        match self {
            JobResults::Flat(results) => flat_totals(results),
            JobResults::Org(report) => report.totals(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobProgress {
    pub accounts_total: usize,
    pub accounts_done: usize,
    pub accounts_failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanJob {
    pub id: String,
    pub status: JobStatus,
    pub scanner_ids: Vec<String>,
    pub scope: ScanScope,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub results: Option<Arc<JobResults>>,
    pub error: Option<String>,
    pub progress: JobProgress,
    /// Insertion counter, breaks `created_at` ties.
    #[serde(skip)]
    pub(crate) seq: u64,
}

impl ScanJob {
    pub fn has_results(&self) -> bool {
        self.results.is_some()
    }
}

/// Partial update applied by [`super::store::JobStore::update`].
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub results: Option<JobResults>,
    pub error: Option<String>,
}

impl JobUpdate {
    pub fn running() -> Self {
        Self { status: Some(JobStatus::Running), ..Default::default() }
    }

    pub fn completed(results: JobResults) -> Self {
        Self { status: Some(JobStatus::Completed), results: Some(results), ..Default::default() }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { status: Some(JobStatus::Failed), error: Some(error.into()), ..Default::default() }
    }
}
