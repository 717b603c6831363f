use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::state::{JobProgress, JobStatus, JobUpdate, ScanJob, ScanScope};
use crate::config::JobsConfig;
use crate::errors::JobError;

pub const DEFAULT_JOB_TTL: Duration = Duration::from_secs(86_400);
pub const DEFAULT_MAX_JOBS: usize = 1000;

#[derive(Debug, Clone)]
pub struct JobStoreConfig {
    /// Age after completion at which terminal jobs are purged. `None` keeps them.
    pub ttl: Option<Duration>,
    /// Soft cap; the oldest terminal jobs go first.
    pub max_jobs: usize,
}

impl Default for JobStoreConfig {
    fn default() -> Self {
        Self { ttl: Some(DEFAULT_JOB_TTL), max_jobs: DEFAULT_MAX_JOBS }
    }
}

impl JobStoreConfig {
    pub fn from_config(jobs: Option<&JobsConfig>) -> Self {
        let defaults = Self::default();
        match jobs {
            Some(j) => Self {
                ttl: j.ttl_secs.map(Duration::from_secs).or(defaults.ttl),
                max_jobs: j.max_jobs.unwrap_or(defaults.max_jobs).max(1),
            },
            None => defaults,
        }
    }
}

#[derive(Default)]
struct Inner {
    jobs: HashMap<String, ScanJob>,
    next_seq: u64,
}

/// In-memory registry of scan jobs. All mutation goes through one lock.
#[derive(Clone)]
pub struct JobStore {
    inner: Arc<RwLock<Inner>>,
    config: JobStoreConfig,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new(JobStoreConfig::default())
    }
}

impl JobStore {
    pub fn new(config: JobStoreConfig) -> Self {
        Self { inner: Arc::new(RwLock::new(Inner::default())), config }
    }

    pub async fn create(&self, scanner_ids: Vec<String>, scope: ScanScope) -> ScanJob {
        let mut inner = self.inner.write().await;
        self.evict_locked(&mut inner, 1);

        let seq = inner.next_seq;
        inner.next_seq += 1;
        let job = ScanJob {
            id: Uuid::new_v4().to_string(),
            status: JobStatus::Pending,
            scanner_ids,
            scope,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            results: None,
            error: None,
            progress: JobProgress::default(),
            seq,
        };
        inner.jobs.insert(job.id.clone(), job.clone());
        debug!(job_id = %job.id, "Created job");
        job
    }

    pub async fn get(&self, id: &str) -> Option<ScanJob> {
        self.inner.read().await.jobs.get(id).cloned()
    }

    /// Apply a partial update. A status change must move forward; the first
    /// terminal status stamps `completed_at`.
    pub async fn update(&self, id: &str, update: JobUpdate) -> Result<ScanJob, JobError> {
        let mut inner = self.inner.write().await;
        let job = inner.jobs.get_mut(id).ok_or_else(|| JobError::NotFound(id.to_string()))?;

        if let Some(next) = update.status {
            if !job.status.can_transition_to(next) {
                return Err(JobError::InvalidTransition {
                    id: id.to_string(),
                    from: job.status.to_string(),
                    to: next.to_string(),
                });
            }
            job.status = next;
            let now = Utc::now();
            if next == JobStatus::Running && job.started_at.is_none() {
                job.started_at = Some(now);
            }
            if next.is_terminal() && job.completed_at.is_none() {
                job.completed_at = Some(now);
            }
        }
        if let Some(results) = update.results {
            job.results = Some(Arc::new(results));
        }
        if let Some(error) = update.error {
            job.error = Some(error);
        }
        Ok(job.clone())
    }

    pub async fn record_progress(&self, id: &str, progress: JobProgress) {
        if let Some(job) = self.inner.write().await.jobs.get_mut(id) {
            job.progress = progress;
        }
    }

    /// Newest first.
    pub async fn list_all(&self) -> Vec<ScanJob> {
        let inner = self.inner.read().await;
        let mut jobs: Vec<ScanJob> = inner.jobs.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.seq.cmp(&a.seq)));
        jobs
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.jobs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Purge expired terminal jobs and enforce the cap. Returns how many went.
    pub async fn evict_expired(&self) -> usize {
        let mut inner = self.inner.write().await;
        let removed = self.evict_locked(&mut inner, 0);
        if removed > 0 {
            info!(removed, remaining = inner.jobs.len(), "Evicted finished jobs");
        }
        removed
    }

    /// `reserve` slots are kept free under the cap for jobs about to be inserted.
    fn evict_locked(&self, inner: &mut Inner, reserve: usize) -> usize {
        let before = inner.jobs.len();

        if let Some(ttl) = self.config.ttl.and_then(|t| chrono::Duration::from_std(t).ok()) {
            let cutoff = Utc::now() - ttl;
            inner.jobs.retain(|_, job| match (job.status.is_terminal(), job.completed_at) {
                (true, Some(done)) => done > cutoff,
                _ => true,
            });
        }

        if inner.jobs.len() + reserve > self.config.max_jobs {
            let excess = inner.jobs.len() + reserve - self.config.max_jobs;
            let mut terminal: Vec<(chrono::DateTime<Utc>, u64, String)> = inner
                .jobs
                .values()
                .filter(|j| j.status.is_terminal())
                .map(|j| (j.completed_at.unwrap_or(j.created_at), j.seq, j.id.clone()))
                .collect();
            terminal.sort();
            for (_, _, id) in terminal.into_iter().take(excess) {
                inner.jobs.remove(&id);
            }
        }

        before - inner.jobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::state::JobResults;

    fn account_scope() -> ScanScope {
        ScanScope::Account { regions: None }
    }

    #[tokio::test]
    async fn test_create_is_pending() {
        let store = JobStore::default();
        let job = store.create(vec!["cost-anomaly".into()], account_scope()).await;
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.completed_at.is_none());
        assert_eq!(store.get(&job.id).await.unwrap().scanner_ids, vec!["cost-anomaly"]);
    }

    #[tokio::test]
    async fn test_lifecycle_stamps_completed_at_once() {
        let store = JobStore::default();
        let job = store.create(vec![], account_scope()).await;

        let running = store.update(&job.id, JobUpdate::running()).await.unwrap();
        assert!(running.started_at.is_some());
        assert!(running.completed_at.is_none());

        let done = store.update(&job.id, JobUpdate::completed(JobResults::Flat(vec![]))).await.unwrap();
        let stamped = done.completed_at.unwrap();
        assert!(done.has_results());

        let err = store.update(&job.id, JobUpdate::failed("late")).await.unwrap_err();
        assert!(matches!(err, JobError::InvalidTransition { .. }));
        let after = store.get(&job.id).await.unwrap();
        assert_eq!(after.completed_at, Some(stamped));
        assert_eq!(after.status, JobStatus::Completed);
        assert!(after.error.is_none());
    }

    #[tokio::test]
    async fn test_backward_transition_rejected() {
        let store = JobStore::default();
        let job = store.create(vec![], account_scope()).await;
        store.update(&job.id, JobUpdate::running()).await.unwrap();
        let err = store
            .update(&job.id, JobUpdate { status: Some(JobStatus::Pending), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_update_unknown_job() {
        let store = JobStore::default();
        let err = store.update("missing", JobUpdate::running()).await.unwrap_err();
        assert_eq!(err, JobError::NotFound("missing".into()));
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let store = JobStore::default();
        let first = store.create(vec![], account_scope()).await;
        let second = store.create(vec![], account_scope()).await;
        let third = store.create(vec![], account_scope()).await;
        let ids: Vec<String> = store.list_all().await.into_iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);
    }

    #[tokio::test]
    async fn test_ttl_eviction_spares_active_jobs() {
        let store = JobStore::new(JobStoreConfig { ttl: Some(Duration::ZERO), max_jobs: 100 });
        let pending = store.create(vec![], account_scope()).await;
        let running = store.create(vec![], account_scope()).await;
        store.update(&running.id, JobUpdate::running()).await.unwrap();
        let finished = store.create(vec![], account_scope()).await;
        store.update(&finished.id, JobUpdate::running()).await.unwrap();
        store.update(&finished.id, JobUpdate::failed("boom")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(store.evict_expired().await, 1);
        assert!(store.get(&pending.id).await.is_some());
        assert!(store.get(&running.id).await.is_some());
        assert!(store.get(&finished.id).await.is_none());
    }

    #[tokio::test]
    async fn test_cap_evicts_oldest_terminal_first() {
        let store = JobStore::new(JobStoreConfig { ttl: None, max_jobs: 3 });
        let mut ids = Vec::new();
        for _ in 0..3 {
            let job = store.create(vec![], account_scope()).await;
            store.update(&job.id, JobUpdate::running()).await.unwrap();
            store.update(&job.id, JobUpdate::completed(JobResults::Flat(vec![]))).await.unwrap();
            ids.push(job.id);
        }
        store.create(vec![], account_scope()).await;
        assert_eq!(store.len().await, 3);
        assert!(store.get(&ids[0]).await.is_none());
        assert!(store.get(&ids[1]).await.is_some());
    }

    #[tokio::test]
    async fn test_cap_never_evicts_running_jobs() {
        let store = JobStore::new(JobStoreConfig { ttl: None, max_jobs: 2 });
        let a = store.create(vec![], account_scope()).await;
        store.update(&a.id, JobUpdate::running()).await.unwrap();
        let b = store.create(vec![], account_scope()).await;
        store.create(vec![], account_scope()).await;
        assert_eq!(store.len().await, 3);
        assert!(store.get(&a.id).await.is_some());
        assert!(store.get(&b.id).await.is_some());
    }
}
