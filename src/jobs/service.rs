use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use super::state::{JobProgress, JobResults, JobStatus, JobUpdate, ScanJob, ScanScope};
use super::store::{JobStore, JobStoreConfig};
use crate::auth::{BrokerConfig, CredentialBroker};
use crate::config::{validate_regions, CloudSweepConfig};
use crate::errors::{Classify, CloudSweepError, JobError};
use crate::inventory::{OrgDirectory, StaticInventory};
use crate::pipeline::{Orchestrator, ScanEvent, ScanSettings};
use crate::scanner::{FixtureScanner, ScannerInfo, ScannerRegistry, Scanner};
use crate::utils::panic::panic_message;

/// The job API: submit scans, inspect them, fetch their results.
///
/// Submission returns as soon as the job is recorded; the scan itself runs on a
/// detached task and only ever reports through the job record.
#[derive(Clone)]
pub struct ScanService {
    store: JobStore,
    registry: Arc<ScannerRegistry>,
    directory: Arc<dyn OrgDirectory>,
    broker: CredentialBroker,
    settings: ScanSettings,
    active_jobs: Arc<DashMap<String, CancellationToken>>,
}

impl ScanService {
    pub fn new(
        store: JobStore,
        registry: ScannerRegistry,
        directory: Arc<dyn OrgDirectory>,
        broker: CredentialBroker,
        settings: ScanSettings,
    ) -> Self {
        Self {
            store,
            registry: Arc::new(registry),
            directory,
            broker,
            settings,
            active_jobs: Arc::new(DashMap::new()),
        }
    }

    /// Wire the static inventory and fixture scanners described by `config`.
    pub fn from_config(config: &CloudSweepConfig) -> Result<Self, CloudSweepError> {
        let inventory_config = config
            .inventory
            .clone()
            .ok_or_else(|| CloudSweepError::Config("missing 'inventory' section".into()))?;
        let inventory = Arc::new(StaticInventory::new(inventory_config));

        let mut registry = ScannerRegistry::new();
        for fixture in config.fixtures.iter().flatten() {
            registry.register(Arc::new(FixtureScanner::new(fixture.clone())))?;
        }

        let broker = CredentialBroker::new(inventory.clone(), BrokerConfig::from_config(config.scan.as_ref()));
        Ok(Self::new(
            JobStore::new(JobStoreConfig::from_config(config.jobs.as_ref())),
            registry,
            inventory,
            broker,
            ScanSettings::from_config(config.scan.as_ref()),
        ))
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn scanners(&self) -> Vec<ScannerInfo> {
        self.registry.info()
    }

    /// Record a job for `scanner_ids` (empty means every scanner) and start it.
    pub async fn submit(&self, scanner_ids: &[String], scope: ScanScope) -> Result<ScanJob, CloudSweepError> {
        let scanners = self.registry.resolve(scanner_ids)?;
        if let Some(regions) = scope.regions() {
            validate_regions(regions)?;
        }

        let ids = scanners.iter().map(|s| s.id().to_string()).collect();
        let job = self.store.create(ids, scope.clone()).await;
        let cancel = CancellationToken::new();
        self.active_jobs.insert(job.id.clone(), cancel.clone());

        let span = info_span!("scan_job", job_id = %job.id);
        let service = self.clone();
        let job_id = job.id.clone();
        tokio::spawn(async move { service.drive(job_id, scanners, scope, cancel).await }.instrument(span));

        info!(job_id = %job.id, scanners = ?job.scanner_ids, "Job submitted");
        Ok(job)
    }

    async fn drive(self, job_id: String, scanners: Vec<Arc<dyn Scanner>>, scope: ScanScope, cancel: CancellationToken) {
        if let Err(e) = self.store.update(&job_id, JobUpdate::running()).await {
            error!(error = %e, "Could not start job");
            self.active_jobs.remove(&job_id);
            return;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let forwarder = tokio::spawn(forward_progress(self.store.clone(), job_id.clone(), rx).in_current_span());
        let outcome = AssertUnwindSafe(self.execute(&scanners, &scope, cancel, Some(tx)))
            .catch_unwind()
            .await;

        // The orchestrator, and with it the event sender, is gone by now.
        if let Err(e) = forwarder.await {
            warn!(error = %e, "Progress forwarder ended abnormally");
        }

        let update = match outcome {
            Ok(Ok(results)) => {
                let totals = results.totals();
                info!(
                    findings = totals.findings_count,
                    critical = totals.critical_count,
                    monthly_impact = totals.monthly_impact,
                    "Job completed"
                );
                JobUpdate::completed(results)
            }
            Ok(Err(e)) => {
                let class = e.classify();
                warn!(error = %e, error_type = class.error_type, retryable = class.retryable, "Job failed");
                JobUpdate::failed(e.detail())
            }
            Err(panic) => {
                let msg = panic_message(panic.as_ref());
                error!(panic = %msg, "Job task panicked");
                JobUpdate::failed(format!("Internal error: {}", msg))
            }
        };

        self.active_jobs.remove(&job_id);
        if let Err(e) = self.store.update(&job_id, update).await {
            error!(error = %e, "Could not record job outcome");
        }
    }

    async fn execute(
        &self,
        scanners: &[Arc<dyn Scanner>],
        scope: &ScanScope,
        cancel: CancellationToken,
        events: Option<mpsc::UnboundedSender<ScanEvent>>,
    ) -> Result<JobResults, CloudSweepError> {
        let mut orchestrator = Orchestrator::new(self.directory.clone(), self.broker.clone(), self.settings.clone())
            .with_cancel_token(cancel);
        if let Some(tx) = events {
            orchestrator = orchestrator.with_event_channel(tx);
        }

        match scope {
            ScanScope::Account { regions } => orchestrator
                .run_account(scanners, regions.as_deref())
                .await
                .map(JobResults::Flat),
            ScanScope::Organization { role_name, regions } => orchestrator
                .run_org(scanners, role_name.as_deref(), regions.as_deref())
                .await
                .map(JobResults::Org),
        }
    }

    /// Run a scan in the calling task without recording a job.
    pub async fn run_now(
        &self,
        scanner_ids: &[String],
        scope: ScanScope,
        cancel: CancellationToken,
    ) -> Result<JobResults, CloudSweepError> {
        let scanners = self.registry.resolve(scanner_ids)?;
        if let Some(regions) = scope.regions() {
            validate_regions(regions)?;
        }
        self.execute(&scanners, &scope, cancel, None).await
    }

    pub async fn status(&self, job_id: &str) -> Result<ScanJob, JobError> {
        self.store.get(job_id).await.ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    /// Results of a completed job. Repeated calls return the same value.
    pub async fn results(&self, job_id: &str) -> Result<Arc<JobResults>, JobError> {
        let job = self.status(job_id).await?;
        match (job.status, job.results) {
            (JobStatus::Completed, Some(results)) => Ok(results),
            (status, _) => Err(JobError::NotReady { id: job.id, status: status.to_string() }),
        }
    }

    /// Signal a pending or running job to stop. It then fails with "scan cancelled".
    pub fn cancel(&self, job_id: &str) -> Result<(), JobError> {
        match self.active_jobs.get(job_id) {
            Some(token) => {
                token.cancel();
                info!(job_id = %job_id, "Cancellation requested");
                Ok(())
            }
            None => Err(JobError::NotFound(job_id.to_string())),
        }
    }

    pub async fn list(&self) -> Vec<ScanJob> {
        self.store.list_all().await
    }

    pub fn active_count(&self) -> usize {
        self.active_jobs.len()
    }

    /// Poll until the job reaches a terminal status.
    pub async fn wait(&self, job_id: &str, poll: Duration) -> Result<ScanJob, JobError> {
        loop {
            let job = self.status(job_id).await?;
            if job.status.is_terminal() {
                return Ok(job);
            }
            tokio::time::sleep(poll).await;
        }
    }
}

async fn forward_progress(store: JobStore, job_id: String, mut rx: mpsc::UnboundedReceiver<ScanEvent>) {
    let mut progress = JobProgress::default();
    while let Some(event) = rx.recv().await {
        match &event {
            ScanEvent::AccountsDiscovered { total } => progress.accounts_total = *total,
            ScanEvent::AccountStarted { unit, account_id } => {
                info!(unit = %unit, account_id = %account_id, "Scanning account");
                continue;
            }
            ScanEvent::AccountCompleted { account_id, findings } => {
                progress.accounts_done += 1;
                info!(
                    account_id = %account_id,
                    findings,
                    done = progress.accounts_done,
                    total = progress.accounts_total,
                    "Account scanned"
                );
            }
            ScanEvent::AccountFailed { account_id, error } => {
                progress.accounts_done += 1;
                progress.accounts_failed += 1;
                warn!(account_id = %account_id, error = %error, "Account failed");
            }
        }
        store.record_progress(&job_id, progress).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config_str;

    const CONFIG: &str = r#"
inventory:
  management_account_id: "000000000000"
  regions: [us-east-1]
  organizational_units:
    - name: Prod
      id: ou-1
      accounts:
        - { id: "111111111111", name: svc-a }
fixtures:
  - id: cost-anomaly
    findings:
      - { region: us-east-1, title: spike, severity: medium, monthly_impact: 8.0 }
"#;

    fn service() -> ScanService {
        ScanService::from_config(&parse_config_str(CONFIG).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_scanner_creates_no_job() {
        let svc = service();
        let err = svc.submit(&["nope".into()], ScanScope::Account { regions: None }).await.unwrap_err();
        assert!(matches!(err, CloudSweepError::UnknownScanner { .. }));
        assert!(svc.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_bad_region_creates_no_job() {
        let svc = service();
        let scope = ScanScope::Account { regions: Some(vec!["nowhere".into()]) };
        let err = svc.submit(&[], scope).await.unwrap_err();
        assert!(matches!(err, CloudSweepError::InvalidRegion(_)));
        assert!(svc.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_account_job_completes() {
        let svc = service();
        let job = svc.submit(&[], ScanScope::Account { regions: None }).await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.scanner_ids, vec!["cost-anomaly"]);

        let done = svc.wait(&job.id, Duration::from_millis(10)).await.unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.progress.accounts_done, 1);
        let results = svc.results(&job.id).await.unwrap();
        assert_eq!(results.totals().findings_count, 1);
        assert_eq!(svc.active_count(), 0);
    }

    #[tokio::test]
    async fn test_results_unknown_and_not_ready() {
        let svc = service();
        assert!(matches!(svc.results("missing").await, Err(JobError::NotFound(_))));

        let job = svc.store().create(vec![], ScanScope::Account { regions: None }).await;
        let err = svc.results(&job.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Job not completed. Status: pending");
    }

    #[tokio::test]
    async fn test_run_now_returns_org_tree() {
        let scope = ScanScope::Organization { role_name: None, regions: None };
        let results = service().run_now(&[], scope, CancellationToken::new()).await.unwrap();
        match results {
            JobResults::Org(report) => {
                assert_eq!(report.units.len(), 2);
                assert_eq!(report.totals().findings_count, 2);
            }
            JobResults::Flat(_) => panic!("expected an org report"),
        }
    }

    #[tokio::test]
    async fn test_cancel_unknown_job() {
        assert!(matches!(service().cancel("missing"), Err(JobError::NotFound(_))));
    }

    #[test]
    fn test_from_config_requires_inventory() {
        let err = ScanService::from_config(&CloudSweepConfig::default()).err().unwrap();
        assert!(matches!(err, CloudSweepError::Config(_)));
    }
}
