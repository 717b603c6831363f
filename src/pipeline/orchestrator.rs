use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::events::ScanEvent;
use super::state::{AccountReport, OrgScanReport, ScanSettings, UnitReport};
use crate::auth::CredentialBroker;
use crate::config::validate_regions;
use crate::errors::{CloudSweepError, CredentialError};
use crate::inventory::OrgDirectory;
use crate::models::{
    Account, Credentials, ScanResult, MANAGEMENT_ACCOUNT_NAME, MANAGEMENT_UNIT, MANAGEMENT_UNIT_ID,
};
use crate::scanner::{ScanOptions, Scanner};
use crate::utils::formatting::format_duration;
use crate::utils::panic::panic_message;
use crate::utils::truncation::truncate_error;

/// Drives scanners over one account or over every account of the organization.
///
/// Failures inside an account (credentials, provider calls, scanner panics) are
/// recorded on that account and never abort the run. Only failures reading the
/// directory itself, or cancellation, surface as `Err`.
pub struct Orchestrator {
    directory: Arc<dyn OrgDirectory>,
    broker: CredentialBroker,
    settings: ScanSettings,
    cancel_token: CancellationToken,
    event_tx: Option<mpsc::UnboundedSender<ScanEvent>>,
}

impl Orchestrator {
    pub fn new(directory: Arc<dyn OrgDirectory>, broker: CredentialBroker, settings: ScanSettings) -> Self {
        Self {
            directory,
            broker,
            settings,
            cancel_token: CancellationToken::new(),
            event_tx: None,
        }
    }

    /// Replace the internal token so an outside caller can stop the run.
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    pub fn with_event_channel(mut self, tx: mpsc::UnboundedSender<ScanEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn emit(&self, event: ScanEvent) {
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }

    fn check_cancelled(&self) -> Result<(), CloudSweepError> {
        if self.cancel_token.is_cancelled() {
            return Err(CloudSweepError::Cancelled);
        }
        Ok(())
    }

    /// Bound a directory read by the per-call timeout.
    async fn directory_call<T>(
        &self,
        what: &str,
        call: impl Future<Output = Result<T, CloudSweepError>>,
    ) -> Result<T, CloudSweepError> {
        match tokio::time::timeout(self.settings.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CloudSweepError::Timeout(format!(
                "{} did not finish within {}",
                what,
                self.call_timeout_label()
            ))),
        }
    }

    /// Bound a token-service call by the per-call timeout and race it against
    /// cancellation. `None` means the run was cancelled while waiting.
    async fn credential_call(
        &self,
        call: impl Future<Output = Result<Credentials, CredentialError>>,
    ) -> Option<Result<Credentials, CredentialError>> {
        tokio::select! {
            _ = self.cancel_token.cancelled() => None,
            outcome = tokio::time::timeout(self.settings.call_timeout, call) => Some(match outcome {
                Ok(result) => result,
                Err(_) => Err(CredentialError::Unreachable(format!(
                    "no answer within {}",
                    self.call_timeout_label()
                ))),
            }),
        }
    }

    fn call_timeout_label(&self) -> String {
        format_duration(self.settings.call_timeout.as_millis() as u64)
    }

    fn options(&self) -> ScanOptions {
        self.settings.scan_options(self.cancel_token.clone())
    }

    /// Request regions win, then configured regions, then the directory's list.
    async fn resolve_regions(&self, requested: Option<&[String]>) -> Result<Vec<String>, CloudSweepError> {
        let regions = match requested.filter(|r| !r.is_empty()) {
            Some(r) => r.to_vec(),
            None => match &self.settings.regions {
                Some(r) => r.clone(),
                None => self.directory_call("listing regions", self.directory.regions()).await?,
            },
        };
        validate_regions(&regions)?;
        Ok(regions)
    }

    /// Scan the caller's own account with its own identity.
    pub async fn run_account(
        &self,
        scanners: &[Arc<dyn Scanner>],
        regions: Option<&[String]>,
    ) -> Result<Vec<ScanResult>, CloudSweepError> {
        self.check_cancelled()?;
        let regions = self.resolve_regions(regions).await?;
        let account_id = self
            .directory_call("reading management account", self.directory.management_account_id())
            .await?;
        let credentials = self
            .credential_call(self.broker.source_identity())
            .await
            .ok_or(CloudSweepError::Cancelled)??;
        info!(account_id = %account_id, regions = regions.len(), scanners = scanners.len(), "Starting account scan");

        self.emit(ScanEvent::AccountsDiscovered { total: 1 });
        self.emit(ScanEvent::AccountStarted { unit: MANAGEMENT_UNIT.to_string(), account_id: account_id.clone() });
        let results = self.run_scanners(scanners, &regions, &credentials, &account_id).await;
        drop(credentials);
        self.check_cancelled()?;

        let findings = results.iter().map(ScanResult::total_findings).sum();
        self.emit(ScanEvent::AccountCompleted { account_id, findings });
        Ok(results)
    }

    /// Walk every unit and account, then the management account.
    pub async fn run_org(
        &self,
        scanners: &[Arc<dyn Scanner>],
        role: Option<&str>,
        regions: Option<&[String]>,
    ) -> Result<OrgScanReport, CloudSweepError> {
        self.check_cancelled()?;
        let tree = self
            .directory_call("fetching organization tree", self.directory.fetch_tree())
            .await?;
        let regions = self.resolve_regions(regions).await?;
        let management_id = self
            .directory_call("reading management account", self.directory.management_account_id())
            .await?;

        info!(
            units = tree.units.len(),
            accounts = tree.account_count(),
            regions = regions.len(),
            scanners = scanners.len(),
            "Starting organization scan"
        );
        // The management account is scanned once, with its own identity, even
        // when the directory also lists it inside a unit.
        let work: Vec<(usize, String, Account)> = tree
            .units
            .iter()
            .enumerate()
            .flat_map(|(idx, unit)| {
                unit.accounts
                    .iter()
                    .filter(|a| a.id != management_id)
                    .map(move |a| (idx, unit.name.clone(), a.clone()))
            })
            .collect();
        self.emit(ScanEvent::AccountsDiscovered { total: work.len() + 1 });

        let regions_ref = &regions;
        let reports: Vec<(usize, AccountReport)> = stream::iter(work)
            .map(|(idx, unit, account)| async move {
                (idx, self.scan_member(&unit, &account, role, scanners, regions_ref).await)
            })
            .buffered(self.settings.account_concurrency.max(1))
            .collect()
            .await;

        let mut units: Vec<UnitReport> = tree
            .units
            .iter()
            .map(|u| UnitReport { name: u.name.clone(), id: u.id.clone(), accounts: Vec::new() })
            .collect();
        for (idx, report) in reports {
            units[idx].accounts.push(report);
        }

        self.check_cancelled()?;
        let management = self.scan_management(&management_id, scanners, &regions).await;
        self.check_cancelled()?;

        match units.iter_mut().find(|u| u.name == MANAGEMENT_UNIT) {
            Some(unit) => unit.accounts.push(management),
            None => units.push(UnitReport {
                name: MANAGEMENT_UNIT.to_string(),
                id: MANAGEMENT_UNIT_ID.to_string(),
                accounts: vec![management],
            }),
        }

        let report = OrgScanReport { units };
        let totals = report.totals();
        info!(
            findings = totals.findings_count,
            critical = totals.critical_count,
            monthly_impact = totals.monthly_impact,
            "Organization scan finished"
        );
        Ok(report)
    }

    async fn scan_member(
        &self,
        unit: &str,
        account: &Account,
        role: Option<&str>,
        scanners: &[Arc<dyn Scanner>],
        regions: &[String],
    ) -> AccountReport {
        if self.cancel_token.is_cancelled() {
            return AccountReport::failed(account.id.as_str(), account.name.as_str(), CloudSweepError::Cancelled.to_string());
        }
        self.emit(ScanEvent::AccountStarted { unit: unit.to_string(), account_id: account.id.clone() });

        let role_name = role.unwrap_or(&self.broker.config().role_name);
        let credentials = match self.credential_call(self.broker.assume(&account.id, role)).await {
            None => {
                return AccountReport::failed(account.id.as_str(), account.name.as_str(), CloudSweepError::Cancelled.to_string());
            }
            Some(Ok(c)) => c,
            Some(Err(e)) => {
                let msg = truncate_error(&format!("Failed to assume role {} in {}: {}", role_name, account.id, e));
                warn!(account_id = %account.id, unit = %unit, error = %e, "Skipping account");
                self.emit(ScanEvent::AccountFailed { account_id: account.id.clone(), error: msg.clone() });
                return AccountReport::failed(account.id.as_str(), account.name.as_str(), msg);
            }
        };

        let results = self.run_scanners(scanners, regions, &credentials, &account.id).await;
        drop(credentials);

        let findings = results.iter().map(ScanResult::total_findings).sum();
        self.emit(ScanEvent::AccountCompleted { account_id: account.id.clone(), findings });
        AccountReport {
            account_id: account.id.clone(),
            name: account.name.clone(),
            error: None,
            results,
        }
    }

    async fn scan_management(
        &self,
        management_id: &str,
        scanners: &[Arc<dyn Scanner>],
        regions: &[String],
    ) -> AccountReport {
        self.emit(ScanEvent::AccountStarted {
            unit: MANAGEMENT_UNIT.to_string(),
            account_id: management_id.to_string(),
        });
        let credentials = match self.credential_call(self.broker.source_identity()).await {
            None => {
                return AccountReport::failed(management_id, MANAGEMENT_ACCOUNT_NAME, CloudSweepError::Cancelled.to_string());
            }
            Some(Ok(c)) => c,
            Some(Err(e)) => {
                let msg = truncate_error(&format!("Failed to load source credentials: {}", e));
                error!(account_id = %management_id, error = %e, "Management account not scanned");
                self.emit(ScanEvent::AccountFailed { account_id: management_id.to_string(), error: msg.clone() });
                return AccountReport::failed(management_id, MANAGEMENT_ACCOUNT_NAME, msg);
            }
        };

        let results = self.run_scanners(scanners, regions, &credentials, management_id).await;
        drop(credentials);

        let findings = results.iter().map(ScanResult::total_findings).sum();
        self.emit(ScanEvent::AccountCompleted { account_id: management_id.to_string(), findings });
        AccountReport {
            account_id: management_id.to_string(),
            name: MANAGEMENT_ACCOUNT_NAME.to_string(),
            error: None,
            results,
        }
    }

    /// Run every scanner concurrently against one account. Results follow the
    /// order of `scanners`.
    async fn run_scanners(
        &self,
        scanners: &[Arc<dyn Scanner>],
        regions: &[String],
        credentials: &Credentials,
        account_id: &str,
    ) -> Vec<ScanResult> {
        let options = self.options();
        let runs = scanners.iter().map(|scanner| {
            let options = &options;
            async move {
                let started = Instant::now();
                let outcome = AssertUnwindSafe(scanner.scan(regions, credentials, account_id, options))
                    .catch_unwind()
                    .await;
                let mut result = match outcome {
                    Ok(result) => result,
                    Err(panic) => {
                        let msg = panic_message(panic.as_ref());
                        error!(scanner = %scanner.id(), account_id = %account_id, panic = %msg, "Scanner panicked");
                        ScanResult::failed(scanner.id(), format!("scanner panicked: {}", msg))
                    }
                };
                result.stamp_account(account_id);
                if result.duration.is_zero() {
                    result.duration = started.elapsed();
                }
                debug!(
                    scanner = %scanner.id(),
                    account_id = %account_id,
                    findings = result.findings.len(),
                    errors = result.errors.len(),
                    "Scanner finished"
                );
                result
            }
        });
        futures::future::join_all(runs).await
    }
}
