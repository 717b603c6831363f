use std::collections::HashMap;
use std::time::Duration;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::aggregate::{account_totals, org_totals, Totals};
use crate::config::ScanConfig;
use crate::models::ScanResult;
use crate::scanner::contract::{ScanOptions, DEFAULT_CALL_TIMEOUT};
use crate::utils::formatting::round_cents;

/// Runtime scan settings resolved from config with defaults applied.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    /// Overrides the directory's region list when set.
    pub regions: Option<Vec<String>>,
    pub max_region_workers: usize,
    pub account_concurrency: usize,
    pub call_timeout: Duration,
    pub region_timeout: Option<Duration>,
    pub params: HashMap<String, Value>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            regions: None,
            max_region_workers: 10,
            account_concurrency: 1,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            region_timeout: None,
            params: HashMap::new(),
        }
    }
}

impl ScanSettings {
    pub fn from_config(scan: Option<&ScanConfig>) -> Self {
        let defaults = Self::default();
        let Some(scan) = scan else {
            return defaults;
        };
        Self {
            regions: scan.regions.clone().filter(|r| !r.is_empty()),
            max_region_workers: scan.max_region_workers.unwrap_or(defaults.max_region_workers).max(1),
            account_concurrency: scan.account_concurrency.unwrap_or(defaults.account_concurrency).max(1),
            call_timeout: scan.call_timeout_secs.map(Duration::from_secs).unwrap_or(defaults.call_timeout),
            region_timeout: scan.region_timeout_secs.map(Duration::from_secs),
            params: scan.params.clone().unwrap_or_default(),
        }
    }

    pub fn scan_options(&self, cancel: CancellationToken) -> ScanOptions {
        ScanOptions {
            call_timeout: self.call_timeout,
            max_region_workers: self.max_region_workers,
            region_timeout: self.region_timeout,
            cancel,
            params: self.params.clone(),
        }
    }
}

/// One account's slice of an org scan.
#[derive(Debug, Clone, Default)]
pub struct AccountReport {
    pub account_id: String,
    pub name: String,
    /// Set when credentials could not be obtained; `results` is then empty.
    pub error: Option<String>,
    pub results: Vec<ScanResult>,
}

impl AccountReport {
    pub fn failed(account_id: impl Into<String>, name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            name: name.into(),
            error: Some(error.into()),
            results: Vec::new(),
        }
    }

    pub fn totals(&self) -> Totals {
        account_totals(&self.results)
    }
}

impl Serialize for AccountReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let totals = self.totals();
        let mut s = serializer.serialize_struct("AccountReport", 7)?;
        s.serialize_field("account_id", &self.account_id)?;
        s.serialize_field("name", &self.name)?;
        s.serialize_field("error", &self.error)?;
        s.serialize_field("findings_count", &totals.findings_count)?;
        s.serialize_field("critical_count", &totals.critical_count)?;
        s.serialize_field("monthly_impact", &round_cents(totals.monthly_impact))?;
        s.serialize_field("scanners", &self.results)?;
        s.end()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UnitReport {
    pub name: String,
    pub id: String,
    pub accounts: Vec<AccountReport>,
}

impl UnitReport {
    pub fn totals(&self) -> Totals {
        self.accounts.iter().map(AccountReport::totals).sum()
    }
}

/// Result tree of an organization-wide job, in snapshot order with the
/// management unit last unless the tree already had one.
#[derive(Debug, Clone, Default)]
pub struct OrgScanReport {
    pub units: Vec<UnitReport>,
}

impl OrgScanReport {
    pub fn totals(&self) -> Totals {
        org_totals(self)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &AccountReport> {
        self.units.iter().flat_map(|u| u.accounts.iter())
    }

    pub fn account(&self, account_id: &str) -> Option<&AccountReport> {
        self.accounts().find(|a| a.account_id == account_id)
    }

    pub fn summary(&self) -> OrgSummary {
        let totals = self.totals();
        OrgSummary {
            total_findings: totals.findings_count,
            total_critical: totals.critical_count,
            total_monthly_impact: round_cents(totals.monthly_impact),
            accounts_scanned: self.accounts().filter(|a| a.error.is_none()).count(),
            accounts_failed: self.accounts().filter(|a| a.error.is_some()).count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrgSummary {
    pub total_findings: usize,
    pub total_critical: usize,
    pub total_monthly_impact: f64,
    pub accounts_scanned: usize,
    pub accounts_failed: usize,
}

#[derive(Serialize)]
struct UnitView<'a> {
    name: &'a str,
    id: &'a str,
    #[serde(flatten)]
    totals: Totals,
    accounts: &'a [AccountReport],
}

impl Serialize for OrgScanReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let units: Vec<UnitView<'_>> = self
            .units
            .iter()
            .map(|u| UnitView { name: &u.name, id: &u.id, totals: u.totals(), accounts: &u.accounts })
            .collect();
        let mut s = serializer.serialize_struct("OrgScanReport", 2)?;
        s.serialize_field("by_ou", &units)?;
        s.serialize_field("summary", &self.summary())?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Finding, Severity};

    fn report() -> OrgScanReport {
        let mut ok = ScanResult::new("zombie-hunter");
        ok.findings = vec![
            Finding::new("zombie-hunter", "a", Severity::Medium).with_monthly_impact(8.0),
            Finding::new("zombie-hunter", "b", Severity::Critical).with_monthly_impact(73.004),
        ];
        OrgScanReport {
            units: vec![UnitReport {
                name: "Prod".into(),
                id: "ou-1".into(),
                accounts: vec![
                    AccountReport { account_id: "111".into(), name: "svc-a".into(), error: None, results: vec![ok] },
                    AccountReport::failed("222", "svc-b", "Failed to assume role Audit in 222: denied"),
                ],
            }],
        }
    }

    #[test]
    fn test_settings_defaults() {
        let settings = ScanSettings::from_config(None);
        assert_eq!(settings.max_region_workers, 10);
        assert_eq!(settings.account_concurrency, 1);
        assert_eq!(settings.call_timeout, Duration::from_secs(30));
        assert!(settings.region_timeout.is_none());
    }

    #[test]
    fn test_settings_from_config() {
        let scan = ScanConfig {
            regions: Some(vec![]),
            max_region_workers: Some(4),
            region_timeout_secs: Some(90),
            params: Some([("min_monthly_impact".to_string(), serde_json::json!(10))].into_iter().collect()),
            ..Default::default()
        };
        let settings = ScanSettings::from_config(Some(&scan));
        let options = settings.scan_options(CancellationToken::new());
        assert_eq!(options.param("min_monthly_impact"), Some(&serde_json::json!(10)));
        assert!(settings.regions.is_none());
        assert_eq!(settings.max_region_workers, 4);
        assert_eq!(settings.region_timeout, Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_summary_counts_failed_accounts() {
        let summary = report().summary();
        assert_eq!(summary.total_findings, 2);
        assert_eq!(summary.total_critical, 1);
        assert_eq!(summary.total_monthly_impact, 81.0);
        assert_eq!(summary.accounts_scanned, 1);
        assert_eq!(summary.accounts_failed, 1);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(report()).unwrap();
        let unit = &json["by_ou"][0];
        assert_eq!(unit["name"], "Prod");
        assert_eq!(unit["findings_count"], 2);
        assert_eq!(unit["accounts"][0]["findings_count"], 2);
        assert_eq!(unit["accounts"][0]["scanners"][0]["scanner_id"], "zombie-hunter");
        assert_eq!(unit["accounts"][1]["findings_count"], 0);
        assert!(unit["accounts"][1]["error"].as_str().unwrap().contains("222"));
        assert_eq!(json["summary"]["total_findings"], 2);
    }
}
