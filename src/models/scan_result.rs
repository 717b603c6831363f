use std::time::Duration;

use serde::{Serialize, Serializer};
use super::finding::{Finding, Severity};

/// A region whose contribution is missing from a result, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionFailure {
    pub region: String,
    pub error: String,
}

/// The output of one scanner invocation over one account.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub scanner_id: String,
    pub findings: Vec<Finding>,
    /// Wall-clock duration of the scanner run.
    pub duration: Duration,
    /// Provider-call failures caught inside the scanner. Partial findings are kept.
    pub errors: Vec<String>,
    pub regions_scanned: usize,
    pub accounts_scanned: usize,
    pub region_failures: Vec<RegionFailure>,
}

impl ScanResult {
    pub fn new(scanner_id: impl Into<String>) -> Self {
        Self {
            scanner_id: scanner_id.into(),
            ..Default::default()
        }
    }

    /// A result carrying no findings and a single error, used when a scanner
    /// could not produce anything at all.
    pub fn failed(scanner_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            scanner_id: scanner_id.into(),
            errors: vec![error.into()],
            ..Default::default()
        }
    }

    /// Sum of `monthly_impact` over all findings; zero when there are none.
    pub fn total_impact(&self) -> f64 {
        self.findings.iter().map(Finding::monthly_impact).sum()
    }

    /// Number of findings with `Severity::Critical`.
    pub fn critical_count(&self) -> usize {
        self.findings.iter().filter(|f| f.severity() == Severity::Critical).count()
    }

    /// Returns the total number of findings in this result.
    pub fn total_findings(&self) -> usize {
        self.findings.len()
    }

    pub fn stamp_account(&mut self, account_id: &str) {
        for finding in &mut self.findings {
            finding.stamp_account(account_id);
        }
    }
}

#[derive(Serialize)]
struct ScanResultView<'a> {
    scanner_id: &'a str,
    findings: &'a [Finding],
    duration_ms: u64,
    accounts_scanned: usize,
    regions_scanned: usize,
    errors: &'a [String],
    region_failures: &'a [RegionFailure],
    total_impact: f64,
    critical_count: usize,
}

impl Serialize for ScanResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ScanResultView {
            scanner_id: &self.scanner_id,
            findings: &self.findings,
            duration_ms: self.duration.as_millis() as u64,
            accounts_scanned: self.accounts_scanned,
            regions_scanned: self.regions_scanned,
            errors: &self.errors,
            region_failures: &self.region_failures,
            total_impact: self.total_impact(),
            critical_count: self.critical_count(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(severity: Severity, impact: f64) -> Finding {
        Finding::new("cost-anomaly", "spike", severity).with_monthly_impact(impact)
    }

    #[test]
    fn test_empty_result_totals() {
        let result = ScanResult::new("cost-anomaly");
        assert_eq!(result.total_impact(), 0.0);
        assert_eq!(result.critical_count(), 0);
        assert_eq!(result.total_findings(), 0);
    }

    #[test]
    fn test_derived_totals() {
        let mut result = ScanResult::new("cost-anomaly");
        result.findings = vec![
            finding(Severity::Critical, 10.5),
            finding(Severity::Low, 4.5),
            finding(Severity::Critical, 0.0),
            finding(Severity::Info, 100.0),
        ];
        assert_eq!(result.total_impact(), 115.0);
        assert_eq!(result.critical_count(), 2);
    }

    #[test]
    fn test_serialized_view_includes_derived_fields() {
        let mut result = ScanResult::new("zombie-hunter");
        result.findings = vec![finding(Severity::Critical, 3.6)];
        result.duration = Duration::from_millis(1500);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["scanner_id"], "zombie-hunter");
        assert_eq!(json["duration_ms"], 1500);
        assert_eq!(json["critical_count"], 1);
        assert_eq!(json["total_impact"], 3.6);
        assert_eq!(json["findings"][0]["severity"], "critical");
    }

    #[test]
    fn test_stamp_account_applies_to_all_findings() {
        let mut result = ScanResult::new("zombie-hunter");
        result.findings = vec![finding(Severity::Low, 1.0), finding(Severity::High, 2.0)];
        result.stamp_account("111");
        assert!(result.findings.iter().all(|f| f.account_id() == "111"));
    }
}
