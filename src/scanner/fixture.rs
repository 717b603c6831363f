use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use super::contract::{ScanOptions, Scanner};
use crate::config::{FixtureFinding, ScannerFixture};
use crate::models::{Credentials, Finding, ScanResult};

/// Scanner that replays findings declared in configuration.
///
/// Each region is one simulated provider call. Regions listed in
/// `failing_regions` fail, so partial-failure paths can be exercised without a
/// cloud account. The `min_monthly_impact` scan parameter drops findings
/// below that dollar amount.
pub struct FixtureScanner {
    id: String,
    description: String,
    failing_regions: Arc<Vec<String>>,
    latency: Duration,
    findings: Arc<Vec<FixtureFinding>>,
}

impl FixtureScanner {
    pub fn new(fixture: ScannerFixture) -> Self {
        let description = if fixture.description.is_empty() {
            format!("Replays configured findings for {}", fixture.id)
        } else {
            fixture.description
        };
        Self {
            id: fixture.id,
            description,
            failing_regions: Arc::new(fixture.failing_regions),
            latency: Duration::from_millis(fixture.latency_ms),
            findings: Arc::new(fixture.findings),
        }
    }
}

const MIN_IMPACT_PARAM: &str = "min_monthly_impact";

fn to_finding(scanner_id: &str, f: &FixtureFinding) -> Finding {
    let finding = Finding::new(scanner_id, f.title.as_str(), f.severity)
        .with_description(f.description.as_str())
        .with_resource(f.resource_id.as_str())
        .with_region(f.region.as_str())
        .with_monthly_impact(f.monthly_impact)
        .with_recommended_action(f.recommended_action.as_str());
    f.metadata
        .iter()
        .fold(finding, |acc, (k, v)| acc.with_metadata(k.as_str(), v.clone()))
}

#[async_trait]
impl Scanner for FixtureScanner {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn scan(
        &self,
        regions: &[String],
        credentials: &Credentials,
        account_id: &str,
        options: &ScanOptions,
    ) -> ScanResult {
        let started = Instant::now();
        if credentials.is_expired_at(Utc::now()) {
            return ScanResult::failed(self.id.as_str(), format!("credentials for {} have expired", account_id));
        }

        let scanner_id = self.id.clone();
        let account = account_id.to_string();
        let failing = self.failing_regions.clone();
        let declared = self.findings.clone();
        let latency = self.latency;
        let min_impact = options.param(MIN_IMPACT_PARAM).and_then(|v| v.as_f64()).unwrap_or(0.0);
        let call_options = options.clone();

        let report = options
            .fan_out(regions, move |region: String| {
                let scanner_id = scanner_id.clone();
                let account = account.clone();
                let failing = failing.clone();
                let declared = declared.clone();
                let call_options = call_options.clone();
                async move {
                    call_options
                        .timed(async {
                            if !latency.is_zero() {
                                tokio::time::sleep(latency).await;
                            }
                            if failing.contains(&region) {
                                return Err(format!("simulated provider failure in {}", region));
                            }
                            Ok(declared
                                .iter()
                                .filter(|f| f.region == region)
                                .filter(|f| f.account_id.as_deref().map_or(true, |a| a == account))
                                .filter(|f| f.monthly_impact >= min_impact)
                                .map(|f| to_finding(&scanner_id, f))
                                .collect::<Vec<_>>())
                        })
                        .await
                }
            })
            .await;

        let mut result = ScanResult::new(self.id.as_str());
        let (findings, failures) = report.into_parts();
        result.findings = findings;
        result.errors = failures.iter().map(|f| format!("region {}: {}", f.region, f.error)).collect();
        result.region_failures = failures;
        result.regions_scanned = regions.len();
        result.accounts_scanned = 1;
        result.duration = started.elapsed();

        debug!(
            scanner = %self.id,
            account_id = %account_id,
            findings = result.findings.len(),
            errors = result.errors.len(),
            "Fixture scan finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    fn fixture() -> ScannerFixture {
        ScannerFixture {
            id: "zombie-hunter".into(),
            description: String::new(),
            failing_regions: vec!["us-west-2".into()],
            latency_ms: 0,
            findings: vec![
                FixtureFinding {
                    account_id: None,
                    region: "us-east-1".into(),
                    title: "Unattached volume".into(),
                    severity: Severity::Medium,
                    description: String::new(),
                    resource_id: "vol-1".into(),
                    monthly_impact: 8.0,
                    recommended_action: "Delete".into(),
                    metadata: [("volume_type".to_string(), serde_json::json!("gp2"))].into_iter().collect(),
                },
                FixtureFinding {
                    account_id: None,
                    region: "us-west-2".into(),
                    title: "Idle instance".into(),
                    severity: Severity::High,
                    description: String::new(),
                    resource_id: "i-2".into(),
                    monthly_impact: 40.0,
                    recommended_action: String::new(),
                    metadata: Default::default(),
                },
                FixtureFinding {
                    account_id: Some("222".into()),
                    region: "us-east-1".into(),
                    title: "Old snapshot".into(),
                    severity: Severity::Low,
                    description: String::new(),
                    resource_id: "snap-3".into(),
                    monthly_impact: 1.0,
                    recommended_action: String::new(),
                    metadata: Default::default(),
                },
            ],
        }
    }

    fn regions() -> Vec<String> {
        vec!["us-east-1".into(), "us-west-2".into()]
    }

    #[tokio::test]
    async fn test_failing_region_contributes_nothing() {
        let scanner = FixtureScanner::new(fixture());
        let creds = Credentials::long_lived("AKIA", "secret");
        let result = scanner.scan(&regions(), &creds, "111", &ScanOptions::default()).await;

        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].region(), "us-east-1");
        assert_eq!(result.region_failures.len(), 1);
        assert_eq!(result.region_failures[0].region, "us-west-2");
        assert!(result.errors[0].contains("us-west-2"));
        assert_eq!(result.regions_scanned, 2);
    }

    #[tokio::test]
    async fn test_account_scoped_findings() {
        let scanner = FixtureScanner::new(fixture());
        let creds = Credentials::long_lived("AKIA", "secret");
        let result = scanner.scan(&regions(), &creds, "222", &ScanOptions::default()).await;
        assert_eq!(result.findings.len(), 2);
    }

    #[tokio::test]
    async fn test_expired_credentials_fail_without_findings() {
        let scanner = FixtureScanner::new(fixture());
        let creds = Credentials::temporary("ASIA", "s", "t", Utc::now() - chrono::Duration::minutes(1));
        let result = scanner.scan(&regions(), &creds, "111", &ScanOptions::default()).await;
        assert!(result.findings.is_empty());
        assert_eq!(result.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_call_timeout_recorded_per_region() {
        let mut slow = fixture();
        slow.failing_regions.clear();
        slow.latency_ms = 200;
        let scanner = FixtureScanner::new(slow);
        let options = ScanOptions { call_timeout: Duration::from_millis(10), ..Default::default() };
        let creds = Credentials::long_lived("AKIA", "secret");
        let result = scanner.scan(&regions(), &creds, "111", &options).await;
        assert!(result.findings.is_empty());
        assert_eq!(result.region_failures.len(), 2);
    }

    #[tokio::test]
    async fn test_min_impact_param_and_metadata() {
        let scanner = FixtureScanner::new(fixture());
        let creds = Credentials::long_lived("AKIA", "secret");
        let mut options = ScanOptions::default();
        options.params.insert("min_monthly_impact".into(), serde_json::json!(5.0));
        let result = scanner.scan(&regions(), &creds, "222", &options).await;

        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].title(), "Unattached volume");
        assert_eq!(result.findings[0].metadata()["volume_type"], "gp2");
    }

    #[test]
    fn test_default_description() {
        let scanner = FixtureScanner::new(fixture());
        assert!(scanner.description().contains("zombie-hunter"));
    }
}
