use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity level for a finding, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single observation emitted by a scanner.
///
/// Fields are read-only after construction. The one exception is `account_id`:
/// scanners are account-agnostic at call time, so the orchestrator stamps it
/// once the scanner has returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    scanner_id: String,
    title: String,
    severity: Severity,
    description: String,
    #[serde(default)]
    resource_id: String,
    #[serde(default)]
    account_id: String,
    #[serde(default)]
    region: String,
    /// Estimated monthly cost impact in USD, never negative.
    #[serde(default)]
    monthly_impact: f64,
    #[serde(default)]
    recommended_action: String,
    #[serde(default)]
    metadata: BTreeMap<String, serde_json::Value>,
    timestamp: DateTime<Utc>,
}

impl Finding {
    pub fn new(scanner_id: impl Into<String>, title: impl Into<String>, severity: Severity) -> Self {
        Self {
            scanner_id: scanner_id.into(),
            title: title.into(),
            severity,
            description: String::new(),
            resource_id: String::new(),
            account_id: String::new(),
            region: String::new(),
            monthly_impact: 0.0,
            recommended_action: String::new(),
            metadata: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_resource(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = resource_id.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Negative and non-finite impacts are stored as zero.
    pub fn with_monthly_impact(mut self, impact: f64) -> Self {
        self.monthly_impact = if impact.is_finite() && impact > 0.0 { impact } else { 0.0 };
        self
    }

    pub fn with_recommended_action(mut self, action: impl Into<String>) -> Self {
        self.recommended_action = action.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Attribute this finding to the account it was observed in.
    pub fn stamp_account(&mut self, account_id: &str) {
        self.account_id = account_id.to_string();
    }

    pub fn scanner_id(&self) -> &str {
        &self.scanner_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn monthly_impact(&self) -> f64 {
        self.monthly_impact
    }

    pub fn recommended_action(&self) -> &str {
        &self.recommended_action
    }

    pub fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
