use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{AccountStatus, Severity};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CloudSweepConfig {
    pub scan: Option<ScanConfig>,
    pub jobs: Option<JobsConfig>,
    pub server: Option<ServerConfig>,
    pub inventory: Option<InventoryConfig>,
    pub fixtures: Option<Vec<ScannerFixture>>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ScanConfig {
    pub role_name: Option<String>,
    pub session_name: Option<String>,
    pub credential_duration_secs: Option<u64>,
    pub regions: Option<Vec<String>>,
    pub max_region_workers: Option<usize>,
    pub account_concurrency: Option<usize>,
    pub call_timeout_secs: Option<u64>,
    pub region_timeout_secs: Option<u64>,
    pub max_credential_retries: Option<u32>,
    /// Handed to every scanner as `ScanOptions::params`.
    pub params: Option<HashMap<String, Value>>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct JobsConfig {
    pub ttl_secs: Option<u64>,
    pub max_jobs: Option<usize>,
    pub reap_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Literal key or `$VAR` reference.
    pub api_key: Option<String>,
    pub cors_origins: Option<Vec<String>>,
    /// Per client address; 0 disables the limiter.
    pub rate_limit_per_minute: Option<u32>,
    pub rate_limit_burst: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct InventoryConfig {
    pub management_account_id: String,
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub organizational_units: Vec<UnitConfig>,
    /// Accounts whose role trust policy rejects the orchestrator.
    #[serde(default)]
    pub denied_accounts: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UnitConfig {
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: AccountStatus,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScannerFixture {
    pub id: String,
    #[serde(default)]
    pub description: String,
    /// Regions in which every provider call fails.
    #[serde(default)]
    pub failing_regions: Vec<String>,
    /// Simulated latency of each per-region provider call.
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default)]
    pub findings: Vec<FixtureFinding>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FixtureFinding {
    /// Restrict the finding to one account; unset means every account.
    pub account_id: Option<String>,
    pub region: String,
    pub title: String,
    pub severity: Severity,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub resource_id: String,
    #[serde(default)]
    pub monthly_impact: f64,
    #[serde(default)]
    pub recommended_action: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}
