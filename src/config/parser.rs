use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use super::schema::CONFIG_SCHEMA;
use super::types::CloudSweepConfig;
use crate::errors::CloudSweepError;

const MAX_CONFIG_BYTES: u64 = 1_048_576;

static REGION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z]{2}(-[a-z]+)+-\d{1,2}$").expect("region pattern compiles")
});

/// Shape check for region names such as `us-east-1` or `us-gov-west-1`.
pub fn is_valid_region(region: &str) -> bool {
    REGION_PATTERN.is_match(region)
}

/// Reject the first malformed region name.
pub fn validate_regions(regions: &[String]) -> Result<(), CloudSweepError> {
    match regions.iter().find(|r| !is_valid_region(r)) {
        Some(bad) => Err(CloudSweepError::InvalidRegion(bad.clone())),
        None => Ok(()),
    }
}

pub async fn parse_config(path: &Path) -> Result<CloudSweepConfig, CloudSweepError> {
    if !path.exists() {
        return Err(CloudSweepError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > MAX_CONFIG_BYTES {
        return Err(CloudSweepError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    parse_config_str(&content)
}

pub fn parse_config_str(content: &str) -> Result<CloudSweepConfig, CloudSweepError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
    if yaml.is_null() {
        return Ok(CloudSweepConfig::default());
    }

    validate_schema(&yaml)?;

    let config: CloudSweepConfig = serde_yaml::from_value(yaml)
        .map_err(|e| CloudSweepError::Config(format!("Invalid config: {}", e)))?;

    validate_semantics(&config)?;

    Ok(config)
}

/// Structural check against the JSON schema. Advisory: mismatches are logged.
fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), CloudSweepError> {
    let json_value = serde_json::to_value(yaml)
        .map_err(|e| CloudSweepError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| CloudSweepError::Config(format!("Schema compilation error: {}", e)))?;

    if let Err(errors) = compiled.validate(&json_value) {
        for e in errors {
            warn!(validation_error = %format!("{} at {}", e, e.instance_path), "Config schema warning");
        }
    }

    Ok(())
}

fn validate_semantics(config: &CloudSweepConfig) -> Result<(), CloudSweepError> {
    if let Some(scan) = &config.scan {
        if scan.max_region_workers == Some(0) {
            return Err(CloudSweepError::Config("scan.max_region_workers must be at least 1".into()));
        }
        if scan.account_concurrency == Some(0) {
            return Err(CloudSweepError::Config("scan.account_concurrency must be at least 1".into()));
        }
        if let Some(role) = &scan.role_name {
            if role.trim().is_empty() {
                return Err(CloudSweepError::Config("scan.role_name must not be empty".into()));
            }
        }
        if let Some(regions) = &scan.regions {
            validate_regions(regions)?;
        }
    }

    if let Some(inventory) = &config.inventory {
        validate_regions(&inventory.regions)?;

        let mut seen = HashSet::new();
        for unit in &inventory.organizational_units {
            for account in &unit.accounts {
                if account.id == inventory.management_account_id {
                    return Err(CloudSweepError::Config(format!(
                        "Management account {} must not be listed in unit '{}'",
                        account.id, unit.name
                    )));
                }
                if !seen.insert(account.id.as_str()) {
                    return Err(CloudSweepError::Config(format!(
                        "Duplicate account id {} in organizational units",
                        account.id
                    )));
                }
            }
        }

        for denied in &inventory.denied_accounts {
            if !seen.contains(denied.as_str()) {
                warn!(account_id = %denied, "Denied account is not part of the inventory");
            }
        }
    }

    if let Some(fixtures) = &config.fixtures {
        let mut ids = HashSet::new();
        for fixture in fixtures {
            if !ids.insert(fixture.id.as_str()) {
                return Err(CloudSweepError::Config(format!("Duplicate fixture scanner id: {}", fixture.id)));
            }
            validate_regions(&fixture.failing_regions)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
scan:
  role_name: OrganizationAccountAccessRole
  regions: [us-east-1, us-west-2]
  max_region_workers: 4
inventory:
  management_account_id: "000000000000"
  regions: [us-east-1, us-west-2]
  organizational_units:
    - name: Prod
      id: ou-1
      accounts:
        - { id: "111111111111", name: svc-a }
        - { id: "222222222222", name: svc-b, status: SUSPENDED }
fixtures:
  - id: cost-anomaly
    findings:
      - { region: us-east-1, title: spike, severity: medium, monthly_impact: 8.0 }
"#;

    #[test]
    fn test_parse_sample() {
        let config = parse_config_str(SAMPLE).unwrap();
        let inventory = config.inventory.unwrap();
        assert_eq!(inventory.organizational_units[0].accounts.len(), 2);
        assert_eq!(config.scan.unwrap().max_region_workers, Some(4));
        assert_eq!(config.fixtures.unwrap()[0].findings[0].monthly_impact, 8.0);
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = parse_config_str("").unwrap();
        assert!(config.scan.is_none());
    }

    #[test]
    fn test_rejects_zero_workers() {
        let err = parse_config_str("scan:\n  max_region_workers: 0\n").unwrap_err();
        assert!(matches!(err, CloudSweepError::Config(_)));
    }

    #[test]
    fn test_rejects_duplicate_accounts() {
        let yaml = r#"
inventory:
  management_account_id: "000000000000"
  organizational_units:
    - { name: A, id: ou-a, accounts: [{ id: "111111111111", name: x }] }
    - { name: B, id: ou-b, accounts: [{ id: "111111111111", name: y }] }
"#;
        let err = parse_config_str(yaml).unwrap_err();
        assert!(err.to_string().contains("Duplicate account id"));
    }

    #[test]
    fn test_rejects_bad_region() {
        let err = parse_config_str("scan:\n  regions: [us-east-1, Mars]\n").unwrap_err();
        assert!(matches!(err, CloudSweepError::InvalidRegion(r) if r == "Mars"));
    }

    #[test]
    fn test_region_shapes() {
        assert!(is_valid_region("us-east-1"));
        assert!(is_valid_region("us-gov-west-1"));
        assert!(is_valid_region("ap-southeast-2"));
        assert!(!is_valid_region("us-east"));
        assert!(!is_valid_region("US-EAST-1"));
        assert!(!is_valid_region(""));
    }

    #[tokio::test]
    async fn test_parse_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = parse_config(file.path()).await.unwrap();
        assert!(config.inventory.is_some());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = parse_config(Path::new("/nonexistent/cloudsweep.yaml")).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
