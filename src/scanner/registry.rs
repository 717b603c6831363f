use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::contract::Scanner;
use crate::errors::CloudSweepError;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScannerInfo {
    pub id: String,
    pub description: String,
    pub version: String,
}

/// Explicit table of scanners, filled once at startup and read-only afterwards.
#[derive(Clone, Default)]
pub struct ScannerRegistry {
    scanners: Vec<Arc<dyn Scanner>>,
}

impl ScannerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, scanner: Arc<dyn Scanner>) -> Result<(), CloudSweepError> {
        if self.get(scanner.id()).is_some() {
            return Err(CloudSweepError::Config(format!("Scanner '{}' registered twice", scanner.id())));
        }
        debug!(scanner = %scanner.id(), "Registered scanner");
        self.scanners.push(scanner);
        Ok(())
    }

    pub fn with(mut self, scanner: Arc<dyn Scanner>) -> Result<Self, CloudSweepError> {
        self.register(scanner)?;
        Ok(self)
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Scanner>> {
        self.scanners.iter().find(|s| s.id() == id).cloned()
    }

    /// Registration order.
    pub fn ids(&self) -> Vec<String> {
        self.scanners.iter().map(|s| s.id().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.scanners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scanners.is_empty()
    }

    /// Look up requested names in request order. An empty request selects every
    /// registered scanner; repeated names resolve once.
    pub fn resolve(&self, names: &[String]) -> Result<Vec<Arc<dyn Scanner>>, CloudSweepError> {
        if names.is_empty() {
            return Ok(self.scanners.clone());
        }
        let mut seen = HashSet::new();
        names
            .iter()
            .filter(|name| seen.insert(name.as_str()))
            .map(|name| {
                self.get(name).ok_or_else(|| CloudSweepError::UnknownScanner {
                    name: name.clone(),
                    valid: self.ids().join(", "),
                })
            })
            .collect()
    }

    pub fn info(&self) -> Vec<ScannerInfo> {
        self.scanners
            .iter()
            .map(|s| ScannerInfo {
                id: s.id().to_string(),
                description: s.description().to_string(),
                version: s.version().to_string(),
            })
            .collect()
    }
}

impl std::fmt::Debug for ScannerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.scanners.iter().map(|s| s.id())).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Credentials, ScanResult};
    use crate::scanner::contract::ScanOptions;
    use async_trait::async_trait;

    struct Named(&'static str);

    #[async_trait]
    impl Scanner for Named {
        fn id(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "test scanner"
        }
        async fn scan(&self, _: &[String], _: &Credentials, _: &str, _: &ScanOptions) -> ScanResult {
            ScanResult::new(self.0)
        }
    }

    fn registry() -> ScannerRegistry {
        ScannerRegistry::new()
            .with(Arc::new(Named("cost-anomaly")))
            .unwrap()
            .with(Arc::new(Named("zombie-hunter")))
            .unwrap()
    }

    #[test]
    fn test_empty_request_selects_all() {
        let resolved = registry().resolve(&[]).unwrap();
        let ids: Vec<&str> = resolved.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["cost-anomaly", "zombie-hunter"]);
    }

    #[test]
    fn test_resolve_keeps_request_order() {
        let resolved = registry().resolve(&["zombie-hunter".into(), "cost-anomaly".into()]).unwrap();
        assert_eq!(resolved[0].id(), "zombie-hunter");
    }

    #[test]
    fn test_repeated_names_resolve_once() {
        let names = vec!["zombie-hunter".into(), "cost-anomaly".into(), "zombie-hunter".into()];
        let resolved = registry().resolve(&names).unwrap();
        let ids: Vec<&str> = resolved.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["zombie-hunter", "cost-anomaly"]);
    }

    #[test]
    fn test_unknown_scanner_lists_valid_names() {
        let err = registry().resolve(&["nope".into()]).err().unwrap();
        let msg = err.to_string();
        assert!(msg.contains("nope"));
        assert!(msg.contains("cost-anomaly, zombie-hunter"));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let err = registry().with(Arc::new(Named("cost-anomaly"))).err().unwrap();
        assert!(matches!(err, CloudSweepError::Config(_)));
    }

    #[test]
    fn test_info_reports_default_version() {
        let info = registry().info();
        assert_eq!(info.len(), 2);
        assert_eq!(info[0].version, "0.1.0");
    }
}
