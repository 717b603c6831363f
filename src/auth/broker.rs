use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use super::provider::{AssumeRoleRequest, CredentialProvider};
use crate::config::ScanConfig;
use crate::errors::{with_retry, CredentialError, RetryConfig};
use crate::models::Credentials;

pub const DEFAULT_ROLE_NAME: &str = "OrganizationAccountAccessRole";
pub const DEFAULT_SESSION_NAME: &str = "CloudSweepOrgScan";
pub const DEFAULT_CREDENTIAL_DURATION: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub role_name: String,
    pub session_name: String,
    pub duration: Duration,
    pub retry: RetryConfig,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            role_name: DEFAULT_ROLE_NAME.to_string(),
            session_name: DEFAULT_SESSION_NAME.to_string(),
            duration: DEFAULT_CREDENTIAL_DURATION,
            retry: RetryConfig::default(),
        }
    }
}

impl BrokerConfig {
    pub fn from_config(scan: Option<&ScanConfig>) -> Self {
        let defaults = Self::default();
        let Some(scan) = scan else {
            return defaults;
        };
        Self {
            role_name: scan.role_name.clone().unwrap_or(defaults.role_name),
            session_name: scan.session_name.clone().unwrap_or(defaults.session_name),
            duration: scan.credential_duration_secs.map(Duration::from_secs).unwrap_or(defaults.duration),
            retry: RetryConfig::with_max_retries(scan.max_credential_retries.unwrap_or(0)),
        }
    }
}

pub fn role_arn(account_id: &str, role_name: &str) -> String {
    format!("arn:aws:iam::{}:role/{}", account_id, role_name)
}

/// Exchanges the orchestrator's identity for credentials scoped to one account.
///
/// Credentials are returned by value to the caller; the broker keeps nothing.
#[derive(Clone)]
pub struct CredentialBroker {
    provider: Arc<dyn CredentialProvider>,
    config: BrokerConfig,
}

impl CredentialBroker {
    pub fn new(provider: Arc<dyn CredentialProvider>, config: BrokerConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Assume `role_override` (or the configured role) in `account_id`.
    pub async fn assume(
        &self,
        account_id: &str,
        role_override: Option<&str>,
    ) -> Result<Credentials, CredentialError> {
        let role_name = role_override.unwrap_or(&self.config.role_name);
        if account_id.trim().is_empty() {
            return Err(CredentialError::InvalidRequest("account id is empty".into()));
        }
        if role_name.trim().is_empty() {
            return Err(CredentialError::InvalidRequest("role name is empty".into()));
        }

        let request = AssumeRoleRequest {
            account_id: account_id.to_string(),
            role_name: role_name.to_string(),
            role_arn: role_arn(account_id, role_name),
            session_name: self.config.session_name.clone(),
            duration: self.config.duration,
        };
        debug!(
            account_id = %account_id,
            role_arn = %request.role_arn,
            provider = self.provider.provider_name(),
            "Assuming role"
        );

        let credentials = with_retry("assume_role", &self.config.retry, || self.provider.assume(&request))
            .await
            .map_err(|e| {
                warn!(account_id = %account_id, error = %e, "Role assumption failed");
                e
            })?;

        if credentials.is_expired_at(Utc::now()) {
            return Err(CredentialError::Expired { account_id: account_id.to_string() });
        }
        Ok(credentials)
    }

    /// The orchestrator's own credentials.
    pub async fn source_identity(&self) -> Result<Credentials, CredentialError> {
        with_retry("source_credentials", &self.config.retry, || self.provider.source_credentials()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        requests: Mutex<Vec<AssumeRoleRequest>>,
        throttle_first: usize,
        calls: AtomicUsize,
        expired: bool,
    }

    #[async_trait]
    impl CredentialProvider for Recording {
        async fn assume(&self, request: &AssumeRoleRequest) -> Result<Credentials, CredentialError> {
            self.requests.lock().unwrap().push(request.clone());
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.throttle_first {
                return Err(CredentialError::Throttled("Rate exceeded".into()));
            }
            if request.account_id == "222" {
                return Err(CredentialError::AccessDenied {
                    role_arn: request.role_arn.clone(),
                    reason: "trust policy".into(),
                });
            }
            let expires = if self.expired {
                Utc::now() - chrono::Duration::seconds(5)
            } else {
                Utc::now() + chrono::Duration::from_std(request.duration).unwrap()
            };
            Ok(Credentials::temporary("ASIA", "secret", "token", expires))
        }

        async fn source_credentials(&self) -> Result<Credentials, CredentialError> {
            Ok(Credentials::long_lived("AKIA", "secret"))
        }
    }

    fn broker(provider: Arc<Recording>, retries: u32) -> CredentialBroker {
        let config = BrokerConfig { retry: RetryConfig::with_max_retries(retries), ..Default::default() };
        CredentialBroker::new(provider, config)
    }

    #[tokio::test]
    async fn test_request_shape() {
        let provider = Arc::new(Recording::default());
        let creds = broker(provider.clone(), 0).assume("111", None).await.unwrap();
        assert_eq!(creds.session_token(), Some("token"));

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[0].role_arn, "arn:aws:iam::111:role/OrganizationAccountAccessRole");
        assert_eq!(requests[0].session_name, "CloudSweepOrgScan");
        assert_eq!(requests[0].duration, Duration::from_secs(3600));
    }

    #[test]
    fn test_config_overrides() {
        let scan = ScanConfig {
            role_name: Some("AuditRole".into()),
            credential_duration_secs: Some(900),
            max_credential_retries: Some(2),
            ..Default::default()
        };
        let config = BrokerConfig::from_config(Some(&scan));
        assert_eq!(config.role_name, "AuditRole");
        assert_eq!(config.session_name, DEFAULT_SESSION_NAME);
        assert_eq!(config.duration, Duration::from_secs(900));
        assert_eq!(config.retry.max_retries, 2);
    }

    #[tokio::test]
    async fn test_role_override() {
        let provider = Arc::new(Recording::default());
        broker(provider.clone(), 0).assume("111", Some("AuditRole")).await.unwrap();
        assert_eq!(provider.requests.lock().unwrap()[0].role_arn, "arn:aws:iam::111:role/AuditRole");
    }

    #[tokio::test]
    async fn test_denied_account() {
        let provider = Arc::new(Recording::default());
        let err = broker(provider, 0).assume("222", None).await.unwrap_err();
        assert!(matches!(err, CredentialError::AccessDenied { .. }));
    }

    #[tokio::test]
    async fn test_empty_inputs_rejected_before_provider() {
        let provider = Arc::new(Recording::default());
        let b = broker(provider.clone(), 0);
        assert!(matches!(b.assume("", None).await, Err(CredentialError::InvalidRequest(_))));
        assert!(matches!(b.assume("111", Some(" ")).await, Err(CredentialError::InvalidRequest(_))));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_credentials_rejected() {
        let provider = Arc::new(Recording { expired: true, ..Default::default() });
        let err = broker(provider, 0).assume("111", None).await.unwrap_err();
        assert_eq!(err, CredentialError::Expired { account_id: "111".into() });
    }

    #[tokio::test]
    async fn test_single_attempt_by_default() {
        let provider = Arc::new(Recording { throttle_first: 1, ..Default::default() });
        let err = broker(provider.clone(), 0).assume("111", None).await.unwrap_err();
        assert!(matches!(err, CredentialError::Throttled(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_throttling_retried_when_enabled() {
        let provider = Arc::new(Recording { throttle_first: 1, ..Default::default() });
        broker(provider.clone(), 2).assume("111", None).await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }
}
