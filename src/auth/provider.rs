use std::time::Duration;

use async_trait::async_trait;

use crate::errors::CredentialError;
use crate::models::Credentials;

/// One assume-role call against the token service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumeRoleRequest {
    pub account_id: String,
    pub role_name: String,
    pub role_arn: String,
    pub session_name: String,
    pub duration: Duration,
}

/// The external token service.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn assume(&self, request: &AssumeRoleRequest) -> Result<Credentials, CredentialError>;

    /// The orchestrator's own identity, used for the management account and
    /// single-account scans.
    async fn source_credentials(&self) -> Result<Credentials, CredentialError>;

    fn provider_name(&self) -> &str {
        "unnamed"
    }
}
