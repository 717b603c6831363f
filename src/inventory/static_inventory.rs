use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use super::directory::OrgDirectory;
use crate::auth::{AssumeRoleRequest, CredentialProvider};
use crate::config::InventoryConfig;
use crate::errors::{CloudSweepError, CredentialError};
use crate::models::{Account, Credentials, OrgTree, OrganizationalUnit};

/// Organization tree and token service backed by the `inventory` config section.
///
/// Role assumption succeeds for every listed account except the denied ones, and
/// issues opaque temporary keys.
pub struct StaticInventory {
    config: InventoryConfig,
    known: HashSet<String>,
    denied: HashSet<String>,
}

impl StaticInventory {
    pub fn new(config: InventoryConfig) -> Self {
        let known = config
            .organizational_units
            .iter()
            .flat_map(|u| u.accounts.iter().map(|a| a.id.clone()))
            .chain(std::iter::once(config.management_account_id.clone()))
            .collect();
        let denied = config.denied_accounts.iter().cloned().collect();
        Self { config, known, denied }
    }
}

fn opaque_key(prefix: &str) -> String {
    format!("{}{}", prefix, Uuid::new_v4().simple()).to_uppercase()
}

#[async_trait]
impl OrgDirectory for StaticInventory {
    async fn fetch_tree(&self) -> Result<OrgTree, CloudSweepError> {
        let units = self
            .config
            .organizational_units
            .iter()
            .map(|u| OrganizationalUnit {
                name: u.name.clone(),
                id: u.id.clone(),
                accounts: u
                    .accounts
                    .iter()
                    .map(|a| Account { id: a.id.clone(), name: a.name.clone(), status: a.status })
                    .collect(),
            })
            .collect();
        let tree = OrgTree::new(units).active_only();
        debug!(units = tree.units.len(), accounts = tree.account_count(), "Loaded static org tree");
        Ok(tree)
    }

    async fn management_account_id(&self) -> Result<String, CloudSweepError> {
        if self.config.management_account_id.trim().is_empty() {
            return Err(CloudSweepError::Directory("inventory.management_account_id is not set".into()));
        }
        Ok(self.config.management_account_id.clone())
    }

    async fn regions(&self) -> Result<Vec<String>, CloudSweepError> {
        if self.config.regions.is_empty() {
            return Err(CloudSweepError::Directory("inventory lists no regions".into()));
        }
        Ok(self.config.regions.clone())
    }
}

#[async_trait]
impl CredentialProvider for StaticInventory {
    async fn assume(&self, request: &AssumeRoleRequest) -> Result<Credentials, CredentialError> {
        if self.denied.contains(&request.account_id) {
            return Err(CredentialError::AccessDenied {
                role_arn: request.role_arn.clone(),
                reason: "not authorized to perform sts:AssumeRole".into(),
            });
        }
        if !self.known.contains(&request.account_id) {
            return Err(CredentialError::RoleNotFound { role_arn: request.role_arn.clone() });
        }

        let lifetime = chrono::Duration::from_std(request.duration)
            .map_err(|e| CredentialError::InvalidRequest(format!("duration out of range: {}", e)))?;
        Ok(Credentials::temporary(
            opaque_key("ASIA"),
            Uuid::new_v4().to_string(),
            Uuid::new_v4().to_string(),
            Utc::now() + lifetime,
        ))
    }

    async fn source_credentials(&self) -> Result<Credentials, CredentialError> {
        Ok(Credentials::long_lived(opaque_key("AKIA"), Uuid::new_v4().to_string()))
    }

    fn provider_name(&self) -> &str {
        "static-inventory"
    }
}
