use async_trait::async_trait;

use crate::errors::CloudSweepError;
use crate::models::OrgTree;

/// Source of the organization snapshot and the region list.
#[async_trait]
pub trait OrgDirectory: Send + Sync {
    /// Units in provider order with their active accounts.
    async fn fetch_tree(&self) -> Result<OrgTree, CloudSweepError>;

    async fn management_account_id(&self) -> Result<String, CloudSweepError>;

    /// Regions enabled for scanning.
    async fn regions(&self) -> Result<Vec<String>, CloudSweepError>;
}
