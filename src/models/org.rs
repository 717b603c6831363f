use serde::{Deserialize, Serialize};

/// Name of the unit that holds the organization's own account.
pub const MANAGEMENT_UNIT: &str = "Management";
pub const MANAGEMENT_UNIT_ID: &str = "management";
pub const MANAGEMENT_ACCOUNT_NAME: &str = "Management Account";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    #[default]
    Active,
    Suspended,
    PendingClosure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: AccountStatus,
}

impl Account {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), status: AccountStatus::Active }
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationalUnit {
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub accounts: Vec<Account>,
}

/// Read-only snapshot of the organization, in provider order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgTree {
    pub units: Vec<OrganizationalUnit>,
}

impl OrgTree {
    pub fn new(units: Vec<OrganizationalUnit>) -> Self {
        Self { units }
    }

    /// Drop accounts that are not `ACTIVE`; units are kept even when emptied.
    pub fn active_only(mut self) -> Self {
        for unit in &mut self.units {
            unit.accounts.retain(Account::is_active);
        }
        self
    }

    pub fn account_count(&self) -> usize {
        self.units.iter().map(|u| u.accounts.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_only_keeps_empty_units() {
        let mut suspended = Account::new("333", "legacy");
        suspended.status = AccountStatus::Suspended;
        let tree = OrgTree::new(vec![OrganizationalUnit {
            name: "Sandbox".into(),
            id: "ou-2".into(),
            accounts: vec![suspended],
        }])
        .active_only();
        assert_eq!(tree.units.len(), 1);
        assert_eq!(tree.account_count(), 0);
    }

    #[test]
    fn test_status_defaults_to_active() {
        let acct: Account = serde_yaml::from_str("id: '111'\nname: svc-a\n").unwrap();
        assert!(acct.is_active());
    }
}
