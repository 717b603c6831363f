pub mod broker;
pub mod provider;

pub use broker::{role_arn, BrokerConfig, CredentialBroker};
pub use provider::{AssumeRoleRequest, CredentialProvider};
