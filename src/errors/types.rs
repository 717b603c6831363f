use thiserror::Error;

#[derive(Debug, Error)]
pub enum CloudSweepError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The organization tree, region list or caller identity could not be read.
    #[error("Directory error: {0}")]
    Directory(String),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("Unknown scanner: {name}. Valid: [{valid}]")]
    UnknownScanner { name: String, valid: String },

    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    /// A key was presented but it is not the configured one.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("scan cancelled")]
    Cancelled,

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CloudSweepError {
    /// The underlying message without the category prefix. Failed jobs record
    /// this so a directory error reads exactly as the directory reported it.
    pub fn detail(&self) -> String {
        match self {
            CloudSweepError::Directory(msg)
            | CloudSweepError::Timeout(msg)
            | CloudSweepError::Internal(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

/// Failure to obtain scoped credentials for one account.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("role {role_arn} does not exist")]
    RoleNotFound { role_arn: String },

    #[error("access denied assuming {role_arn}: {reason}")]
    AccessDenied { role_arn: String, reason: String },

    #[error("token service unreachable: {0}")]
    Unreachable(String),

    #[error("token service throttled the request: {0}")]
    Throttled(String),

    #[error("credentials for account {account_id} are already expired")]
    Expired { account_id: String },

    #[error("invalid assume-role request: {0}")]
    InvalidRequest(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job not completed. Status: {status}")]
    NotReady { id: String, status: String },

    #[error("Invalid status transition for job {id}: {from} -> {to}")]
    InvalidTransition { id: String, from: String, to: String },
}
