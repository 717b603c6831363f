use super::types::{CloudSweepError, CredentialError};

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub retryable: bool,
}

/// Errors that can tell the retry loop whether another attempt may succeed.
pub trait Classify {
    fn classify(&self) -> ErrorClassification;
}

impl Classify for CredentialError {
    /// Only throttling and transport failures are worth another attempt; a missing
    /// role or a trust-policy denial will fail the same way again.
    fn classify(&self) -> ErrorClassification {
        match self {
            CredentialError::Throttled(_) => ErrorClassification {
                error_type: "ThrottlingError",
                retryable: true,
            },
            CredentialError::Unreachable(_) => ErrorClassification {
                error_type: "NetworkError",
                retryable: true,
            },
            CredentialError::RoleNotFound { .. } => ErrorClassification {
                error_type: "RoleNotFoundError",
                retryable: false,
            },
            CredentialError::AccessDenied { .. } => ErrorClassification {
                error_type: "AccessDeniedError",
                retryable: false,
            },
            CredentialError::Expired { .. } => ErrorClassification {
                error_type: "ExpiredCredentialsError",
                retryable: false,
            },
            CredentialError::InvalidRequest(_) => ErrorClassification {
                error_type: "InvalidRequestError",
                retryable: false,
            },
        }
    }
}

impl Classify for CloudSweepError {
    /// Classify this error to determine its type and whether it can be retried.
    fn classify(&self) -> ErrorClassification {
        match self {
            CloudSweepError::Credential(e) => e.classify(),
            CloudSweepError::Timeout(_) => ErrorClassification {
                error_type: "TimeoutError",
                retryable: true,
            },
            CloudSweepError::Directory(_) => ErrorClassification {
                error_type: "DirectoryError",
                retryable: true,
            },
            CloudSweepError::Io(_) => ErrorClassification {
                error_type: "IoError",
                retryable: true,
            },

            CloudSweepError::Config(_) => ErrorClassification {
                error_type: "ConfigError",
                retryable: false,
            },
            CloudSweepError::Job(_) => ErrorClassification {
                error_type: "JobError",
                retryable: false,
            },
            CloudSweepError::UnknownScanner { .. } => ErrorClassification {
                error_type: "UnknownScannerError",
                retryable: false,
            },
            CloudSweepError::InvalidRegion(_) => ErrorClassification {
                error_type: "InvalidRegionError",
                retryable: false,
            },
            CloudSweepError::Authentication(_) => ErrorClassification {
                error_type: "AuthenticationError",
                retryable: false,
            },
            CloudSweepError::Forbidden(_) => ErrorClassification {
                error_type: "ForbiddenError",
                retryable: false,
            },
            CloudSweepError::RateLimited(_) => ErrorClassification {
                error_type: "RateLimitError",
                retryable: true,
            },
            CloudSweepError::Cancelled => ErrorClassification {
                error_type: "CancelledError",
                retryable: false,
            },
            CloudSweepError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                retryable: false,
            },
            CloudSweepError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                retryable: false,
            },
            CloudSweepError::Internal(_) => ErrorClassification {
                error_type: "InternalError",
                retryable: false,
            },
        }
    }
}
