use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use super::classification::{Classify, ErrorClassification};
use tracing::warn;

impl ErrorClassification {
    /// Calculate the retry delay for this error classification based on the
    /// current attempt number (0-indexed).
    ///
    /// - ThrottlingError: 2^attempt seconds + random jitter (0-1s), capped at 20s
    /// - Default: exponential backoff 2^attempt + random jitter (0-1s), capped at 30s
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let cap = match self.error_type {
            "ThrottlingError" => 20.0,
            _ => 30.0,
        };
        let base: f64 = 2.0_f64.powi(attempt as i32);
        let jitter: f64 = rand::random::<f64>();
        Duration::from_secs_f64((base + jitter).min(cap))
    }
}

/// Retry configuration for token-service calls.
///
/// The default performs no retries: each provider call is attempted exactly once.
#[derive(Debug, Clone, Default)]
pub struct RetryConfig {
    pub max_retries: u32,
}

impl RetryConfig {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self { max_retries }
    }
}

/// Execute an async operation with retry logic.
///
/// Retries only if the error is classified as retryable and we haven't
/// exceeded max_retries.
pub async fn with_retry<F, Fut, T, E>(
    operation_name: &str,
    config: &RetryConfig,
    mut factory: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + Display,
{
    let max_attempts = config.max_retries + 1;
    let mut attempt = 0;

    loop {
        let err = match factory().await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        let classification = err.classify();
        if !classification.retryable {
            warn!(
                operation = operation_name,
                error_type = classification.error_type,
                "Non-retryable error, failing immediately"
            );
            return Err(err);
        }
        if attempt + 1 >= max_attempts {
            if max_attempts > 1 {
                warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    max = max_attempts,
                    "Max retries exhausted"
                );
            }
            return Err(err);
        }

        let delay = classification.retry_delay(attempt);
        warn!(
            operation = operation_name,
            attempt = attempt + 1,
            max = max_attempts,
            error_type = classification.error_type,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Retrying after error"
        );

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CredentialError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_retry_delay_throttling_capped() {
        let class = ErrorClassification { error_type: "ThrottlingError", retryable: true };
        let d0 = class.retry_delay(0);
        assert!(d0.as_secs_f64() >= 1.0 && d0.as_secs_f64() < 2.0);
        assert_eq!(class.retry_delay(10), Duration::from_secs(20));
    }

    #[test]
    fn test_retry_delay_default_exponential() {
        let class = ErrorClassification { error_type: "NetworkError", retryable: true };
        let d1 = class.retry_delay(1);
        assert!(d1.as_secs_f64() >= 2.0 && d1.as_secs_f64() < 3.0);
        assert_eq!(class.retry_delay(12), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_with_retry_succeeds_first_try() {
        let config = RetryConfig::default();
        let result = with_retry("test", &config, || async {
            Ok::<_, CredentialError>(42)
        }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_default_config_attempts_once() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let result = with_retry("assume-role", &RetryConfig::default(), || {
            let attempts = attempts_clone.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(CredentialError::Throttled("Rate exceeded".into()))
            }
        }).await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_retry_non_retryable_fails_immediately() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let config = RetryConfig::with_max_retries(3);

        let result = with_retry("assume-role", &config, || {
            let attempts = attempts_clone.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(CredentialError::RoleNotFound { role_arn: "arn".into() })
            }
        }).await;

        assert!(matches!(result, Err(CredentialError::RoleNotFound { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_retry_recovers_from_throttling() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let config = RetryConfig::with_max_retries(1);

        let result = with_retry("assume-role", &config, || {
            let attempts = attempts_clone.clone();
            async move {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(CredentialError::Throttled("Rate exceeded".into()))
                } else {
                    Ok("creds")
                }
            }
        }).await;

        assert_eq!(result.unwrap(), "creds");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
