use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::models::{Credentials, ScanResult};
use crate::pipeline::fanout::{self, FanOutOptions, FanOutReport};

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-invocation knobs handed to a scanner by the orchestrator.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Upper bound on a single provider call.
    pub call_timeout: Duration,
    pub max_region_workers: usize,
    pub region_timeout: Option<Duration>,
    pub cancel: CancellationToken,
    pub params: HashMap<String, Value>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            max_region_workers: fanout::DEFAULT_MAX_WORKERS,
            region_timeout: None,
            cancel: CancellationToken::new(),
            params: HashMap::new(),
        }
    }
}

impl ScanOptions {
    pub fn fan_out_options(&self) -> FanOutOptions {
        FanOutOptions {
            max_workers: self.max_region_workers,
            region_timeout: self.region_timeout,
            cancel: self.cancel.clone(),
        }
    }

    /// Run `f` once per region under these options.
    pub async fn fan_out<F, Fut, T, E>(&self, regions: &[String], f: F) -> FanOutReport<T>
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        fanout::fan_out(regions, &self.fan_out_options(), f).await
    }

    /// Bound a provider call by `call_timeout`.
    pub async fn timed<Fut, T>(&self, call: Fut) -> Result<T, String>
    where
        Fut: Future<Output = Result<T, String>>,
    {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(format!("provider call timed out after {}s", self.call_timeout.as_secs())),
        }
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }
}

/// A pluggable check over one account.
///
/// `scan` never fails past its boundary: provider errors are recorded in
/// [`ScanResult::errors`] and whatever findings were gathered are kept. The same
/// instance may be called concurrently for different accounts, so implementations
/// hold no per-call state.
#[async_trait]
pub trait Scanner: Send + Sync {
    fn id(&self) -> &str;

    fn description(&self) -> &str;

    fn version(&self) -> &str {
        "0.1.0"
    }

    async fn scan(
        &self,
        regions: &[String],
        credentials: &Credentials,
        account_id: &str,
        options: &ScanOptions,
    ) -> ScanResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_timed_call_times_out() {
        let options = ScanOptions { call_timeout: Duration::from_millis(10), ..Default::default() };
        let result: Result<(), String> = options
            .timed(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(result.unwrap_err().contains("timed out"));
    }

    #[tokio::test]
    async fn test_timed_call_passes_through() {
        let options = ScanOptions::default();
        assert_eq!(options.timed(async { Ok::<_, String>(7) }).await, Ok(7));
    }

    #[test]
    fn test_fan_out_options_share_cancel_token() {
        let options = ScanOptions { max_region_workers: 3, ..Default::default() };
        let fan = options.fan_out_options();
        assert_eq!(fan.max_workers, 3);
        options.cancel.cancel();
        assert!(fan.cancel.is_cancelled());
    }
}
