//! Bounded concurrent execution of one closure per region.
//!
//! Every dispatched region yields exactly one [`RegionOutcome`]. A region that
//! errors, panics, times out or is cancelled is reported as a failure next to the
//! regions that succeeded; nothing escapes to the caller. Outcomes arrive in
//! completion order, which is fine because findings carry their own region.

use std::fmt::{self, Display};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::models::scan_result::RegionFailure;
use crate::utils::panic::panic_message;

pub const DEFAULT_MAX_WORKERS: usize = 10;

#[derive(Debug, Clone)]
pub struct FanOutOptions {
    /// Upper bound on regions in flight; the effective cap is
    /// `min(regions.len(), max_workers)`, and zero is treated as one.
    pub max_workers: usize,
    pub region_timeout: Option<Duration>,
    pub cancel: CancellationToken,
}

impl Default for FanOutOptions {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            region_timeout: None,
            cancel: CancellationToken::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionError {
    Failed(String),
    Panicked(String),
    TimedOut(Duration),
    Cancelled,
}

impl Display for RegionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionError::Failed(msg) => f.write_str(msg),
            RegionError::Panicked(msg) => write!(f, "region task panicked: {}", msg),
            RegionError::TimedOut(limit) => write!(f, "timed out after {}ms", limit.as_millis()),
            RegionError::Cancelled => f.write_str("cancelled"),
        }
    }
}

#[derive(Debug)]
pub struct RegionOutcome<T> {
    pub region: String,
    pub outcome: Result<T, RegionError>,
}

#[derive(Debug)]
pub struct FanOutReport<T> {
    pub outcomes: Vec<RegionOutcome<T>>,
}

impl<T> FanOutReport<T> {
    pub fn succeeded(&self) -> impl Iterator<Item = (&str, &T)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.outcome.as_ref().ok().map(|v| (o.region.as_str(), v)))
    }

    pub fn failures(&self) -> Vec<RegionFailure> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.outcome {
                Err(e) => Some(RegionFailure { region: o.region.clone(), error: e.to_string() }),
                Ok(_) => None,
            })
            .collect()
    }

    pub fn is_cancelled(&self) -> bool {
        self.outcomes.iter().any(|o| matches!(o.outcome, Err(RegionError::Cancelled)))
    }
}

impl<T> FanOutReport<Vec<T>> {
    /// Merged items from every region that succeeded, plus the failed regions.
    pub fn into_parts(self) -> (Vec<T>, Vec<RegionFailure>) {
        let mut items = Vec::new();
        let mut failures = Vec::new();
        for RegionOutcome { region, outcome } in self.outcomes {
            match outcome {
                Ok(found) => items.extend(found),
                Err(e) => failures.push(RegionFailure { region, error: e.to_string() }),
            }
        }
        (items, failures)
    }

    /// Union of items from the regions that succeeded.
    pub fn findings(self) -> Vec<T> {
        self.into_parts().0
    }
}

/// Run `f(region)` for every region with bounded concurrency.
pub async fn fan_out<F, Fut, T, E>(
    regions: &[String],
    options: &FanOutOptions,
    f: F,
) -> FanOutReport<T>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Display + Send + 'static,
{
    if regions.is_empty() {
        return FanOutReport { outcomes: Vec::new() };
    }

    let workers = options.max_workers.max(1).min(regions.len());
    let permits = Arc::new(Semaphore::new(workers));
    let f = Arc::new(f);
    debug!(regions = regions.len(), workers, "Fanning out across regions");

    let mut set = JoinSet::new();
    for region in regions {
        let region = region.clone();
        let permits = permits.clone();
        let f = f.clone();
        let cancel = options.cancel.clone();
        let timeout = options.region_timeout;

        set.spawn(async move {
            let outcome = run_region(&region, permits, f, cancel, timeout).await;
            if let Err(e) = &outcome {
                warn!(region = %region, error = %e, "Region failed");
            }
            RegionOutcome { region, outcome }
        });
    }

    let mut outcomes = Vec::with_capacity(regions.len());
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => error!(error = %e, "Region task aborted"),
        }
    }

    FanOutReport { outcomes }
}

async fn run_region<F, Fut, T, E>(
    region: &str,
    permits: Arc<Semaphore>,
    f: Arc<F>,
    cancel: CancellationToken,
    timeout: Option<Duration>,
) -> Result<T, RegionError>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Display,
{
    let _permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(RegionError::Cancelled),
        permit = permits.acquire_owned() => permit.map_err(|_| RegionError::Cancelled)?,
    };

    let region = region.to_string();
    let work = AssertUnwindSafe(async move { f(region).await }).catch_unwind();
    let guarded = async {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .map_err(|_| RegionError::TimedOut(limit)),
            None => Ok(work.await),
        }
    };

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(RegionError::Cancelled),
        result = guarded => result?,
    };

    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(RegionError::Failed(e.to_string())),
        Err(panic) => Err(RegionError::Panicked(panic_message(panic.as_ref()))),
    }
}
