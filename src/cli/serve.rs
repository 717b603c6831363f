use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::api::security::{ClientLimiter, SecuritySettings};
use crate::api::{self, AppState};
use crate::cli::commands::ServeArgs;
use crate::config::resolve_credential;
use crate::errors::CloudSweepError;
use crate::jobs::JobStore;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(300);

/// The flag (or `CLOUDSWEEP_API_KEY`) wins over the file. A `$VAR` reference
/// that cannot be resolved stops startup.
fn effective_api_key(flag: Option<String>, file: Option<String>) -> Result<Option<String>, CloudSweepError> {
    flag.or(file).map(|k| resolve_credential(&k)).transpose()
}

pub async fn handle_serve(config_path: &Path, args: ServeArgs) -> Result<(), CloudSweepError> {
    let (config, service) = super::load_service(config_path).await?;
    let server = config.server.clone().unwrap_or_default();

    let api_key = effective_api_key(args.api_key, server.api_key.clone())?;
    let host = args.host.or(server.host.clone()).unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = args.port.or(server.port).unwrap_or(DEFAULT_PORT);
    let security = SecuritySettings::from_config(Some(&server));

    let reap_interval = config
        .jobs
        .as_ref()
        .and_then(|j| j.reap_interval_secs)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_REAP_INTERVAL);

    info!(
        host = %host,
        port,
        scanners = service.scanners().len(),
        auth = api_key.is_some(),
        rate_limit = security.requests_per_minute,
        cors_origins = ?security.cors_origins,
        "Starting API server"
    );
    let state = AppState::with_security(service, security).with_api_key(api_key);
    tokio::spawn(reap(state.service.store().clone(), state.rate_limiter.clone(), reap_interval));
    let app = api::build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CloudSweepError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}

/// Drop expired jobs and forget idle rate-limit clients.
async fn reap(store: JobStore, limiter: Option<Arc<ClientLimiter>>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let removed = store.evict_expired().await;
        if let Some(limiter) = &limiter {
            limiter.retain_recent();
        }
        debug!(removed, "Reaper pass");
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}
