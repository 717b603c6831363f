use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::commands::{OrgScanArgs, ScanArgs};
use crate::errors::CloudSweepError;
use crate::jobs::{JobResults, ScanScope};
use crate::utils::formatting::{format_duration, format_impact};

fn non_empty(regions: Vec<String>) -> Option<Vec<String>> {
    Some(regions).filter(|r| !r.is_empty())
}

/// Cancel the scan on Ctrl-C; accounts already scanned are discarded.
fn cancel_on_interrupt() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling scan");
            trigger.cancel();
        }
    });
    token
}

pub async fn handle_scan(config_path: &Path, args: ScanArgs) -> Result<(), CloudSweepError> {
    let (_, service) = super::load_service(config_path).await?;
    let started = Instant::now();
    let scope = ScanScope::Account { regions: non_empty(args.regions) };
    let results = service.run_now(&args.scanners, scope, cancel_on_interrupt()).await?;
    emit_report(&results, started, args.output.as_deref()).await
}

pub async fn handle_org_scan(config_path: &Path, args: OrgScanArgs) -> Result<(), CloudSweepError> {
    let (_, service) = super::load_service(config_path).await?;
    let started = Instant::now();
    let scanners: Vec<String> = args.scanner.into_iter().collect();
    let scope = ScanScope::Organization { role_name: args.role, regions: non_empty(args.regions) };
    let results = service.run_now(&scanners, scope, cancel_on_interrupt()).await?;
    emit_report(&results, started, args.output.as_deref()).await
}

#[derive(Serialize)]
struct Report<'a> {
    generated_at: String,
    #[serde(flatten)]
    totals: crate::pipeline::Totals,
    results: &'a JobResults,
}

async fn emit_report(
    results: &JobResults,
    started: Instant,
    output: Option<&Path>,
) -> Result<(), CloudSweepError> {
    let totals = results.totals();
    info!(
        findings = totals.findings_count,
        critical = totals.critical_count,
        impact = %format_impact(totals.monthly_impact),
        elapsed = %format_duration(started.elapsed().as_millis() as u64),
        "Scan finished"
    );

    let report = Report { generated_at: chrono::Utc::now().to_rfc3339(), totals, results };
    let body = serde_json::to_string_pretty(&report)?;
    match output {
        Some(path) => write_report(path.to_path_buf(), body).await,
        None => {
            println!("{}", body);
            Ok(())
        }
    }
}

async fn write_report(path: PathBuf, body: String) -> Result<(), CloudSweepError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, body).await?;
    info!(path = %path.display(), "Report written");
    Ok(())
}
