pub mod commands;
pub mod scan;
pub mod serve;

pub use commands::{Cli, Commands};

use std::path::Path;

use crate::config::{parse_config, CloudSweepConfig};
use crate::errors::CloudSweepError;
use crate::jobs::ScanService;

pub async fn load_service(config_path: &Path) -> Result<(CloudSweepConfig, ScanService), CloudSweepError> {
    let config = parse_config(config_path).await?;
    let service = ScanService::from_config(&config)?;
    Ok((config, service))
}

pub async fn handle_validate(config_path: &Path) -> Result<(), CloudSweepError> {
    let (config, service) = load_service(config_path).await?;
    let accounts: usize = config
        .inventory
        .as_ref()
        .map(|i| i.organizational_units.iter().map(|u| u.accounts.len()).sum())
        .unwrap_or(0);
    println!(
        "Configuration is valid: {} ({} scanners, {} member accounts)",
        config_path.display(),
        service.scanners().len(),
        accounts
    );
    Ok(())
}

pub async fn handle_scanners(config_path: &Path) -> Result<(), CloudSweepError> {
    let (_, service) = load_service(config_path).await?;
    println!("{}", serde_json::to_string_pretty(&service.scanners())?);
    Ok(())
}
