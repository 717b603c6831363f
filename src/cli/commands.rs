use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cloudsweep", version, about = "Multi-account, multi-region cloud audit orchestrator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// YAML configuration file
    #[arg(short, long, global = true, default_value = "cloudsweep.yaml")]
    pub config: PathBuf,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    Serve(ServeArgs),
    /// Scan the caller's own account
    Scan(ScanArgs),
    /// Scan every account in the organization
    OrgScan(OrgScanArgs),
    /// List registered scanners
    Scanners,
    /// Validate the configuration file
    Validate,
}

#[derive(Args, Clone)]
pub struct ServeArgs {
    /// Listen port (overrides server.port)
    #[arg(long)]
    pub port: Option<u16>,

    /// Listen address (overrides server.host)
    #[arg(long)]
    pub host: Option<String>,

    /// API key required on job routes (or CLOUDSWEEP_API_KEY)
    #[arg(long, env = "CLOUDSWEEP_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

#[derive(Args, Clone)]
pub struct ScanArgs {
    /// Scanners to run, comma-separated; all when omitted
    #[arg(short, long, value_delimiter = ',')]
    pub scanners: Vec<String>,

    /// Regions to scan, comma-separated (overrides config)
    #[arg(short, long, value_delimiter = ',')]
    pub regions: Vec<String>,

    /// Write the JSON report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Clone)]
pub struct OrgScanArgs {
    /// Run a single scanner; all when omitted
    #[arg(short, long)]
    pub scanner: Option<String>,

    /// Role to assume in member accounts (overrides scan.role_name)
    #[arg(long)]
    pub role: Option<String>,

    /// Regions to scan, comma-separated (overrides config)
    #[arg(short, long, value_delimiter = ',')]
    pub regions: Vec<String>,

    /// Write the JSON report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
