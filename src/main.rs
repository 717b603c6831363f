use clap::Parser;
use tracing_subscriber::EnvFilter;

use cloudsweep::cli::{self, Cli, Commands};
use cloudsweep::errors::CloudSweepError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.with_ansi(!cli.no_color).init();
    }

    let config = cli.config.as_path();
    let result = match cli.command {
        Commands::Serve(args) => cli::serve::handle_serve(config, args).await,
        Commands::Scan(args) => cli::scan::handle_scan(config, args).await,
        Commands::OrgScan(args) => cli::scan::handle_org_scan(config, args).await,
        Commands::Scanners => cli::handle_scanners(config).await,
        Commands::Validate => cli::handle_validate(config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(exit_code(&e));
    }
}

fn exit_code(error: &CloudSweepError) -> i32 {
    match error {
        CloudSweepError::Config(_) | CloudSweepError::Yaml(_) => 2,
        CloudSweepError::Directory(_) => 3,
        CloudSweepError::Credential(_) => 4,
        _ => 1,
    }
}
