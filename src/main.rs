use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use object_canary::canary::Canary;
use object_canary::config::Config;
use object_canary::credentials::Credentials;
use object_canary::types::CanaryError;
use object_canary::utils::init_logger;

/// Sends an object to object storage and retrieves it, reporting the time taken.
#[derive(Debug, Parser)]
#[command(name = "object-canary", version, about)]
struct Cli {
    /// Local file to upload
    transfer_file: PathBuf,

    /// Bucket to store the object in; created if missing
    bucket_name: String,

    /// Object key to write under
    stored_name: String,

    /// Print the probe report as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(2);
        }
    };
    init_logger(&config.log.filter);

    match run(&cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("probe failed: {:#}", e);
            eprintln!("error: {:#}", e);
            exit_code(&e)
        }
    }
}

async fn run(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let credentials = Credentials::from_env().map_err(CanaryError::from)?;
    let canary = Canary::connect(&credentials, &config.storage).map_err(CanaryError::from)?;

    info!(file = %cli.transfer_file.display(), bucket = %cli.bucket_name, "starting probe");
    let report = canary
        .probe(&cli.transfer_file, &cli.bucket_name, &cli.stored_name)
        .await
        .map_err(CanaryError::from)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<CanaryError>() {
        Some(CanaryError::Configuration(_)) => ExitCode::from(2),
        _ => ExitCode::from(1),
    }
}
