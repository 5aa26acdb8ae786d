//! IPAM Deployer - Entry Point
//!
//! Deploys the IPAM infrastructure and engine from a configuration document.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use secrecy::SecretString;
use tracing::{error, info};

use ipam_deployer::app::options::RunOptions;
use ipam_deployer::app::run::run;
use ipam_deployer::app::services::AzureServices;
use ipam_deployer::config::{resolve, DeployConfig, EffectiveConfig, Overrides};
use ipam_deployer::console;
use ipam_deployer::errors::DeployError;
use ipam_deployer::logs::{init_logging, LogFiles, LogLevel, LogOptions};
use ipam_deployer::utils::long_version;

/// Deploy the IPAM infrastructure, engine secret and engine archive
#[derive(Parser, Debug)]
#[command(name = "ipam-deploy")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the deployment configuration document
    #[arg(short, long, default_value = "deploy.json")]
    config: PathBuf,

    /// Pre-downloaded engine archive (native packaging only)
    #[arg(long)]
    zip_file: Option<PathBuf>,

    /// Deploy without the UI
    #[arg(long)]
    disable_ui: bool,

    /// Publish the engine as a ZIP archive instead of a container
    #[arg(long)]
    native: bool,

    /// Azure region, overrides the document
    #[arg(long)]
    location: Option<String>,

    /// Engine app secret, overrides the document
    #[arg(long, env = "IPAM_ENGINE_SECRET", hide_env_values = true)]
    engine_secret: Option<String>,

    /// Subscription to deploy into, overrides the document and the CLI context
    #[arg(long)]
    subscription_id: Option<String>,

    /// Directory for the run log and error log
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: LogLevel,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_options = LogOptions {
        log_level: cli.log_level.clone(),
        log_dir: cli.log_dir.clone(),
        ..Default::default()
    };
    let log_files = match init_logging(log_options) {
        Ok(files) => Some(files),
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };
    info!("ipam-deploy {}", long_version());

    let config = match load_config(cli).await {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            report_fatal(&e, log_files.as_ref());
            return ExitCode::from(1);
        }
    };

    match deploy(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Deployment aborted: {}", e);
            report_fatal(&e, log_files.as_ref());
            ExitCode::from(1)
        }
    }
}

async fn load_config(cli: Cli) -> Result<EffectiveConfig, DeployError> {
    let document = DeployConfig::load(&cli.config).await?;
    let overrides = Overrides {
        location: cli.location,
        disable_ui: cli.disable_ui,
        native: cli.native,
        engine_secret: cli.engine_secret.map(SecretString::from),
        subscription_id: cli.subscription_id,
        archive_path: cli.zip_file,
    };
    resolve(document, &cli.config, overrides)
}

async fn deploy(config: &EffectiveConfig) -> Result<(), DeployError> {
    let azure = AzureServices::connect(config).await?;
    let summary = run(config, &azure.services(), &RunOptions::default()).await?;

    println!();
    console::done("IPAM deployment complete");
    if let Some(host) = summary.host_name() {
        println!("    URL: https://{}", host);
    }
    Ok(())
}

fn report_fatal(e: &DeployError, log_files: Option<&LogFiles>) {
    console::fatal(
        &e.to_string(),
        log_files.map(LogFiles::run_log),
        log_files.map(LogFiles::error_log),
    );
}
