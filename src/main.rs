use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod devices;
mod domain;
mod services;

use crate::cli::{Cli, Commands};
use crate::commands::{CommandError, Context};
use crate::devices::DeviceDbError;
use crate::services::config::{default_config_path, load_config, ConfigError};
use crate::services::output::print_error;
use crate::services::pipeline::Pipeline;

const LOG_ENV: &str = "HORIZON_LOG";

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "horizon=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn error_code(err: &anyhow::Error) -> &'static str {
    if let Some(e) = err.downcast_ref::<CommandError>() {
        e.code()
    } else if err.downcast_ref::<ConfigError>().is_some() {
        "CONFIG_ERROR"
    } else if err.downcast_ref::<DeviceDbError>().is_some() {
        "DEVICES_ERROR"
    } else {
        "ERROR"
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let config_path = cli
        .config
        .clone()
        .or_else(|| default_config_path().filter(|p| p.exists()));
    tracing::debug!(config = ?config_path, "configuration loaded");

    let ctx = Context {
        json: cli.json,
        config_path,
        pipeline: Pipeline::from_config(config)?,
    };

    match &cli.command {
        Commands::Measure {
            image,
            manual,
            planetary_radius_m,
        } => commands::handle_measure(&ctx, image, manual, *planetary_radius_m).await,
        Commands::Resolve { image, manual } => commands::handle_resolve(&ctx, image, manual).await,
        Commands::Devices { command } => commands::handle_device_commands(&ctx, command),
        Commands::Focal {
            f35,
            sensor_diagonal,
        } => commands::handle_focal(&ctx, *f35, *sensor_diagonal),
        Commands::Doctor => commands::handle_doctor(&ctx).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            print_error(cli.json, error_code(&err), format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}
