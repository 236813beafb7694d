mod config;
mod telemetry;

use anyhow::{Context, Result};
use clap::Parser;
use config::Config;
use telemetry::{init_telemetry, log_shutdown_info, log_startup_info};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "acr-server")]
#[command(about = "Agent Coordination Runtime host process")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CONFIG_FILE")]
    config: Option<String>,

    /// Log level override
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Maintenance tick cadence override, in milliseconds
    #[arg(long, env = "TICK_MS")]
    tick_ms: Option<u64>,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(config_file) => {
            info!("loading configuration from file: {config_file}");
            Config::from_file(config_file)?
        }
        None => {
            info!("loading configuration from environment");
            Config::from_env()?
        }
    };

    if let Some(ref log_level) = cli.log_level {
        config.logging.level = log_level.clone();
    }
    if let Some(tick_ms) = cli.tick_ms {
        config.runtime.tick_ms = tick_ms;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli).context("failed to load configuration")?;

    init_telemetry(&config.logging).context("failed to initialize telemetry")?;

    if let Err(e) = config.validate() {
        error!(error = %e, "configuration validation failed");
        std::process::exit(1);
    }

    log_startup_info(&config);

    let runtime = acr_server::build_runtime();
    let tick = acr_server::tick_duration(&config);
    let shutdown = acr_server::spawn_shutdown_signal();

    info!(tick_ms = config.runtime.tick_ms, "agent coordination runtime ready");
    acr_server::serve(runtime, tick, shutdown).await;

    log_shutdown_info();
    Ok(())
}
