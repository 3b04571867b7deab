pub mod advisor;
pub mod analysis;
pub mod charts;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod http;
pub mod ingest;
pub mod models;
pub mod session;

use crate::cli::Cli;
use crate::config::AppSettings;
use clap::Parser;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = AppSettings::load(cli.config.as_deref())?;
    cli::apply_overrides(&mut settings, &cli.command);

    init_tracing(&settings.log_dir, cli.command.default_log_level()).map_err(anyhow::Error::msg)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "riskpilot starting");
    for key in config::unknown_env_keys(std::env::vars()) {
        tracing::warn!(key = %key, "ignoring unknown setting override");
    }

    cli::execute(settings, cli.command).await
}

fn init_tracing(log_dir: &Path, default_level: &str) -> Result<(), String> {
    std::fs::create_dir_all(log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "riskpilot.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json().with_writer(non_blocking))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .map_err(|error| error.to_string())
}
