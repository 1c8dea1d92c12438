use anyhow::{Context, Result};
use clap::Parser;
use resume_optimizer::cli::{handle_command, Cli};
use resume_optimizer::AppConfig;
use std::fs::OpenOptions;
use tracing::info;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "/tmp/resume-optimizer.log";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging first; stdout stays free for results
    let log_path =
        std::env::var("RESUME_OPTIMIZER_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true) // Clear file on startup
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path))?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_writer(file)
                .with_current_span(false)
                .with_span_list(false),
        )
        .with(
            EnvFilter::from_default_env()
                .add_directive("resume_optimizer=debug".parse().context("Invalid log directive")?),
        )
        .init();

    let config = AppConfig::load()?;
    config.ensure_directories().await?;

    info!("Backend URL: {}", config.api_url);
    info!("Output: {}", config.output_path.display());
    info!("Session file: {}", config.auth.session_file.display());

    handle_command(cli, config).await
}
