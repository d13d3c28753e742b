//! cardio-xai - Main Entry Point
//!
//! Runs one pipeline stage per subcommand, or the interactive launcher.

use clap::Parser;
use cardio_xai::cli::{cmd_interactive, run_command, Cli};
use cardio_xai::config::PipelineConfig;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cardio_xai=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::default();

    match cli.command {
        Some(command) => run_command(command, &config)?,
        None => cmd_interactive(&config)?,
    }

    Ok(())
}
