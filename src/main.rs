//! Restorer - buildpack layer cache restoration
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use restorer::cli::{Cli, Commands};
use restorer::config::ConfigManager;
use restorer::error::RestorerResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> RestorerResult<()> {
    let cli = Cli::parse();

    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };
    let config = config_manager.load().await?;

    // 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("restorer=warn"),
        1 => EnvFilter::new("restorer=info"),
        _ => EnvFilter::new("restorer=debug"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr);
    if config.general.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
    debug!("Loaded configuration from {}", config_manager.path().display());

    match cli.command {
        Commands::Restore(args) => restorer::cli::commands::restore(args, &config).await,
        Commands::Config(args) => {
            restorer::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
