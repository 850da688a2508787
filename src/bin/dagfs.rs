//! dagfs CLI Binary
//!
//! Command-line access to a sled-backed dagfs filesystem.

use anyhow::Context;
use clap::Parser;
use dagfs::cli::{map_error, Cli, RunContext};
use dagfs::config::ConfigLoader;
use dagfs::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{:#}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let logging_config = build_logging_config(&cli);
    init_logging(&logging_config).context("Failed to initialize logging")?;

    info!(command = ?cli.command, "dagfs starting");

    let context = RunContext::new(cli.workspace.clone(), cli.config.clone(), cli.store.clone())
        .map_err(|e| anyhow::anyhow!(map_error(&e)))
        .context("Failed to open store")?;

    match context.execute(&cli.command) {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Command failed");
            Err(anyhow::anyhow!(map_error(&e)))
        }
    }
}

/// Build logging configuration from CLI args and the config files.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = match cli.config {
        Some(ref config_path) => ConfigLoader::load_from_file(config_path)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default(),
        None => ConfigLoader::load(&cli.workspace)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default(),
    };

    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    config
}
