//! Vulnlens CLI -- analyze dependency manifests for known security advisories
//!
//! Loads `vulnlens.toml` (falling back to defaults), initializes logging and
//! dispatches to the selected subcommand. Errors are mapped to exit codes by
//! [`error::CliError::exit_code`].

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use anyhow::Result;
use clap::Parser;

use vulnlens_core::config::VulnlensConfig;

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = VulnlensConfig::load_or_default(&cli.config).await;
    if let Some(level) = &cli.log_level {
        config.general.log_level = level.clone();
    }
    logging::init_tracing(&config.general)?;
    vulnlens_core::metrics::describe_all();

    tracing::debug!(config = %cli.config.display(), "vulnlens-cli starting");

    let writer = OutputWriter::new(cli.output);
    let result = match cli.command {
        Commands::Scan(args) => commands::scan::execute(args, &config, &writer).await,
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }

    Ok(())
}
