//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Vulnlens -- security advisories for dependency manifests.
///
/// Use `vulnlens <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "vulnlens", version, about, long_about = None)]
pub struct Cli {
    /// Path to the vulnlens.toml configuration file.
    #[arg(short, long, default_value = "vulnlens.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a dependency manifest once and report vulnerable dependencies.
    Scan(ScanArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- scan ----

/// Run a single analysis cycle on a manifest file.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Manifest to analyze (package.json, requirements.txt, go.mod).
    pub manifest: PathBuf,

    /// Override the advisory API server URL.
    #[arg(long)]
    pub server_url: Option<String>,

    /// Override the number of dependencies per request.
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Exit with code 4 when any dependency is flagged.
    #[arg(long)]
    pub fail_on_findings: bool,
}

// ---- config ----

/// Manage vulnlens configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, api, analysis, cache).
        #[arg(long)]
        section: Option<String>,
    },
}
