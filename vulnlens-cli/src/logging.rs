//! Logging initialization for the vulnlens CLI.
//!
//! stdout is reserved for command output (scan reports, config dumps) so that
//! `--output json` can be piped straight into other tools. Every log line
//! therefore goes to stderr, in the format chosen by `[general].log_format`.

use anyhow::{Context, Result, bail};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use vulnlens_core::config::GeneralConfig;

/// Install the global subscriber writing to stderr.
///
/// `RUST_LOG` wins over `[general].log_level` (and thus over `--log-level`).
/// `log_format` is either `"json"` (one object per line) or `"pretty"`.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .with_context(|| format!("invalid log level '{}'", config.log_level))?;

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.log_format.as_str() {
        "json" => registry.with(stderr_layer.json()).try_init(),
        "pretty" => registry.with(stderr_layer.pretty()).try_init(),
        other => bail!("unknown log format '{other}', expected 'json' or 'pretty'"),
    };
    installed.context("failed to initialize tracing subscriber")
}
