//! CLI-specific error types and exit code mapping

use vulnlens_core::error::VulnlensError;
use vulnlens_engine::EngineError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The scan completed and flagged vulnerable dependencies.
    #[error("found {0} vulnerable dependencies")]
    Findings(usize),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (manifest read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from vulnlens-core.
    #[error("{0}")]
    Core(#[from] VulnlensError),

    /// Analysis engine error.
    #[error("analysis error: {0}")]
    Engine(#[from] EngineError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                              |
    /// |------|--------------------------------------|
    /// | 0    | Success                              |
    /// | 1    | General / command error              |
    /// | 2    | Configuration error                  |
    /// | 3    | Manifest could not be analyzed       |
    /// | 4    | Scan flagged vulnerable dependencies |
    /// | 10   | IO error                             |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(VulnlensError::Config(_)) => 2,
            Self::Engine(EngineError::Config { .. }) => 2,
            Self::Engine(EngineError::Manifest { .. } | EngineError::UnsupportedManifest(_)) => 3,
            Self::Findings(_) => 4,
            Self::Io(_) | Self::Core(VulnlensError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) | Self::Engine(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vulnlens_core::error::{ConfigError, ParseError};

    #[test]
    fn test_exit_code_config_error() {
        let err = CliError::Config("test error".to_owned());
        assert_eq!(err.exit_code(), 2, "config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_core_config_error() {
        let err: CliError = VulnlensError::Config(ConfigError::FileNotFound {
            path: "vulnlens.toml".to_owned(),
        })
        .into();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_engine_config_error() {
        let err: CliError = EngineError::Config {
            field: "batch_size".to_owned(),
            reason: "must be 1-100".to_owned(),
        }
        .into();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_manifest_errors() {
        let parse: CliError = EngineError::Manifest {
            uri: "file:///a/package.json".to_owned(),
            source: ParseError::Failed {
                line: 3,
                reason: "expected value".to_owned(),
            },
        }
        .into();
        assert_eq!(parse.exit_code(), 3);

        let unsupported: CliError =
            EngineError::UnsupportedManifest("file:///a/Cargo.toml".to_owned()).into();
        assert_eq!(unsupported.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_findings() {
        let err = CliError::Findings(2);
        assert_eq!(err.exit_code(), 4, "findings should return exit code 4");
        assert_eq!(err.to_string(), "found 2 vulnerable dependencies");
    }

    #[test]
    fn test_exit_code_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = CliError::Io(io_err);
        assert_eq!(err.exit_code(), 10, "io error should return exit code 10");
    }

    #[test]
    fn test_exit_code_command_error() {
        let err = CliError::Command("test error".to_owned());
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "test error");
    }

    #[test]
    fn test_error_display_engine() {
        let err: CliError = EngineError::Client("tls backend unavailable".to_owned()).into();
        let display_str = err.to_string();
        assert!(display_str.contains("analysis error"));
        assert!(display_str.contains("tls backend unavailable"));
        assert_eq!(err.exit_code(), 1);
    }
}
