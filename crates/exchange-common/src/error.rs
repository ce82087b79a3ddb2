//! Error types for the field exchange.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using ExchangeError.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// Primary error type for codec, mapping and pipeline operations.
#[derive(Debug, Error)]
pub enum ExchangeError {
    // === Input Errors ===
    #[error("{source_name}{}: {message}", .line.map(|l| format!(":{}", l)).unwrap_or_default())]
    Format {
        source_name: String,
        line: Option<usize>,
        message: String,
    },

    #[error("Structural mismatch: {0}")]
    StructuralMismatch(String),

    #[error("Grid geometry mismatch: {0}")]
    GeometryMismatch(String),

    #[error("Configuration inconsistency: {0}")]
    ConfigurationInconsistency(String),

    #[error("Nothing to exchange: {0}")]
    EmptyInput(String),

    #[error("{0} triangle values are missing and the missing-value policy is 'reject'")]
    MissingValues(usize),

    // === Setup Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExchangeError {
    /// Create a Format error pointing at a line of a named source.
    pub fn format(source_name: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Format {
            source_name: source_name.into(),
            line: Some(line),
            message: message.into(),
        }
    }

    /// Create a Format error that concerns the source as a whole.
    pub fn format_at_end(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Format {
            source_name: source_name.into(),
            line: None,
            message: message.into(),
        }
    }

    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short machine-friendly name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ExchangeError::Format { .. } => "FormatError",
            ExchangeError::StructuralMismatch(_) => "StructuralMismatchError",
            ExchangeError::GeometryMismatch(_) => "GeometryMismatchError",
            ExchangeError::ConfigurationInconsistency(_) => "ConfigurationInconsistencyError",
            ExchangeError::EmptyInput(_) => "EmptyInputError",
            ExchangeError::MissingValues(_) => "MissingValuesError",
            ExchangeError::InvalidConfig(_) => "InvalidConfigError",
            ExchangeError::Io { .. } => "IoError",
        }
    }
}

impl From<serde_yaml::Error> for ExchangeError {
    fn from(err: serde_yaml::Error) -> Self {
        ExchangeError::InvalidConfig(format!("YAML error: {}", err))
    }
}
