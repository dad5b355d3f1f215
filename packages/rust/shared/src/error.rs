//! Error types for TrendBot.
//!
//! Library crates use [`TrendbotError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all TrendBot operations.
#[derive(Debug, thiserror::Error)]
pub enum TrendbotError {
    /// A required credential or identifier is absent, or the config file is invalid.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP failure while fetching, analyzing, or publishing.
    #[error("network error: {0}")]
    Network(String),

    /// Feed or response structure was not what we expected.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A stage was invoked before the data it depends on was produced.
    #[error("missing prerequisite: {message}")]
    MissingPrerequisite { message: String },

    /// The external store rejected a write (auth, schema mismatch, ...).
    #[error("publish error: {0}")]
    Publish(String),

    /// Managed database table error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TrendbotError>;

impl TrendbotError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a missing-prerequisite error from any displayable message.
    pub fn missing(msg: impl Into<String>) -> Self {
        Self::MissingPrerequisite {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
