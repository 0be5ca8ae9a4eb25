//! Error taxonomy for the snapshot command.
//!
//! Capture and task failures keep their own error types and pass through
//! [`CommandError`] unmodified. The command itself only originates two kinds of
//! failure: an unknown run mode and an unresolved screenshot path.

use std::path::PathBuf;

use thiserror::Error;

use crate::snapshot::SnapshotError;
use crate::task::{ComparisonError, TaskError};

/// Result type for command operations
pub type CommandResult<T> = Result<T, CommandError>;

/// Errors raised by a `compareSnapshot` invocation
#[derive(Debug, Error)]
pub enum CommandError {
    /// The configured run mode is neither `base` nor `regression`
    #[error("The \"type\" setting is unknown.\nExpected: \"regression\" or \"base\"\nActual: {actual}")]
    UnknownMode { actual: String },

    /// The capture host never reported a usable screenshot path
    #[error("Could not resolve screenshot path")]
    PathNotResolved,

    /// The comparator reported an error and the command was not silenced
    #[error(transparent)]
    Comparison(#[from] ComparisonError),

    /// Failure inside the capture host
    #[error(transparent)]
    Capture(#[from] SnapshotError),

    /// Failure running an external task
    #[error(transparent)]
    Task(#[from] TaskError),
}

/// Errors loading the host environment document
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read host env '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid host env: {0}")]
    Parse(#[from] serde_json::Error),
}
