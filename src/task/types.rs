//! Payloads exchanged with the task executor.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::codec::SerializedError;

/// Arguments of the `updateSnapshot` task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSnapshotArgs {
    pub screenshot_name: String,
    pub spec_name: String,
    pub screenshot_absolute_path: String,
    pub base_directory: PathBuf,
}

/// Arguments of the `compareSnapshotsPlugin` task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareSnapshotsArgs {
    pub screenshot_name: String,
    pub error_threshold: f64,
    pub spec_name: String,
    pub screenshot_absolute_path: String,
    pub base_directory: PathBuf,
    pub diff_directory: PathBuf,
    pub generate_diff: bool,
}

/// Outcome of a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    /// Set when the comparator failed or the threshold was exceeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SerializedError>,

    /// Number of differing pixels
    #[serde(default)]
    pub mismatched_pixels: u64,

    /// Fraction of differing pixels
    #[serde(default)]
    pub percentage: f64,
}

impl ComparisonResult {
    pub fn new(mismatched_pixels: u64, percentage: f64) -> Self {
        Self {
            error: None,
            mismatched_pixels,
            percentage,
        }
    }

    pub fn with_error(mut self, error: SerializedError) -> Self {
        self.error = Some(error);
        self
    }
}

/// Result type for task operations
pub type TaskResult<T> = Result<T, TaskError>;

/// Errors running an external task
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Failed to spawn task runner '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Task '{task}' failed ({status}): {stderr}")]
    Failed {
        task: String,
        status: String,
        stderr: String,
    },

    #[error("Task '{task}' timed out after {timeout:?}")]
    Timeout { task: String, timeout: Duration },

    #[error("Task '{task}' returned invalid output: {source}")]
    InvalidOutput {
        task: String,
        source: serde_json::Error,
    },

    /// Failure reported by an in-process executor
    #[error("Task error: {0}")]
    Other(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
