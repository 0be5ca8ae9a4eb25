//! Visual regression settings with environment variable support.
//!
//! The command never reads these settings from ambient process state. Callers
//! build a [`VisualRegressionConfig`] (from the environment, from a host env
//! JSON document, or programmatically) and pass it into every invocation.
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `VISREG_TYPE` | Run mode, `base` or `regression` | unset |
//! | `VISREG_BASE_DIRECTORY` | Directory holding baseline images | `snapshots/base` |
//! | `VISREG_DIFF_DIRECTORY` | Directory receiving diff images | `snapshots/diff` |
//! | `VISREG_GENERATE_DIFF` | Whether the comparator writes diff images | `true` |
//! | `VISREG_FAIL_SILENTLY` | Return comparison errors as data | unset |
//!
//! # Host env document
//!
//! ```json
//! {
//!   "visualRegression": {
//!     "type": "regression",
//!     "baseDirectory": "snapshots/base",
//!     "diffDirectory": "snapshots/diff",
//!     "generateDiff": true,
//!     "failSilently": false
//!   }
//! }
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CommandError, CommandResult, ConfigError};

// ============================================================================
// Default Values
// ============================================================================

/// Default baseline directory
pub const DEFAULT_BASE_DIRECTORY: &str = "snapshots/base";

/// Default diff directory
pub const DEFAULT_DIFF_DIRECTORY: &str = "snapshots/diff";

/// Diff images are generated unless disabled
pub const DEFAULT_GENERATE_DIFF: bool = true;

/// Key of the settings object inside a host env document
pub const HOST_ENV_KEY: &str = "visualRegression";

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable for the run mode
pub const ENV_TYPE: &str = "VISREG_TYPE";

/// Environment variable for the baseline directory
pub const ENV_BASE_DIRECTORY: &str = "VISREG_BASE_DIRECTORY";

/// Environment variable for the diff directory
pub const ENV_DIFF_DIRECTORY: &str = "VISREG_DIFF_DIRECTORY";

/// Environment variable for diff generation
pub const ENV_GENERATE_DIFF: &str = "VISREG_GENERATE_DIFF";

/// Environment variable for the global fail-silently flag
pub const ENV_FAIL_SILENTLY: &str = "VISREG_FAIL_SILENTLY";

// ============================================================================
// Run mode
// ============================================================================

/// Which behavior a `compareSnapshot` invocation dispatches to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Promote the capture as the new baseline
    Base,
    /// Compare the capture against the stored baseline
    Regression,
}

impl RunMode {
    /// Parse a raw mode value. Only `base` and `regression` are accepted.
    pub fn parse(kind: Option<&str>) -> CommandResult<Self> {
        match kind {
            Some("base") => Ok(RunMode::Base),
            Some("regression") => Ok(RunMode::Regression),
            Some(other) => Err(CommandError::UnknownMode {
                actual: other.to_string(),
            }),
            None => Err(CommandError::UnknownMode {
                actual: "<unset>".to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Base => "base",
            RunMode::Regression => "regression",
        }
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Settings
// ============================================================================

/// The global `visualRegression` settings object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualRegressionConfig {
    /// Raw run mode. Kept unparsed so a bad value surfaces per invocation.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Directory holding baseline images
    #[serde(default = "default_base_directory")]
    pub base_directory: PathBuf,

    /// Directory receiving diff images
    #[serde(default = "default_diff_directory")]
    pub diff_directory: PathBuf,

    /// Whether the comparator writes diff images
    #[serde(default = "default_generate_diff")]
    pub generate_diff: bool,

    /// Global fail-silently flag, consulted when the call site leaves it unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_silently: Option<bool>,
}

fn default_base_directory() -> PathBuf {
    PathBuf::from(DEFAULT_BASE_DIRECTORY)
}

fn default_diff_directory() -> PathBuf {
    PathBuf::from(DEFAULT_DIFF_DIRECTORY)
}

fn default_generate_diff() -> bool {
    DEFAULT_GENERATE_DIFF
}

impl VisualRegressionConfig {
    /// Create settings from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            kind: env::var(ENV_TYPE).ok().filter(|s| !s.is_empty()),
            base_directory: env::var(ENV_BASE_DIRECTORY)
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_base_directory()),
            diff_directory: env::var(ENV_DIFF_DIRECTORY)
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_diff_directory()),
            generate_diff: env::var(ENV_GENERATE_DIFF)
                .ok()
                .and_then(|s| parse_bool(&s))
                .unwrap_or(DEFAULT_GENERATE_DIFF),
            fail_silently: env::var(ENV_FAIL_SILENTLY)
                .ok()
                .and_then(|s| parse_bool(&s)),
        }
    }

    /// Create settings with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            kind: None,
            base_directory: default_base_directory(),
            diff_directory: default_diff_directory(),
            generate_diff: DEFAULT_GENERATE_DIFF,
            fail_silently: None,
        }
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn base_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_directory = dir.into();
        self
    }

    pub fn diff_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.diff_directory = dir.into();
        self
    }

    pub fn generate_diff(mut self, generate: bool) -> Self {
        self.generate_diff = generate;
        self
    }

    pub fn fail_silently(mut self, fail_silently: bool) -> Self {
        self.fail_silently = Some(fail_silently);
        self
    }

    /// Parse the configured run mode. Re-evaluated on every call.
    pub fn run_mode(&self) -> CommandResult<RunMode> {
        RunMode::parse(self.kind.as_deref())
    }
}

impl Default for VisualRegressionConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

/// A host env document carrying the settings under [`HOST_ENV_KEY`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostEnv {
    #[serde(rename = "visualRegression", default)]
    pub visual_regression: VisualRegressionConfig,
}

impl HostEnv {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse a boolean environment value
/// Accepts: "true"/"false", "1"/"0", "yes"/"no" (case-insensitive)
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
