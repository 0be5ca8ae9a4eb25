//! Option resolution for `compareSnapshot`.
//!
//! Three sources merge in ascending priority: defaults registered with the
//! command, the global settings, and the call-site parameter. The call-site
//! parameter arrives in one of several shapes and is normalized into
//! [`CallSiteParams`] once, at the entry point.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::VisualRegressionConfig;
use crate::snapshot::CaptureOptions;

/// Threshold used when no source supplies one
pub const DEFAULT_ERROR_THRESHOLD: f64 = 0.0;

const ERROR_THRESHOLD_KEY: &str = "errorThreshold";
const FAIL_SILENTLY_KEY: &str = "failSilently";

/// Option object accepted at registration time and at call sites
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_threshold: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_silently: Option<bool>,

    /// Everything else, forwarded to the capture host
    #[serde(flatten)]
    pub capture: CaptureOptions,
}

impl SnapshotOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error_threshold(mut self, threshold: f64) -> Self {
        self.error_threshold = Some(threshold);
        self
    }

    pub fn fail_silently(mut self, fail_silently: bool) -> Self {
        self.fail_silently = Some(fail_silently);
        self
    }

    pub fn capture_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.capture.insert(key.into(), value.into());
        self
    }

    /// Split a loose JSON object into known keys and capture options.
    /// Known keys holding the wrong type are dropped.
    pub fn from_map(mut map: serde_json::Map<String, Value>) -> Self {
        let error_threshold = map.remove(ERROR_THRESHOLD_KEY).and_then(|v| v.as_f64());
        let fail_silently = map.remove(FAIL_SILENTLY_KEY).and_then(|v| v.as_bool());
        Self {
            error_threshold,
            fail_silently,
            capture: map,
        }
    }

    /// Shallow merge: keys set on `self` win over `defaults`
    pub fn merged_over(&self, defaults: &SnapshotOptions) -> SnapshotOptions {
        let mut capture = defaults.capture.clone();
        for (key, value) in &self.capture {
            capture.insert(key.clone(), value.clone());
        }
        SnapshotOptions {
            error_threshold: self.error_threshold.or(defaults.error_threshold),
            fail_silently: self.fail_silently.or(defaults.fail_silently),
            capture,
        }
    }
}

/// Normalized call-site parameter
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CallSiteParams {
    /// Nothing passed
    #[default]
    Absent,
    /// A bare number, read as `errorThreshold`
    Threshold(f64),
    /// A full option object
    Options(SnapshotOptions),
    /// A string or boolean
    Unrecognized,
}

impl CallSiteParams {
    /// Normalize an untyped parameter
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => CallSiteParams::Absent,
            Value::Number(n) => match n.as_f64() {
                Some(threshold) => CallSiteParams::Threshold(threshold),
                None => CallSiteParams::Unrecognized,
            },
            Value::Object(map) => CallSiteParams::Options(SnapshotOptions::from_map(map)),
            // Arrays carry no option keys, so the defaults stand
            Value::Array(_) => CallSiteParams::Options(SnapshotOptions::default()),
            Value::String(_) | Value::Bool(_) => CallSiteParams::Unrecognized,
        }
    }
}

impl From<f64> for CallSiteParams {
    fn from(threshold: f64) -> Self {
        CallSiteParams::Threshold(threshold)
    }
}

impl From<SnapshotOptions> for CallSiteParams {
    fn from(options: SnapshotOptions) -> Self {
        CallSiteParams::Options(options)
    }
}

impl<T: Into<CallSiteParams>> From<Option<T>> for CallSiteParams {
    fn from(params: Option<T>) -> Self {
        params.map(Into::into).unwrap_or_default()
    }
}

/// Options in force for one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveOptions {
    pub error_threshold: f64,

    /// Merged call-site/registration value; the global flag is consulted later
    pub fail_silently: Option<bool>,

    pub capture: CaptureOptions,
}

impl EffectiveOptions {
    /// Merged option, then global flag, then `false`
    pub fn fail_silently(&self, config: &VisualRegressionConfig) -> bool {
        self.fail_silently
            .or(config.fail_silently)
            .unwrap_or(false)
    }
}

/// Merge registration defaults with a call-site parameter. Never fails.
pub fn resolve(defaults: &SnapshotOptions, params: CallSiteParams) -> EffectiveOptions {
    let merged = match params {
        CallSiteParams::Options(options) => options.merged_over(defaults),
        CallSiteParams::Threshold(threshold) => SnapshotOptions {
            error_threshold: Some(threshold),
            ..defaults.clone()
        },
        CallSiteParams::Absent => defaults.clone(),
        CallSiteParams::Unrecognized => SnapshotOptions {
            error_threshold: Some(DEFAULT_ERROR_THRESHOLD),
            ..defaults.clone()
        },
    };

    EffectiveOptions {
        error_threshold: merged.error_threshold.unwrap_or(DEFAULT_ERROR_THRESHOLD),
        fail_silently: merged.fail_silently,
        capture: merged.capture,
    }
}
