//! Error values crossing the task process boundary.
//!
//! A comparator reports failures as plain data ([`SerializedError`]). The
//! command turns that data back into a native [`ComparisonError`] before
//! raising it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Category of a comparator-reported failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Mismatch exceeded the allowed threshold
    ThresholdExceeded,
    /// The comparator itself failed (e.g. baseline image missing)
    ComparatorInternal,
    /// Missing or unrecognized kind
    #[default]
    #[serde(other)]
    Unknown,
}

/// Wire form of a comparator error
///
/// Decoding is permissive: a non-object payload becomes the message of an
/// `Unknown` error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireError")]
pub struct SerializedError {
    pub kind: ErrorKind,

    pub name: String,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

fn default_error_name() -> String {
    "Error".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireError {
    Fields(ErrorFields),
    Other(Value),
}

#[derive(Deserialize)]
struct ErrorFields {
    #[serde(default)]
    kind: ErrorKind,

    #[serde(default = "default_error_name")]
    name: String,

    #[serde(default)]
    message: String,

    #[serde(default)]
    stack: Option<String>,
}

impl From<WireError> for SerializedError {
    fn from(wire: WireError) -> Self {
        match wire {
            WireError::Fields(fields) => Self {
                kind: fields.kind,
                name: fields.name,
                message: fields.message,
                stack: fields.stack,
            },
            WireError::Other(Value::String(message)) => Self::new(ErrorKind::Unknown, message),
            WireError::Other(value) => Self::new(ErrorKind::Unknown, value.to_string()),
        }
    }
}

impl SerializedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            name: default_error_name(),
            message: message.into(),
            stack: None,
        }
    }

    pub fn threshold_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ThresholdExceeded, message)
    }

    pub fn comparator_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ComparatorInternal, message)
    }

    /// Reconstitute the native error
    pub fn deserialize(&self) -> ComparisonError {
        ComparisonError {
            kind: self.kind,
            name: self.name.clone(),
            message: self.message.clone(),
            stack: self.stack.clone(),
        }
    }
}

/// Native form of a comparator error, raised by the snapshot command
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ComparisonError {
    pub kind: ErrorKind,
    pub name: String,
    pub message: String,
    pub stack: Option<String>,
}

impl ComparisonError {
    pub fn serialize(&self) -> SerializedError {
        SerializedError {
            kind: self.kind,
            name: self.name.clone(),
            message: self.message.clone(),
            stack: self.stack.clone(),
        }
    }
}
