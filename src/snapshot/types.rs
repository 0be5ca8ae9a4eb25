// Define core types for screenshot capture

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Opaque capture options forwarded to the capture host
pub type CaptureOptions = serde_json::Map<String, serde_json::Value>;

/// Element scope for a capture. No target means the whole viewport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaptureTarget {
    /// Element matched by a selector
    Selector(String),
}

impl CaptureTarget {
    pub fn selector(selector: impl Into<String>) -> Self {
        CaptureTarget::Selector(selector.into())
    }

    pub fn as_selector(&self) -> &str {
        match self {
            CaptureTarget::Selector(s) => s,
        }
    }
}

/// One screenshot request handed to a capture host
#[derive(Debug, Clone, Copy)]
pub struct ScreenshotRequest<'a> {
    /// Screenshot name, also the file stem
    pub name: &'a str,

    /// Name of the test file being run
    pub spec_name: &'a str,

    /// Element scope, if any
    pub target: Option<&'a CaptureTarget>,

    /// Capture-specific options
    pub options: &'a CaptureOptions,
}

/// Details the capture host reports once the image is written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotDetails {
    /// Absolute path of the written image
    pub path: Option<PathBuf>,

    /// Screenshot name
    pub name: String,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Source type of the capture host (e.g. "framebuffer")
    pub source: String,

    /// When the image was taken
    #[serde(with = "chrono::serde::ts_seconds")]
    pub taken_at: DateTime<Utc>,
}

/// Pixel rectangle on a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Parse "x,y,w,h"
    pub fn parse(spec: &str) -> Option<Self> {
        let parts: Vec<&str> = spec.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return None;
        }
        Some(Self {
            x: parts[0].parse().ok()?,
            y: parts[1].parse().ok()?,
            width: parts[2].parse().ok()?,
            height: parts[3].parse().ok()?,
        })
    }

    /// Grow by `padding` on every side, clamped to a `bound_w` x `bound_h` frame
    pub fn padded(&self, padding: u32, bound_w: u32, bound_h: u32) -> Self {
        let x = self.x.saturating_sub(padding);
        let y = self.y.saturating_sub(padding);
        let right = self
            .x
            .saturating_add(self.width)
            .saturating_add(padding)
            .min(bound_w);
        let bottom = self
            .y
            .saturating_add(self.height)
            .saturating_add(padding)
            .min(bound_h);
        Self {
            x,
            y,
            width: right.saturating_sub(x),
            height: bottom.saturating_sub(y),
        }
    }
}

/// Result type for capture operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Error types for capture operations
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Error during capture process
    #[error("Capture error: {0}")]
    Capture(String),

    /// No region is registered for the requested element
    #[error("No element found for selector '{0}'")]
    UnknownSelector(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Image encode/decode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_parse() {
        assert_eq!(Region::parse("1,2,30,40"), Some(Region::new(1, 2, 30, 40)));
        assert_eq!(Region::parse(" 0, 0, 5, 5 "), Some(Region::new(0, 0, 5, 5)));
        assert_eq!(Region::parse("1,2,3"), None);
        assert_eq!(Region::parse("a,b,c,d"), None);
    }

    #[test]
    fn test_region_padded_clamps_to_frame() {
        let region = Region::new(2, 2, 10, 10).padded(4, 14, 100);
        assert_eq!(region, Region::new(0, 0, 14, 16));
    }

    #[test]
    fn test_capture_target_selector() {
        let target = CaptureTarget::selector("#login");
        assert_eq!(target.as_selector(), "#login");
    }
}
