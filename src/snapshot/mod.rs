pub mod backend;
pub mod capture;
pub mod types;
pub mod utils;

pub use backend::{FramebufferScreenshotter, MockFramebuffer, Screenshotter};
pub use capture::{ScreenshotPath, capture};
pub use types::{
    CaptureOptions, CaptureTarget, Region, ScreenshotDetails, ScreenshotRequest, SnapshotError,
    SnapshotResult,
};
pub use utils::{sanitize_file_stem, unique_png_path, write_manifest};
