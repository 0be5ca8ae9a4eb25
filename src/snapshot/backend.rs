//! Capture host abstraction and a framebuffer-backed implementation.
//!
//! A capture host writes one image per request and reports where it went
//! through a completion hook. This module provides:
//! - `Screenshotter`, the interface the snapshot command drives
//! - `MockFramebuffer`, an in-memory RGB frame with a small drawing API
//! - `FramebufferScreenshotter`, a capture host that writes frames to disk

use chrono::Utc;
use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{ImageBuffer, RgbImage};
use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::types::{
    CaptureTarget, Region, ScreenshotDetails, ScreenshotRequest, SnapshotError, SnapshotResult,
};
use super::utils::{
    option_bool, option_strings, option_u32, sanitize_file_stem, unique_png_path, write_manifest,
};

/// Trait for capture hosts
///
/// Implementations write the screenshot to disk and call `on_after` with the
/// resulting details before returning. A host that fails returns its own
/// error; the snapshot command propagates it unchanged.
pub trait Screenshotter {
    /// Capture the requested target (or the whole viewport)
    fn screenshot(
        &mut self,
        request: &ScreenshotRequest<'_>,
        on_after: &mut dyn FnMut(&ScreenshotDetails),
    ) -> SnapshotResult<()>;

    /// Get the source type identifier (e.g., "framebuffer", "browser")
    fn source_type(&self) -> &str;
}

/// A virtual framebuffer for testing and programmatic drawing
///
/// Provides a full drawing API for creating test fixtures:
/// - `fill()` - Fill entire buffer with a color
/// - `draw_rect()` - Draw a filled rectangle
/// - `draw_text()` - Draw text using font8x8 glyphs
/// - `get_pixel()` / `set_pixel()` - Direct pixel access
/// - `crop()` - Cut out a region
#[derive(Debug, Clone)]
pub struct MockFramebuffer {
    /// Width in pixels
    width: u32,
    /// Height in pixels
    height: u32,
    /// RGB pixel buffer (row-major, 3 bytes per pixel)
    buffer: Vec<u8>,
}

impl MockFramebuffer {
    /// Create a new framebuffer with the given dimensions, initialized to black
    pub fn new(width: u32, height: u32) -> Self {
        let buffer = vec![0u8; (width as usize) * (height as usize) * 3];
        Self {
            width,
            height,
            buffer,
        }
    }

    /// Create a framebuffer initialized to a specific color
    pub fn with_color(width: u32, height: u32, color: [u8; 3]) -> Self {
        let mut fb = Self::new(width, height);
        fb.fill(color);
        fb
    }

    /// Load a framebuffer from PNG image bytes
    pub fn from_png_bytes(data: &[u8]) -> SnapshotResult<Self> {
        let img = image::load_from_memory(data)?;
        let rgb = img.to_rgb8();
        Ok(Self {
            width: rgb.width(),
            height: rgb.height(),
            buffer: rgb.into_raw(),
        })
    }

    /// Load a framebuffer from a PNG file
    pub fn from_png_file(path: impl AsRef<Path>) -> SnapshotResult<Self> {
        let data = fs::read(path)?;
        Self::from_png_bytes(&data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Fill the entire framebuffer with a color
    pub fn fill(&mut self, color: [u8; 3]) {
        for chunk in self.buffer.chunks_exact_mut(3) {
            chunk.copy_from_slice(&color);
        }
    }

    /// Draw a filled rectangle
    pub fn draw_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: [u8; 3]) {
        for py in y..y.saturating_add(h).min(self.height) {
            for px in x..x.saturating_add(w).min(self.width) {
                self.set_pixel(px, py, color);
            }
        }
    }

    /// Draw text using font8x8 glyphs
    ///
    /// Each character is 8x8 pixels. Text does not wrap.
    pub fn draw_text(&mut self, x: u32, y: u32, text: &str, fg: [u8; 3], bg: [u8; 3]) {
        let mut cursor_x = x;
        for ch in text.chars() {
            self.draw_char(cursor_x, y, ch, fg, bg);
            cursor_x += 8;
            if cursor_x >= self.width {
                break;
            }
        }
    }

    fn draw_char(&mut self, x: u32, y: u32, ch: char, fg: [u8; 3], bg: [u8; 3]) {
        let glyph = BASIC_FONTS.get(ch).unwrap_or([0u8; 8]);
        for (row_idx, row) in glyph.iter().enumerate() {
            let py = y + row_idx as u32;
            if py >= self.height {
                break;
            }
            for bit in 0..8 {
                let px = x + bit;
                if px >= self.width {
                    break;
                }
                // font8x8 stores LSB as leftmost pixel
                let is_fg = (row >> bit) & 1 == 1;
                self.set_pixel(px, py, if is_fg { fg } else { bg });
            }
        }
    }

    /// Get the color of a pixel
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0];
        }
        let idx = self.index(x, y);
        [self.buffer[idx], self.buffer[idx + 1], self.buffer[idx + 2]]
    }

    /// Set the color of a pixel
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = self.index(x, y);
        self.buffer[idx..idx + 3].copy_from_slice(&color);
    }

    fn index(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + (x as usize)) * 3
    }

    /// Copy out a region, clamped to the frame
    pub fn crop(&self, region: Region) -> Self {
        let x0 = region.x.min(self.width);
        let y0 = region.y.min(self.height);
        let x1 = region.x.saturating_add(region.width).min(self.width);
        let y1 = region.y.saturating_add(region.height).min(self.height);

        let mut out = Self::new(x1 - x0, y1 - y0);
        for y in y0..y1 {
            let src = self.index(x0, y);
            let dst = out.index(0, y - y0);
            let len = ((x1 - x0) as usize) * 3;
            out.buffer[dst..dst + len].copy_from_slice(&self.buffer[src..src + len]);
        }
        out
    }

    /// Convert to an image buffer
    pub fn to_image(&self) -> SnapshotResult<RgbImage> {
        ImageBuffer::from_raw(self.width, self.height, self.buffer.clone()).ok_or_else(|| {
            SnapshotError::Capture(format!(
                "Buffer size mismatch for {}x{} frame",
                self.width, self.height
            ))
        })
    }

    /// Encode the framebuffer as PNG bytes
    pub fn to_png(&self) -> SnapshotResult<Vec<u8>> {
        if self.width == 0 || self.height == 0 {
            return Err(SnapshotError::Capture(format!(
                "Cannot encode an empty {}x{} frame",
                self.width, self.height
            )));
        }
        let img = self.to_image()?;
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
        Ok(bytes)
    }
}

/// Capture host that renders a framebuffer to `<screenshots_dir>/<spec>/<name>.png`
///
/// Element targets are resolved through regions registered per selector.
/// Recognized capture options:
/// - `padding`: pixels added around an element capture
/// - `overwrite`: replace an existing file instead of suffixing ` (n)`
/// - `blackout`: selectors whose regions are painted black first
#[derive(Debug, Clone)]
pub struct FramebufferScreenshotter {
    frame: MockFramebuffer,
    screenshots_dir: PathBuf,
    regions: HashMap<String, Region>,
    write_manifest: bool,
}

impl FramebufferScreenshotter {
    pub fn new(frame: MockFramebuffer, screenshots_dir: impl Into<PathBuf>) -> Self {
        Self {
            frame,
            screenshots_dir: screenshots_dir.into(),
            regions: HashMap::new(),
            write_manifest: false,
        }
    }

    /// Register the region an element selector resolves to
    pub fn region(mut self, selector: impl Into<String>, region: Region) -> Self {
        self.regions.insert(selector.into(), region);
        self
    }

    /// Write a JSON manifest next to every screenshot
    pub fn with_manifest(mut self, write_manifest: bool) -> Self {
        self.write_manifest = write_manifest;
        self
    }

    fn render(&self, request: &ScreenshotRequest<'_>) -> SnapshotResult<MockFramebuffer> {
        let mut frame = self.frame.clone();

        for selector in option_strings(request.options, "blackout") {
            if let Some(r) = self.regions.get(&selector) {
                frame.draw_rect(r.x, r.y, r.width, r.height, [0, 0, 0]);
            }
        }

        match request.target {
            Some(CaptureTarget::Selector(selector)) => {
                let region = self
                    .regions
                    .get(selector)
                    .ok_or_else(|| SnapshotError::UnknownSelector(selector.clone()))?;
                let padding = option_u32(request.options, "padding").unwrap_or(0);
                Ok(frame.crop(region.padded(padding, frame.width(), frame.height())))
            }
            None => Ok(frame),
        }
    }
}

impl Screenshotter for FramebufferScreenshotter {
    fn screenshot(
        &mut self,
        request: &ScreenshotRequest<'_>,
        on_after: &mut dyn FnMut(&ScreenshotDetails),
    ) -> SnapshotResult<()> {
        let frame = self.render(request)?;

        let spec_dir = std::path::absolute(self.screenshots_dir.join(request.spec_name))?;
        let stem = sanitize_file_stem(request.name);
        let path = if option_bool(request.options, "overwrite").unwrap_or(false) {
            spec_dir.join(format!("{}.png", stem))
        } else {
            unique_png_path(&spec_dir, &stem)
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, frame.to_png()?)?;
        debug!(path = %path.display(), width = frame.width(), height = frame.height(), "screenshot written");

        let details = ScreenshotDetails {
            path: Some(path),
            name: request.name.to_string(),
            width: frame.width(),
            height: frame.height(),
            source: self.source_type().to_string(),
            taken_at: Utc::now(),
        };
        if self.write_manifest {
            write_manifest(&details)?;
        }

        on_after(&details);
        Ok(())
    }

    fn source_type(&self) -> &str {
        "framebuffer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::CaptureOptions;
    use serde_json::json;

    fn request<'a>(
        name: &'a str,
        target: Option<&'a CaptureTarget>,
        options: &'a CaptureOptions,
    ) -> ScreenshotRequest<'a> {
        ScreenshotRequest {
            name,
            spec_name: "login.cy.ts",
            target,
            options,
        }
    }

    fn take(
        shooter: &mut FramebufferScreenshotter,
        request: &ScreenshotRequest<'_>,
    ) -> SnapshotResult<ScreenshotDetails> {
        let mut seen = None;
        shooter.screenshot(request, &mut |d: &ScreenshotDetails| seen = Some(d.clone()))?;
        Ok(seen.expect("hook should be called"))
    }

    #[test]
    fn test_mock_framebuffer_new() {
        let fb = MockFramebuffer::new(100, 50);
        assert_eq!(fb.width(), 100);
        assert_eq!(fb.height(), 50);
        // Should be initialized to black
        assert_eq!(fb.get_pixel(0, 0), [0, 0, 0]);
        assert_eq!(fb.get_pixel(99, 49), [0, 0, 0]);
    }

    #[test]
    fn test_mock_framebuffer_draw_rect() {
        let mut fb = MockFramebuffer::new(20, 20);
        fb.draw_rect(5, 5, 10, 10, [255, 0, 0]);

        assert_eq!(fb.get_pixel(4, 4), [0, 0, 0]);
        assert_eq!(fb.get_pixel(5, 5), [255, 0, 0]);
        assert_eq!(fb.get_pixel(14, 14), [255, 0, 0]);
        assert_eq!(fb.get_pixel(15, 15), [0, 0, 0]);
    }

    #[test]
    fn test_mock_framebuffer_draw_text() {
        let mut fb = MockFramebuffer::new(80, 16);
        fb.draw_text(0, 0, "Hi", [255, 255, 255], [0, 0, 0]);

        let has_white = (0..8).any(|y| (0..8).any(|x| fb.get_pixel(x, y) == [255, 255, 255]));
        assert!(has_white, "Character 'H' should have some foreground pixels");
    }

    #[test]
    fn test_mock_framebuffer_crop() {
        let mut fb = MockFramebuffer::new(32, 32);
        fb.draw_rect(8, 8, 4, 4, [0, 255, 0]);

        let cropped = fb.crop(Region::new(8, 8, 30, 30));
        assert_eq!((cropped.width(), cropped.height()), (24, 24));
        assert_eq!(cropped.get_pixel(0, 0), [0, 255, 0]);
        assert_eq!(cropped.get_pixel(4, 4), [0, 0, 0]);
    }

    #[test]
    fn test_mock_framebuffer_png_roundtrip() {
        let mut fb = MockFramebuffer::with_color(32, 32, [100, 150, 200]);
        fb.draw_rect(8, 8, 16, 16, [255, 0, 0]);

        let png = fb.to_png().unwrap();
        assert_eq!(&png[0..4], &[0x89, 0x50, 0x4E, 0x47]);
        let fb2 = MockFramebuffer::from_png_bytes(&png).unwrap();
        assert_eq!(fb2.get_pixel(0, 0), [100, 150, 200]);
        assert_eq!(fb2.get_pixel(10, 10), [255, 0, 0]);
    }

    #[test]
    fn test_empty_frame_does_not_encode() {
        let fb = MockFramebuffer::new(0, 10);
        assert!(matches!(fb.to_png(), Err(SnapshotError::Capture(_))));
    }

    #[test]
    fn test_undecodable_png_is_image_error() {
        let result = MockFramebuffer::from_png_bytes(b"not a png");
        assert!(matches!(result, Err(SnapshotError::Image(_))));
    }

    #[test]
    fn test_viewport_capture_writes_under_spec_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut shooter =
            FramebufferScreenshotter::new(MockFramebuffer::new(40, 30), dir.path());
        let options = CaptureOptions::new();

        let details = take(&mut shooter, &request("login", None, &options)).unwrap();
        let path = details.path.unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("login.cy.ts/login.png"));
        assert!(path.exists());
        assert_eq!((details.width, details.height), (40, 30));
    }

    #[test]
    fn test_element_capture_crops_with_padding() {
        let dir = tempfile::tempdir().unwrap();
        let mut shooter = FramebufferScreenshotter::new(MockFramebuffer::new(100, 100), dir.path())
            .region("#form", Region::new(10, 10, 20, 20));
        let target = CaptureTarget::selector("#form");
        let options = json!({"padding": 5}).as_object().cloned().unwrap();

        let details = take(&mut shooter, &request("form", Some(&target), &options)).unwrap();
        assert_eq!((details.width, details.height), (30, 30));
    }

    #[test]
    fn test_unknown_selector_fails_without_calling_hook() {
        let dir = tempfile::tempdir().unwrap();
        let mut shooter = FramebufferScreenshotter::new(MockFramebuffer::new(10, 10), dir.path());
        let target = CaptureTarget::selector("#missing");
        let options = CaptureOptions::new();

        let mut called = false;
        let result = shooter.screenshot(&request("x", Some(&target), &options), &mut |_: &ScreenshotDetails| {
            called = true
        });
        assert!(matches!(result, Err(SnapshotError::UnknownSelector(ref s)) if s == "#missing"));
        assert!(!called);
    }

    #[test]
    fn test_repeat_capture_suffixes_unless_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let mut shooter = FramebufferScreenshotter::new(MockFramebuffer::new(8, 8), dir.path());
        let options = CaptureOptions::new();

        take(&mut shooter, &request("home", None, &options)).unwrap();
        let second = take(&mut shooter, &request("home", None, &options)).unwrap();
        assert!(second.path.unwrap().ends_with("home (1).png"));

        let overwrite = json!({"overwrite": true}).as_object().cloned().unwrap();
        let third = take(&mut shooter, &request("home", None, &overwrite)).unwrap();
        assert!(third.path.unwrap().ends_with("login.cy.ts/home.png"));
    }

    #[test]
    fn test_blackout_paints_region() {
        let dir = tempfile::tempdir().unwrap();
        let mut shooter =
            FramebufferScreenshotter::new(MockFramebuffer::with_color(20, 20, [255, 255, 255]), dir.path())
                .region("#clock", Region::new(0, 0, 5, 5));
        let options = json!({"blackout": ["#clock", "#absent"]}).as_object().cloned().unwrap();

        let details = take(&mut shooter, &request("page", None, &options)).unwrap();
        let written = MockFramebuffer::from_png_file(details.path.unwrap()).unwrap();
        assert_eq!(written.get_pixel(2, 2), [0, 0, 0]);
        assert_eq!(written.get_pixel(10, 10), [255, 255, 255]);
    }

    #[test]
    fn test_manifest_written_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut shooter = FramebufferScreenshotter::new(MockFramebuffer::new(8, 8), dir.path())
            .with_manifest(true);
        let options = CaptureOptions::new();

        let details = take(&mut shooter, &request("nav", None, &options)).unwrap();
        let manifest = details.path.unwrap().with_extension("json");
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(manifest).unwrap()).unwrap();
        assert_eq!(json["name"], "nav");
        assert_eq!(json["source"], "framebuffer");
    }
}
