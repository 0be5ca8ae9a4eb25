use std::fs;
use std::path::{Path, PathBuf};

use crate::snapshot::types::{CaptureOptions, ScreenshotDetails, SnapshotResult};

/// Sanitize a screenshot name for use as a file stem.
/// Path separators are kept so names can address subfolders.
pub fn sanitize_file_stem(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// First free `<stem>.png`, `<stem> (1).png`, `<stem> (2).png`, ... in `dir`
pub fn unique_png_path(dir: &Path, stem: &str) -> PathBuf {
    let first = dir.join(format!("{}.png", stem));
    if !first.exists() {
        return first;
    }
    let mut n = 1u32;
    loop {
        let candidate = dir.join(format!("{} ({}).png", stem, n));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Write the JSON manifest next to a screenshot
pub fn write_manifest(details: &ScreenshotDetails) -> SnapshotResult<()> {
    if let Some(path) = &details.path {
        let manifest_path = path.with_extension("json");
        fs::write(manifest_path, serde_json::to_string_pretty(details)?)?;
    }
    Ok(())
}

/// Read a non-negative integer capture option
pub fn option_u32(options: &CaptureOptions, key: &str) -> Option<u32> {
    options
        .get(key)
        .and_then(|v| v.as_u64())
        .map(|v| v.min(u64::from(u32::MAX)) as u32)
}

/// Read a boolean capture option
pub fn option_bool(options: &CaptureOptions, key: &str) -> Option<bool> {
    options.get(key).and_then(|v| v.as_bool())
}

/// Read a list-of-strings capture option; non-string entries are skipped
pub fn option_strings(options: &CaptureOptions, key: &str) -> Vec<String> {
    options
        .get(key)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_file_stem() {
        assert_eq!(sanitize_file_stem("login page"), "login page");
        assert_eq!(sanitize_file_stem("a:b*c?"), "a_b_c_");
        assert_eq!(sanitize_file_stem("nested/name"), "nested/name");
    }

    #[test]
    fn test_unique_png_path_appends_counter() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(unique_png_path(dir.path(), "shot"), dir.path().join("shot.png"));

        fs::write(dir.path().join("shot.png"), b"x").unwrap();
        fs::write(dir.path().join("shot (1).png"), b"x").unwrap();
        assert_eq!(
            unique_png_path(dir.path(), "shot"),
            dir.path().join("shot (2).png")
        );
    }

    #[test]
    fn test_option_readers() {
        let options = json!({"padding": 4, "overwrite": true, "blackout": ["#a", 3, "#b"]});
        let options = options.as_object().unwrap();
        assert_eq!(option_u32(options, "padding"), Some(4));
        assert_eq!(option_bool(options, "overwrite"), Some(true));
        assert_eq!(option_strings(options, "blackout"), vec!["#a", "#b"]);
        assert_eq!(option_u32(options, "missing"), None);
        assert!(option_strings(options, "missing").is_empty());
    }
}
