//! Drives a capture host and records the screenshot path it reports.

use std::fmt;
use std::path::PathBuf;

use tracing::debug;

use super::backend::Screenshotter;
use super::types::{ScreenshotDetails, ScreenshotRequest};
use crate::error::{CommandError, CommandResult};

/// Path of the image produced by a capture.
///
/// Only obtainable through [`ScreenshotPath::resolve`], so holding one means
/// the host reported a valid, non-empty UTF-8 path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotPath(String);

impl ScreenshotPath {
    /// Validate the path recorded by [`capture`]
    pub fn resolve(path: Option<PathBuf>) -> CommandResult<Self> {
        let path = path.ok_or(CommandError::PathNotResolved)?;
        match path.into_os_string().into_string() {
            Ok(s) if !s.is_empty() => Ok(Self(s)),
            _ => Err(CommandError::PathNotResolved),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScreenshotPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Capture once and return whatever path the host reported.
///
/// Host failures propagate unchanged. The path is validated later, by the
/// stage that consumes it, through [`ScreenshotPath::resolve`].
pub fn capture<S>(screenshotter: &mut S, request: &ScreenshotRequest<'_>) -> CommandResult<Option<PathBuf>>
where
    S: Screenshotter + ?Sized,
{
    let mut recorded: Option<PathBuf> = None;
    screenshotter.screenshot(request, &mut |details: &ScreenshotDetails| {
        recorded = details.path.clone();
    })?;

    debug!(
        name = request.name,
        source = screenshotter.source_type(),
        path = ?recorded,
        "screenshot recorded"
    );
    Ok(recorded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{CaptureOptions, SnapshotError, SnapshotResult};
    use chrono::Utc;

    /// Host that reports a fixed path (or none) through the hook
    struct FixedHost {
        path: Option<PathBuf>,
        calls: usize,
        fail: bool,
    }

    impl FixedHost {
        fn reporting(path: Option<PathBuf>) -> Self {
            Self {
                path,
                calls: 0,
                fail: false,
            }
        }
    }

    impl Screenshotter for FixedHost {
        fn screenshot(
            &mut self,
            request: &ScreenshotRequest<'_>,
            on_after: &mut dyn FnMut(&ScreenshotDetails),
        ) -> SnapshotResult<()> {
            self.calls += 1;
            if self.fail {
                return Err(SnapshotError::Capture("browser crashed".to_string()));
            }
            if self.path.is_some() {
                on_after(&ScreenshotDetails {
                    path: self.path.clone(),
                    name: request.name.to_string(),
                    width: 1,
                    height: 1,
                    source: "fixed".to_string(),
                    taken_at: Utc::now(),
                });
            }
            Ok(())
        }

        fn source_type(&self) -> &str {
            "fixed"
        }
    }

    fn run(host: &mut FixedHost) -> CommandResult<Option<PathBuf>> {
        let options = CaptureOptions::new();
        let request = ScreenshotRequest {
            name: "login",
            spec_name: "auth.cy.ts",
            target: None,
            options: &options,
        };
        capture(host, &request)
    }

    #[test]
    fn test_capture_records_reported_path() {
        let mut host = FixedHost::reporting(Some(PathBuf::from("/shots/login.png")));
        let recorded = run(&mut host).unwrap();
        assert_eq!(host.calls, 1);

        let path = ScreenshotPath::resolve(recorded).unwrap();
        assert_eq!(path.as_str(), "/shots/login.png");
        assert_eq!(path.to_string(), "/shots/login.png");
    }

    #[test]
    fn test_capture_without_hook_call_records_nothing() {
        let mut host = FixedHost::reporting(None);
        let recorded = run(&mut host).unwrap();
        assert_eq!(recorded, None);
        assert_eq!(host.calls, 1);
        assert!(matches!(ScreenshotPath::resolve(recorded), Err(CommandError::PathNotResolved)));
    }

    #[test]
    fn test_empty_path_is_unresolved() {
        assert!(matches!(
            ScreenshotPath::resolve(Some(PathBuf::new())),
            Err(CommandError::PathNotResolved)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_path_is_unresolved() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = PathBuf::from(OsStr::from_bytes(b"/shots/\xff.png"));
        assert!(matches!(
            ScreenshotPath::resolve(Some(path)),
            Err(CommandError::PathNotResolved)
        ));
    }

    #[test]
    fn test_capture_host_error_propagates_unchanged() {
        let mut host = FixedHost::reporting(None);
        host.fail = true;
        match run(&mut host) {
            Err(CommandError::Capture(SnapshotError::Capture(msg))) => {
                assert_eq!(msg, "browser crashed")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
