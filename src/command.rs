//! The `compareSnapshot` command.
//!
//! One invocation runs strictly in sequence:
//!
//! ```text
//! resolve options -> capture -> read run mode -> base:       updateSnapshot
//!                                             -> regression: compareSnapshotsPlugin -> pass/fail
//! ```
//!
//! Capture always completes before the mode is inspected, so an unknown mode
//! leaves the screenshot on disk. The recorded path is validated by the
//! update and compare stages, after the mode has been accepted.

use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::config::{RunMode, VisualRegressionConfig};
use crate::error::{CommandError, CommandResult};
use crate::options::{CallSiteParams, EffectiveOptions, SnapshotOptions, resolve};
use crate::snapshot::{CaptureTarget, ScreenshotPath, ScreenshotRequest, Screenshotter, capture};
use crate::task::{CompareSnapshotsArgs, ComparisonResult, TaskExecutor, UpdateSnapshotArgs};

/// Collaborators and settings for one invocation
pub struct CommandContext<'a> {
    /// Global settings, re-read on every invocation
    pub config: &'a VisualRegressionConfig,
    /// Name of the test file being run
    pub spec_name: &'a str,
    pub screenshotter: &'a mut dyn Screenshotter,
    pub tasks: &'a mut dyn TaskExecutor,
}

/// What a successful invocation yields
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommandOutcome {
    /// `base` mode: the update task's success indicator
    Baseline(bool),
    /// `regression` mode: the comparison metrics
    Comparison(ComparisonResult),
}

impl CommandOutcome {
    pub fn as_baseline(&self) -> Option<bool> {
        match self {
            CommandOutcome::Baseline(updated) => Some(*updated),
            CommandOutcome::Comparison(_) => None,
        }
    }

    pub fn as_comparison(&self) -> Option<&ComparisonResult> {
        match self {
            CommandOutcome::Comparison(result) => Some(result),
            CommandOutcome::Baseline(_) => None,
        }
    }
}

/// One comparison/update attempt
#[derive(Debug, Clone)]
pub struct SnapshotRequest<'a> {
    pub name: &'a str,
    pub target: Option<&'a CaptureTarget>,
    pub options: EffectiveOptions,
}

/// `compareSnapshot` with the defaults it was registered with
#[derive(Debug, Clone, Default)]
pub struct CompareSnapshotCommand {
    defaults: SnapshotOptions,
}

impl CompareSnapshotCommand {
    pub const NAME: &'static str = "compareSnapshot";

    pub fn new(defaults: SnapshotOptions) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &SnapshotOptions {
        &self.defaults
    }

    /// Run the command against `subject` (or the whole viewport).
    pub fn run(
        &self,
        ctx: &mut CommandContext<'_>,
        subject: Option<&CaptureTarget>,
        name: &str,
        params: impl Into<CallSiteParams>,
    ) -> CommandResult<CommandOutcome> {
        let request = SnapshotRequest {
            name,
            target: subject,
            options: resolve(&self.defaults, params.into()),
        };
        debug!(
            name,
            target = ?request.target,
            error_threshold = request.options.error_threshold,
            "resolved snapshot options"
        );

        let recorded = capture(
            &mut *ctx.screenshotter,
            &ScreenshotRequest {
                name,
                spec_name: ctx.spec_name,
                target: request.target,
                options: &request.options.capture,
            },
        )?;

        let mode = ctx.config.run_mode()?;
        debug!(name, mode = %mode, "dispatching");
        match mode {
            RunMode::Regression => {
                compare_screenshots(ctx, &request, recorded).map(CommandOutcome::Comparison)
            }
            RunMode::Base => {
                update_base_screenshot(ctx, &request, recorded).map(CommandOutcome::Baseline)
            }
        }
    }
}

/// Promote the capture as the new baseline
fn update_base_screenshot(
    ctx: &mut CommandContext<'_>,
    request: &SnapshotRequest<'_>,
    recorded: Option<PathBuf>,
) -> CommandResult<bool> {
    let screenshot = ScreenshotPath::resolve(recorded)?;
    let args = UpdateSnapshotArgs {
        screenshot_name: request.name.to_string(),
        spec_name: ctx.spec_name.to_string(),
        screenshot_absolute_path: screenshot.to_string(),
        base_directory: ctx.config.base_directory.clone(),
    };

    let updated = ctx.tasks.update_snapshot(&args)?;
    info!(name = request.name, updated, "baseline update finished");
    Ok(updated)
}

/// Compare the capture against its baseline and apply the pass/fail rule
fn compare_screenshots(
    ctx: &mut CommandContext<'_>,
    request: &SnapshotRequest<'_>,
    recorded: Option<PathBuf>,
) -> CommandResult<ComparisonResult> {
    let screenshot = ScreenshotPath::resolve(recorded)?;
    let config = ctx.config;
    let args = CompareSnapshotsArgs {
        screenshot_name: request.name.to_string(),
        error_threshold: request.options.error_threshold,
        spec_name: ctx.spec_name.to_string(),
        screenshot_absolute_path: screenshot.to_string(),
        base_directory: config.base_directory.clone(),
        diff_directory: config.diff_directory.clone(),
        generate_diff: config.generate_diff,
    };
    let fail_silently = request.options.fail_silently(config);

    let result = ctx.tasks.compare_snapshots(&args)?;
    info!(
        name = request.name,
        mismatched_pixels = result.mismatched_pixels,
        percentage = result.percentage,
        "comparison finished"
    );
    settle_comparison(result, fail_silently)
}

/// Apply the pass/fail rule to a comparator result.
///
/// Without an `error` the result is returned as-is. With one, the result is
/// returned only when `fail_silently` is set; otherwise the error is
/// reconstituted and raised.
pub fn settle_comparison(
    result: ComparisonResult,
    fail_silently: bool,
) -> CommandResult<ComparisonResult> {
    if let Some(error) = &result.error {
        if !fail_silently {
            return Err(CommandError::Comparison(error.deserialize()));
        }
        warn!(kind = ?error.kind, message = %error.message, "comparison error returned as data");
    }
    Ok(result)
}
