//! visreg - visual regression snapshot command.
//!
//! This crate provides:
//! - The `compareSnapshot` command: capture a screenshot, then either promote
//!   it as the new baseline or compare it against the stored one
//! - Option resolution across registration defaults, global settings and the
//!   call site
//! - A capture host interface with a framebuffer-backed implementation
//! - A task executor interface with a child-process implementation
//!
//! # Example
//!
//! ```rust,no_run
//! use visreg::{
//!     CommandContext, CompareSnapshotCommand, FramebufferScreenshotter, MockFramebuffer,
//!     ProcessTaskConfig, ProcessTaskExecutor, VisualRegressionConfig,
//! };
//!
//! let config = VisualRegressionConfig::from_env();
//! let mut screenshotter =
//!     FramebufferScreenshotter::new(MockFramebuffer::new(800, 600), "snapshots/actual");
//! let mut tasks = ProcessTaskExecutor::new(ProcessTaskConfig::new("./visreg-tasks"));
//! let mut ctx = CommandContext {
//!     config: &config,
//!     spec_name: "login.cy.ts",
//!     screenshotter: &mut screenshotter,
//!     tasks: &mut tasks,
//! };
//!
//! let outcome = CompareSnapshotCommand::default()
//!     .run(&mut ctx, None, "login", 5.0_f64)
//!     .unwrap();
//! println!("{:?}", outcome);
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod options;
pub mod snapshot;
pub mod task;

// Re-export command types
pub use command::{CommandContext, CommandOutcome, CompareSnapshotCommand, SnapshotRequest, settle_comparison};

// Re-export configuration and errors
pub use config::{HostEnv, RunMode, VisualRegressionConfig};
pub use error::{CommandError, CommandResult, ConfigError};

// Re-export option resolution
pub use options::{CallSiteParams, EffectiveOptions, SnapshotOptions, resolve};

// Re-export capture types and hosts
pub use snapshot::{
    CaptureOptions, CaptureTarget, FramebufferScreenshotter, MockFramebuffer, Region,
    ScreenshotDetails, ScreenshotPath, ScreenshotRequest, Screenshotter, SnapshotError,
    SnapshotResult,
};

// Re-export task types and executors
pub use task::{
    CompareSnapshotsArgs, ComparisonError, ComparisonResult, ErrorKind, ProcessTaskConfig,
    ProcessTaskExecutor, SerializedError, TaskError, TaskExecutor, TaskResult, UpdateSnapshotArgs,
};
