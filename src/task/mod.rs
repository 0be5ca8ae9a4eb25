//! External operations the snapshot command delegates to.
//!
//! Baseline storage and pixel comparison live outside this crate. The command
//! only sees them through [`TaskExecutor`], whose two operations mirror the
//! `updateSnapshot` and `compareSnapshotsPlugin` tasks.

pub mod codec;
pub mod process;
pub mod types;

pub use codec::{ComparisonError, ErrorKind, SerializedError};
pub use process::{DEFAULT_TASK_TIMEOUT, ProcessTaskConfig, ProcessTaskExecutor};
pub use types::{
    CompareSnapshotsArgs, ComparisonResult, TaskError, TaskResult, UpdateSnapshotArgs,
};

/// Task name of the baseline update operation
pub const UPDATE_SNAPSHOT_TASK: &str = "updateSnapshot";

/// Task name of the comparison operation
pub const COMPARE_SNAPSHOTS_TASK: &str = "compareSnapshotsPlugin";

/// Executor for the two snapshot tasks
pub trait TaskExecutor {
    /// Persist the screenshot as the new baseline
    fn update_snapshot(&mut self, args: &UpdateSnapshotArgs) -> TaskResult<bool>;

    /// Compare the screenshot against its baseline
    fn compare_snapshots(&mut self, args: &CompareSnapshotsArgs) -> TaskResult<ComparisonResult>;
}
