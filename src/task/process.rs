//! Task executor that runs each task in a child process.
//!
//! The child is invoked as `<program> [args..] <taskName>`, receives the task
//! arguments as JSON on stdin and answers with JSON on stdout. A non-zero exit
//! status is a task failure; stderr is kept for the error message.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::types::{
    CompareSnapshotsArgs, ComparisonResult, TaskError, TaskResult, UpdateSnapshotArgs,
};
use super::{COMPARE_SNAPSHOTS_TASK, TaskExecutor, UPDATE_SNAPSHOT_TASK};

/// Default time a task may run before it is killed
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(60);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Configuration for the process-backed executor
#[derive(Debug, Clone)]
pub struct ProcessTaskConfig {
    /// Program to run
    pub program: PathBuf,
    /// Arguments placed before the task name
    pub args: Vec<String>,
    /// Extra environment for the child
    pub env: Vec<(String, String)>,
    /// Kill the child after this long
    pub timeout: Duration,
}

impl ProcessTaskConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            timeout: DEFAULT_TASK_TIMEOUT,
        }
    }

    /// Add multiple arguments
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Runs `updateSnapshot` / `compareSnapshotsPlugin` out of process
#[derive(Debug, Clone)]
pub struct ProcessTaskExecutor {
    config: ProcessTaskConfig,
}

impl ProcessTaskExecutor {
    pub fn new(config: ProcessTaskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProcessTaskConfig {
        &self.config
    }

    fn run_task<A, R>(&self, task: &str, args: &A) -> TaskResult<R>
    where
        A: Serialize,
        R: DeserializeOwned,
    {
        let payload = serde_json::to_vec(args)?;
        let program = self.config.program.display().to_string();
        debug!(task, program = %program, "running task");

        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .arg(task)
            .envs(self.config.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| TaskError::Spawn {
                program: program.clone(),
                source,
            })?;

        // Drain both pipes on their own threads so a chatty child cannot block
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_reader = thread::spawn(move || read_pipe(stdout));
        let stderr_reader = thread::spawn(move || read_pipe(stderr));

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(&payload) {
                Ok(()) => {}
                // Child exited without reading; its exit status tells the story
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
                Err(e) => {
                    kill(&mut child);
                    return Err(e.into());
                }
            }
        }

        let status = match wait_with_timeout(&mut child, self.config.timeout)? {
            Some(status) => status,
            None => {
                warn!(task, timeout = ?self.config.timeout, "task timed out, killing");
                kill(&mut child);
                return Err(TaskError::Timeout {
                    task: task.to_string(),
                    timeout: self.config.timeout,
                });
            }
        };

        let stdout = stdout_reader.join().unwrap_or_default();
        let stderr = stderr_reader.join().unwrap_or_default();

        if !status.success() {
            return Err(TaskError::Failed {
                task: task.to_string(),
                status: status.to_string(),
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }

        serde_json::from_slice(&stdout).map_err(|source| TaskError::InvalidOutput {
            task: task.to_string(),
            source,
        })
    }
}

impl TaskExecutor for ProcessTaskExecutor {
    fn update_snapshot(&mut self, args: &UpdateSnapshotArgs) -> TaskResult<bool> {
        self.run_task(UPDATE_SNAPSHOT_TASK, args)
    }

    fn compare_snapshots(&mut self, args: &CompareSnapshotsArgs) -> TaskResult<ComparisonResult> {
        self.run_task(COMPARE_SNAPSHOTS_TASK, args)
    }
}

fn read_pipe(pipe: Option<impl Read>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf);
    }
    buf
}

/// Poll until the child exits or `timeout` passes. `None` means timed out.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    /// Executor running `sh -c <script> visreg-task <taskName>`; the task name is `$1`
    fn shell(script: &str) -> ProcessTaskExecutor {
        ProcessTaskExecutor::new(
            ProcessTaskConfig::new("sh")
                .args(["-c", script, "visreg-task"])
                .timeout(Duration::from_secs(10)),
        )
    }

    fn update_args() -> UpdateSnapshotArgs {
        UpdateSnapshotArgs {
            screenshot_name: "login".to_string(),
            spec_name: "auth.cy.ts".to_string(),
            screenshot_absolute_path: "/shots/login.png".to_string(),
            base_directory: PathBuf::from("snapshots/base"),
        }
    }

    fn compare_args() -> CompareSnapshotsArgs {
        CompareSnapshotsArgs {
            screenshot_name: "login".to_string(),
            error_threshold: 5.0,
            spec_name: "auth.cy.ts".to_string(),
            screenshot_absolute_path: "/shots/login.png".to_string(),
            base_directory: PathBuf::from("snapshots/base"),
            diff_directory: PathBuf::from("snapshots/diff"),
            generate_diff: true,
        }
    }

    #[test]
    fn test_task_name_and_payload_reach_child() {
        let mut tasks = shell(
            r#"[ "$1" = updateSnapshot ] || exit 3
               grep -q '"screenshotAbsolutePath":"/shots/login.png"' && echo true || echo false"#,
        );
        assert!(tasks.update_snapshot(&update_args()).unwrap());
    }

    #[test]
    fn test_compare_result_decoded() {
        let mut tasks = shell(
            r#"cat > /dev/null
               [ "$1" = compareSnapshotsPlugin ] || exit 3
               echo '{"error":{"kind":"thresholdExceeded","message":"mismatch"},"mismatchedPixels":500,"percentage":0.2}'"#,
        );
        let result = tasks.compare_snapshots(&compare_args()).unwrap();
        assert_eq!(result.mismatched_pixels, 500);
        assert_eq!(result.error.unwrap().message, "mismatch");
    }

    #[test]
    fn test_non_zero_exit_is_failure_with_stderr() {
        let mut tasks = shell("cat > /dev/null; echo 'baseline store offline' >&2; exit 2");
        match tasks.update_snapshot(&update_args()) {
            Err(TaskError::Failed { task, stderr, .. }) => {
                assert_eq!(task, UPDATE_SNAPSHOT_TASK);
                assert_eq!(stderr, "baseline store offline");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_garbage_output_is_invalid() {
        let mut tasks = shell("cat > /dev/null; echo 'not json'");
        assert!(matches!(
            tasks.compare_snapshots(&compare_args()),
            Err(TaskError::InvalidOutput { .. })
        ));
    }

    #[test]
    fn test_slow_task_times_out() {
        let mut tasks = ProcessTaskExecutor::new(
            ProcessTaskConfig::new("sh")
                .args(["-c", "sleep 5", "visreg-task"])
                .timeout(Duration::from_millis(200)),
        );
        assert!(matches!(
            tasks.update_snapshot(&update_args()),
            Err(TaskError::Timeout { .. })
        ));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let mut tasks =
            ProcessTaskExecutor::new(ProcessTaskConfig::new("/nonexistent/visreg-task-runner"));
        assert!(matches!(
            tasks.update_snapshot(&update_args()),
            Err(TaskError::Spawn { .. })
        ));
    }

    #[test]
    fn test_env_is_passed_to_child() {
        let mut tasks = ProcessTaskExecutor::new(
            ProcessTaskConfig::new("sh")
                .args(["-c", r#"cat > /dev/null; [ "$VISREG_TEST_FLAG" = on ] && echo true || echo false"#, "visreg-task"])
                .env("VISREG_TEST_FLAG", "on"),
        );
        assert!(tasks.update_snapshot(&update_args()).unwrap());
    }
}
