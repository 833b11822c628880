//! External process execution
//!
//! Every build, interop and publish step is an opaque subprocess. The runner
//! launches it, either streams or captures its output, keeps a heartbeat in
//! the debug log while it is alive and turns a non-zero exit into a
//! [`RunnerError`].
//!
//! Command lines are split on whitespace only. Quoting is not understood, so
//! an argument containing spaces cannot be expressed.

use async_trait::async_trait;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{Level, debug, error};

use crate::error::RunnerError;

/// How the output of a process is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Inherit the orchestrator's standard streams
    Piped,
    /// Buffer stdout and stderr until the process exits
    Captured,
}

/// Runs external commands
///
/// Implemented by [`ProcessRunner`] for real subprocesses; pipelines only
/// depend on this trait so tests can substitute a recording executor.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Runs `command_line` in `dir`
    ///
    /// # Returns
    /// Captured stdout, followed by a newline and stderr when stderr is not
    /// empty. Always empty in [`OutputMode::Piped`].
    async fn run(
        &self,
        command_line: &str,
        dir: &Path,
        mode: OutputMode,
    ) -> Result<String, RunnerError>;
}

/// Subprocess-backed [`CommandExecutor`]
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    heartbeat_interval: Duration,
}

impl ProcessRunner {
    pub fn new(heartbeat_interval: Duration) -> Self {
        Self { heartbeat_interval }
    }

    /// Waits for `child`, logging a heartbeat every `heartbeat_interval`
    ///
    /// The heartbeat is part of the same future as the wait, so it ends when
    /// the process exits or when the caller drops the future. Only logged when
    /// debug logging is enabled.
    async fn wait_with_heartbeat(
        &self,
        child: Child,
        command_line: &str,
        dir: &Path,
    ) -> std::io::Result<Output> {
        let wait = child.wait_with_output();
        if !tracing::enabled!(Level::DEBUG) {
            return wait.await;
        }

        tokio::pin!(wait);
        let mut ticker = tokio::time::interval(self.heartbeat_interval);

        loop {
            tokio::select! {
                biased;
                waited = &mut wait => return waited,
                _ = ticker.tick() => {
                    debug!("Process '{}' is still running in {}", command_line, dir.display());
                }
            }
        }
    }

    fn fail(&self, command_line: &str, dir: &Path, exit_code: i32, body: String) -> RunnerError {
        let err = RunnerError::new(command_line, dir, exit_code, body);
        error!(
            "Failed to run command: '{}' in {}; exit code {}\n{}",
            err.command,
            err.dir.display(),
            err.exit_code,
            err.body
        );
        err
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl CommandExecutor for ProcessRunner {
    async fn run(
        &self,
        command_line: &str,
        dir: &Path,
        mode: OutputMode,
    ) -> Result<String, RunnerError> {
        let parts = split_command(command_line);
        let Some((program, args)) = parts.split_first() else {
            return Err(self.fail(command_line, dir, -1, "Empty command".to_string()));
        };

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        match mode {
            OutputMode::Piped => command.stdout(Stdio::inherit()).stderr(Stdio::inherit()),
            OutputMode::Captured => command.stdout(Stdio::piped()).stderr(Stdio::piped()),
        };

        let child = command.spawn().map_err(|e| {
            self.fail(
                command_line,
                dir,
                -1,
                format!("Failed to start process: {}", e),
            )
        })?;

        let waited = self.wait_with_heartbeat(child, command_line, dir).await;
        debug!("Process '{}' finished in {}", command_line, dir.display());

        let output = waited.map_err(|e| {
            self.fail(
                command_line,
                dir,
                -1,
                format!("Failed to wait for process: {}", e),
            )
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            let exit_code = output.status.code().unwrap_or(-1);
            let body = error_body(&stdout, &stderr, exit_code);
            return Err(self.fail(command_line, dir, exit_code, body));
        }

        if stderr.is_empty() {
            Ok(stdout)
        } else {
            Ok(format!("{}\n{}", stdout, stderr))
        }
    }
}

/// Splits a command line into program and arguments on whitespace
pub fn split_command(command_line: &str) -> Vec<&str> {
    command_line.split_whitespace().collect()
}

/// Builds the error body of a failed process from its output
pub fn error_body(stdout: &str, stderr: &str, exit_code: i32) -> String {
    match (stdout.is_empty(), stderr.is_empty()) {
        (false, false) => format!("STDOUT: {}\nSTDERR: {}", stdout, stderr),
        (true, false) => stderr.to_string(),
        (false, true) => stdout.to_string(),
        (true, true) => format!("No output; Exit Code {}", exit_code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::LogCapture;

    const HEARTBEAT: &str = "is still running";

    #[test]
    fn test_split_command() {
        assert_eq!(
            split_command("  cmake -S .\t-B build \n"),
            vec!["cmake", "-S", ".", "-B", "build"]
        );
        // Quotes are not interpreted
        assert_eq!(
            split_command(r#"cmake -G "MinGW Makefiles""#),
            vec!["cmake", "-G", "\"MinGW", "Makefiles\""]
        );
        assert!(split_command("   ").is_empty());
    }

    #[test]
    fn test_error_body() {
        assert_eq!(error_body("out", "", 1), "out");
        assert_eq!(error_body("", "err", 1), "err");
        assert_eq!(error_body("out", "err", 2), "STDOUT: out\nSTDERR: err");
        assert_eq!(error_body("", "", 3), "No output; Exit Code 3");
    }

    #[tokio::test]
    async fn test_empty_command_fails() {
        let runner = ProcessRunner::default();
        let err = runner
            .run("   ", Path::new("."), OutputMode::Captured)
            .await
            .unwrap_err();
        assert_eq!(err.exit_code, -1);
    }

    #[tokio::test]
    async fn test_missing_executable_is_a_failure() {
        let runner = ProcessRunner::default();
        let err = runner
            .run(
                "kncr-definitely-not-a-real-binary --help",
                Path::new("."),
                OutputMode::Captured,
            )
            .await
            .unwrap_err();

        assert_eq!(err.exit_code, -1);
        assert!(err.body.contains("Failed to start process"));
        assert_eq!(err.command, "kncr-definitely-not-a-real-binary --help");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captured_stdout() {
        let temp = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::default();
        let output = runner
            .run("echo hello world", temp.path(), OutputMode::Captured)
            .await
            .unwrap();

        assert_eq!(output, "hello world\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_in_working_directory() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("marker.txt"), "x").unwrap();

        let runner = ProcessRunner::default();
        let output = runner
            .run("ls", temp.path(), OutputMode::Captured)
            .await
            .unwrap();

        assert!(output.contains("marker.txt"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_with_stdout_only() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("fail.sh"), "echo broken\nexit 1\n").unwrap();

        let runner = ProcessRunner::default();
        let err = runner
            .run("sh fail.sh", temp.path(), OutputMode::Captured)
            .await
            .unwrap_err();

        assert_eq!(err.exit_code, 1);
        assert_eq!(err.body, "broken\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_without_output() {
        let temp = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::default();
        let err = runner
            .run("false", temp.path(), OutputMode::Captured)
            .await
            .unwrap_err();

        assert_eq!(err.exit_code, 1);
        assert_eq!(err.body, "No output; Exit Code 1");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_appends_stderr() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("warn.sh"), "echo done\necho careful >&2\n").unwrap();

        let runner = ProcessRunner::default();
        let output = runner
            .run("sh warn.sh", temp.path(), OutputMode::Captured)
            .await
            .unwrap();

        assert_eq!(output, "done\n\ncareful\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_piped_returns_empty_output() {
        let temp = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::default();
        let output = runner
            .run("true", temp.path(), OutputMode::Piped)
            .await
            .unwrap();

        assert!(output.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_heartbeat_while_alive_and_stops_at_exit() {
        let logs = LogCapture::default();
        let _guard = logs.install();
        let temp = tempfile::tempdir().unwrap();

        let runner = ProcessRunner::new(Duration::from_millis(20));
        runner
            .run("sleep 0.2", temp.path(), OutputMode::Captured)
            .await
            .unwrap();

        let at_exit = logs.lines_with(HEARTBEAT).len();
        assert!(at_exit >= 2, "expected heartbeats, got {}", at_exit);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(logs.lines_with(HEARTBEAT).len(), at_exit);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_heartbeat_stops_when_run_is_cancelled() {
        let logs = LogCapture::default();
        let _guard = logs.install();
        let temp = tempfile::tempdir().unwrap();

        let runner = ProcessRunner::new(Duration::from_millis(20));
        let cancelled = tokio::time::timeout(
            Duration::from_millis(60),
            runner.run("sleep 5", temp.path(), OutputMode::Captured),
        )
        .await;
        assert!(cancelled.is_err());

        let at_cancel = logs.lines_with(HEARTBEAT).len();
        assert!(at_cancel >= 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(logs.lines_with(HEARTBEAT).len(), at_cancel);
    }
}
