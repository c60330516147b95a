//! External command execution.
//!
//! Every tool the pipeline drives (cargo via rustup, the dependency walker,
//! strip, candle, light) is run through [`CommandExecutor`], so tests can
//! substitute recorded responses for real processes.

use crate::error::{PackagerError, Result};
use std::io::Read;
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs a command with arguments and returns the captured output.
    ///
    /// A non-zero exit is not an error at this layer; callers decide via
    /// [`ensure_success`].
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::ToolSpawn`] when the program cannot be started
    /// and [`PackagerError::ToolTimedOut`] when it outlives the timeout.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use relpack::command::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor::default();
    /// let output = executor.run("ntldd.exe", &["--version"])?;
    /// assert!(output.status.success());
    /// # Ok::<(), relpack::error::PackagerError>(())
    /// ```
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output>;
}

/// Executes commands on the host system, blocking until each exits.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor {
    timeout: Option<Duration>,
}

impl SystemCommandExecutor {
    /// Create an executor that kills any tool running longer than `timeout`.
    #[must_use]
    pub const fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Return the configured timeout, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        log::debug!("running: {cmd} {}", args.join(" "));

        let mut command = Command::new(cmd);
        command.args(args);

        match self.timeout {
            None => command.output().map_err(|source| PackagerError::ToolSpawn {
                tool: cmd.to_owned(),
                source,
            }),
            Some(timeout) => run_with_timeout(command, cmd, timeout),
        }
    }
}

/// Runs a command, killing it if it does not exit within `timeout`.
///
/// Output pipes are drained on helper threads while waiting; a tool that
/// fills the pipe buffer would otherwise never exit.
fn run_with_timeout(mut command: Command, tool: &str, timeout: Duration) -> Result<Output> {
    let mut child = command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| PackagerError::ToolSpawn {
            tool: tool.to_owned(),
            source,
        })?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    match child.wait_timeout(timeout)? {
        Some(status) => Ok(Output {
            status,
            stdout: collect(stdout)?,
            stderr: collect(stderr)?,
        }),
        None => {
            let _ = child.kill();
            let _ = child.wait();
            Err(PackagerError::ToolTimedOut {
                tool: tool.to_owned(),
                seconds: timeout.as_secs(),
            })
        }
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<std::io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        Ok(buffer)
    })
}

fn collect(handle: Option<JoinHandle<std::io::Result<Vec<u8>>>>) -> Result<Vec<u8>> {
    let Some(handle) = handle else {
        return Ok(Vec::new());
    };
    let bytes = handle
        .join()
        .map_err(|_| std::io::Error::other("output reader thread panicked"))??;
    Ok(bytes)
}

/// Convert an unsuccessful exit into [`PackagerError::ToolFailed`].
///
/// # Errors
///
/// Returns [`PackagerError::ToolFailed`] when `output.status` is not success.
pub fn ensure_success(tool: &str, output: Output) -> Result<Output> {
    if output.status.success() {
        return Ok(output);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(PackagerError::ToolFailed {
        tool: tool.to_owned(),
        status: output.status.to_string(),
        stderr: stderr.trim().to_owned(),
    })
}

/// Run a tool and require a successful exit.
///
/// # Errors
///
/// Propagates executor errors and returns [`PackagerError::ToolFailed`] on a
/// non-zero exit.
pub fn run_checked(executor: &dyn CommandExecutor, cmd: &str, args: &[&str]) -> Result<Output> {
    let output = executor.run(cmd, args)?;
    ensure_success(cmd, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{failure_output, success_output};

    #[test]
    fn ensure_success_passes_through_successful_output() {
        let output = ensure_success("strip.exe", success_output()).expect("success expected");
        assert!(output.status.success());
    }

    #[test]
    fn ensure_success_reports_trimmed_stderr() {
        let err = ensure_success("light.exe", failure_output("  LGHT0001: boom \n"))
            .expect_err("failure expected");
        match err {
            PackagerError::ToolFailed { tool, stderr, .. } => {
                assert_eq!(tool, "light.exe");
                assert_eq!(stderr, "LGHT0001: boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let executor = SystemCommandExecutor::default();
        let err = executor
            .run("relpack-definitely-not-a-real-tool", &[])
            .expect_err("spawn should fail");
        assert!(matches!(err, PackagerError::ToolSpawn { .. }));
    }

    #[test]
    fn missing_program_is_a_spawn_error_with_timeout() {
        let executor = SystemCommandExecutor::with_timeout(Some(Duration::from_secs(5)));
        let err = executor
            .run("relpack-definitely-not-a-real-tool", &[])
            .expect_err("spawn should fail");
        assert!(matches!(err, PackagerError::ToolSpawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn timeout_collects_output_of_fast_command() {
        let executor = SystemCommandExecutor::with_timeout(Some(Duration::from_secs(10)));
        let output = executor
            .run("sh", &["-c", "echo walker-output"])
            .expect("sh should run");
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert_eq!(stdout.trim(), "walker-output");
    }

    #[cfg(unix)]
    #[test]
    fn timeout_kills_slow_command() {
        let executor = SystemCommandExecutor::with_timeout(Some(Duration::from_millis(100)));
        let err = executor
            .run("sh", &["-c", "sleep 5"])
            .expect_err("command should time out");
        assert!(matches!(err, PackagerError::ToolTimedOut { .. }));
    }
}
