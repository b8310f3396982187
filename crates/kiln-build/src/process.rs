//! External command execution
//!
//! Every toolchain invocation is one command line run synchronously through
//! the platform shell. [`CommandRunner`] is the spawning seam (replaced by a
//! recording fake in tests); [`ProcessRunner`] wraps a runner and writes every
//! command with its output to the build log.

use crate::error::{BuildError, BuildResult};
use crate::log::BuildLog;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Captured result of one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when terminated by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl ProcessOutput {
    /// Successful exit with no output
    pub fn success_empty() -> Self {
        Self {
            status: Some(0),
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::ZERO,
        }
    }

    /// Failed exit with the given diagnostics on stderr
    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
            duration: Duration::ZERO,
        }
    }

    /// Check if the command succeeded
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Captured output, stdout first, verbatim
    pub fn diagnostics(&self) -> String {
        let mut out = String::new();
        for stream in [&self.stdout, &self.stderr] {
            let stream = stream.trim_end();
            if !stream.is_empty() {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(stream);
            }
        }
        if out.is_empty() {
            out = format!("(no output, {})", self.status_text());
        }
        out
    }

    /// "exit status N" or "terminated by signal"
    pub fn status_text(&self) -> String {
        match self.status {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Runs one command line to completion
pub trait CommandRunner: Send + Sync {
    /// Run `command` in `cwd`; a non-zero exit is an `Ok` output, only a
    /// failure to start is an error
    fn run(&self, command: &str, cwd: &Path) -> BuildResult<ProcessOutput>;
}

/// Runs commands through `sh -c` (or `cmd /S /C` on Windows)
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

#[cfg(not(windows))]
fn shell_command(line: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(line);
    cmd
}

#[cfg(windows)]
fn shell_command(line: &str) -> Command {
    use std::os::windows::process::CommandExt;
    let mut cmd = Command::new("cmd");
    cmd.raw_arg(format!("/S /C \"{}\"", line));
    cmd
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str, cwd: &Path) -> BuildResult<ProcessOutput> {
        let start = Instant::now();

        let output = shell_command(command)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| BuildError::SpawnFailed {
                command: command.to_string(),
                error: e,
            })?;

        Ok(ProcessOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration: start.elapsed(),
        })
    }
}

/// Runs commands and records them in the build log
#[derive(Clone)]
pub struct ProcessRunner {
    runner: Arc<dyn CommandRunner>,
    log: Option<Arc<BuildLog>>,
}

impl ProcessRunner {
    /// Process runner backed by the system shell, without a log
    pub fn new() -> Self {
        Self::with_runner(Arc::new(ShellRunner))
    }

    /// Process runner backed by `runner`
    pub fn with_runner(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner, log: None }
    }

    /// Record commands in `log`
    pub fn with_log(mut self, log: Arc<BuildLog>) -> Self {
        self.log = Some(log);
        self
    }

    /// Run a command and log it whatever the outcome
    pub fn run(&self, command: &str, cwd: &Path) -> BuildResult<ProcessOutput> {
        tracing::debug!(command, "running");
        let result = self.runner.run(command, cwd);

        if let Some(log) = &self.log {
            match &result {
                Ok(output) => log.record(command, output),
                Err(BuildError::SpawnFailed { error, .. }) => log.record_spawn_failure(command, error),
                Err(_) => {}
            }
        }

        if let Ok(output) = &result {
            if !output.success() {
                tracing::debug!(command, status = %output.status_text(), "command failed");
            }
        }
        result
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRunner")
            .field("log", &self.log.as_ref().map(|l| l.path().to_path_buf()))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_joins_streams() {
        let output = ProcessOutput {
            status: Some(2),
            stdout: "note: building\n".to_string(),
            stderr: "error: bad\n".to_string(),
            duration: Duration::ZERO,
        };
        assert!(!output.success());
        assert_eq!(output.diagnostics(), "note: building\nerror: bad");
    }

    #[test]
    fn test_diagnostics_without_output() {
        assert_eq!(ProcessOutput::failure(3, "").diagnostics(), "(no output, exit status 3)");
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_runner_captures_output_and_status() {
        let dir = tempfile::tempdir().unwrap();
        let output = ShellRunner
            .run("echo out; echo err >&2; exit 4", dir.path())
            .unwrap();
        assert_eq!(output.status, Some(4));
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_runner_uses_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
        let output = ShellRunner.run("cat marker.txt", dir.path()).unwrap();
        assert!(output.success());
        assert_eq!(output.stdout, "here");
    }

    #[cfg(unix)]
    #[test]
    fn test_process_runner_logs_failures_too() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(BuildLog::in_build_dir(dir.path()).unwrap());
        let runner = ProcessRunner::new().with_log(Arc::clone(&log));

        let output = runner.run("echo broken >&2; exit 1", dir.path()).unwrap();
        assert!(!output.success());

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert!(content.contains("$ echo broken >&2; exit 1"));
        assert!(content.contains("broken"));
    }
}
