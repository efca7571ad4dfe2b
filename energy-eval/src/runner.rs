//! External process execution with an enforced timeout.
//!
//! Commands run with `tokio::process::Command`, `kill_on_drop(true)` and,
//! on Unix, in their own process group. On timeout the whole group is
//! killed, so descendants (forked JVMs, test binaries) go down with the
//! direct child.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::{Duration, Instant};

/// How a process invocation ended.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// The process ran to completion (any exit code).
    Completed(Output),
    /// The process exceeded the timeout and was killed.
    TimedOut(Duration),
    /// The process could not be started.
    SpawnFailed(String),
}

/// Captured result of one external command.
#[derive(Debug)]
pub struct ProcessRun {
    pub outcome: ProcessOutcome,
    pub duration: Duration,
}

impl ProcessRun {
    /// Whether the process completed with a zero exit status.
    pub fn success(&self) -> bool {
        matches!(&self.outcome, ProcessOutcome::Completed(o) if o.status.success())
    }

    pub fn timed_out(&self) -> bool {
        matches!(self.outcome, ProcessOutcome::TimedOut(_))
    }

    pub fn exit_code(&self) -> Option<i32> {
        match &self.outcome {
            ProcessOutcome::Completed(o) => o.status.code(),
            _ => None,
        }
    }

    /// Stdout of a completed process (lossy UTF-8).
    pub fn stdout(&self) -> String {
        match &self.outcome {
            ProcessOutcome::Completed(o) => String::from_utf8_lossy(&o.stdout).to_string(),
            _ => String::new(),
        }
    }

    /// Stdout followed by stderr, or the reason the process did not complete.
    pub fn combined_output(&self) -> String {
        match &self.outcome {
            ProcessOutcome::Completed(o) => format!(
                "{}{}",
                String::from_utf8_lossy(&o.stdout),
                String::from_utf8_lossy(&o.stderr)
            ),
            ProcessOutcome::TimedOut(limit) => {
                format!("Process timed out after {}s", limit.as_secs())
            }
            ProcessOutcome::SpawnFailed(e) => format!("Failed to execute: {e}"),
        }
    }
}

/// Runs one program with fixed leading arguments in a working directory.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: String,
    base_args: Vec<String>,
    working_dir: PathBuf,
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(
        program: impl Into<String>,
        base_args: Vec<String>,
        working_dir: impl AsRef<Path>,
        timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            base_args,
            working_dir: working_dir.as_ref().to_path_buf(),
            timeout,
        }
    }

    /// Split a shell-style command line into program and arguments.
    pub fn from_command_line(
        command: &str,
        working_dir: impl AsRef<Path>,
        timeout: Duration,
    ) -> Option<Self> {
        let mut words = shlex::split(command)?.into_iter();
        let program = words.next()?;
        Some(Self::new(program, words.collect(), working_dir, timeout))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run with the base arguments followed by `args`.
    pub async fn run<I, S>(&self, args: I) -> ProcessRun
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.base_args)
            .args(args)
            .current_dir(&self.working_dir)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        cmd.stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());

        let start = Instant::now();
        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ProcessRun {
                    outcome: ProcessOutcome::SpawnFailed(e.to_string()),
                    duration: start.elapsed(),
                }
            }
        };
        let pid = child.id();

        let output = child.wait_with_output();
        tokio::pin!(output);
        let outcome = match tokio::time::timeout(self.timeout, &mut output).await {
            Ok(Ok(output)) => ProcessOutcome::Completed(output),
            Ok(Err(e)) => ProcessOutcome::SpawnFailed(e.to_string()),
            Err(_) => {
                kill_process_group(pid, &self.program);
                ProcessOutcome::TimedOut(self.timeout)
            }
        };

        ProcessRun {
            outcome,
            duration: start.elapsed(),
        }
    }
}

/// SIGKILL the process group led by `pid`.
///
/// The child was started with `process_group(0)`, so its pid is the group id.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>, program: &str) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!(program, pid, error = %e, "Failed to kill process group"),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>, _program: &str) {}

/// Truncate to at most `max_bytes`, cutting on a char boundary.
pub fn truncate_output(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...\n[truncated at {} bytes]", &s[..end], s.len())
}
