//! Host tool subprocess adapter.
//!
//! The host tool owns the interaction log and the model-invocation
//! capability; promem never assumes a fixed log path or speaks to a model
//! API itself. Both capabilities are reached by running the host command as
//! a subprocess with a bounded timeout.

use crate::{Error, Result};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Interval at which a running subprocess is polled for completion.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Adapter for the host command-line tool.
#[derive(Debug, Clone)]
pub struct HostTool {
    /// Command used to invoke the host tool.
    command: String,
    /// Timeout for the `logs path` lookup.
    logs_path_timeout: Duration,
    /// Timeout for a model invocation.
    prompt_timeout: Duration,
}

/// Captured output of a finished subprocess.
struct CommandOutput {
    /// Exit status.
    status: std::process::ExitStatus,
    /// Captured standard output.
    stdout: String,
    /// Captured standard error.
    stderr: String,
}

impl HostTool {
    /// Creates an adapter for the given host command with default timeouts.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        let defaults = crate::config::HostToolConfig::default();
        Self {
            command: command.into(),
            logs_path_timeout: defaults.logs_path_timeout,
            prompt_timeout: defaults.prompt_timeout,
        }
    }

    /// Creates an adapter from configuration.
    #[must_use]
    pub fn from_config(config: &crate::config::HostToolConfig) -> Self {
        Self {
            command: config.command.clone(),
            logs_path_timeout: config.logs_path_timeout,
            prompt_timeout: config.prompt_timeout,
        }
    }

    /// Sets the `logs path` lookup timeout.
    #[must_use]
    pub const fn with_logs_path_timeout(mut self, timeout: Duration) -> Self {
        self.logs_path_timeout = timeout;
        self
    }

    /// Sets the model invocation timeout.
    #[must_use]
    pub const fn with_prompt_timeout(mut self, timeout: Duration) -> Self {
        self.prompt_timeout = timeout;
        self
    }

    /// Resolves the host tool's interaction log location by asking the tool
    /// itself (`<command> logs path`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::HostUnavailable`] when the subprocess cannot be
    /// spawned, exits non-zero, times out, prints nothing usable, or names a
    /// path that does not exist.
    pub fn logs_path(&self) -> Result<PathBuf> {
        let output = run_with_timeout(
            &self.command,
            &["logs", "path"],
            None,
            self.logs_path_timeout,
        )?;

        if !output.status.success() {
            return Err(Error::HostUnavailable(format!(
                "'{} logs path' exited with {}",
                self.command, output.status
            )));
        }

        let path = output.stdout.trim();
        if path.is_empty() {
            return Err(Error::HostUnavailable(format!(
                "'{} logs path' produced no output",
                self.command
            )));
        }

        let path = PathBuf::from(path);
        if !path.exists() {
            return Err(Error::HostUnavailable(format!(
                "log path {} does not exist",
                path.display()
            )));
        }

        Ok(path)
    }

    /// Generates a completion by running `<command> prompt [-m <model>]`
    /// with the prompt on stdin.
    ///
    /// An empty model identifier omits `-m`, leaving model selection to the
    /// host tool's configured default.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HostUnavailable`] on spawn failure or timeout and
    /// [`Error::OperationFailed`] when the tool exits non-zero.
    pub fn complete(&self, model: &str, prompt: &str) -> Result<String> {
        let mut args = vec!["prompt"];
        if !model.is_empty() {
            args.push("-m");
            args.push(model);
        }

        tracing::debug!(command = %self.command, model = %model, "invoking host tool model");

        let output = run_with_timeout(&self.command, &args, Some(prompt), self.prompt_timeout)?;

        if !output.status.success() {
            return Err(Error::OperationFailed {
                operation: "host_prompt".to_string(),
                cause: format!(
                    "exited with {}: {}",
                    output.status,
                    output.stderr.trim()
                ),
            });
        }

        Ok(output.stdout)
    }
}

/// Runs a subprocess to completion with a hard deadline.
///
/// Stdout and stderr are drained on dedicated threads so a chatty child
/// cannot fill a pipe and stall. On timeout the child is killed and reaped;
/// Rust cannot cancel the reader threads, but they finish as soon as the
/// pipes close.
fn run_with_timeout(
    program: &str,
    args: &[&str],
    stdin_data: Option<&str>,
    timeout: Duration,
) -> Result<CommandOutput> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin_data.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::HostUnavailable(format!("failed to spawn '{program}': {e}")))?;

    let stdout_reader = child.stdout.take().map(spawn_pipe_reader);
    let stderr_reader = child.stderr.take().map(spawn_pipe_reader);

    if let Some(data) = stdin_data {
        if let Some(mut stdin) = child.stdin.take() {
            // A write failure here usually means the child exited early;
            // the exit status below tells the real story.
            if let Err(e) = stdin.write_all(data.as_bytes()) {
                tracing::debug!(program = %program, error = %e, "failed to write subprocess stdin");
            }
        }
    }

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::HostUnavailable(format!(
                    "'{program}' timed out after {timeout:?}"
                )));
            },
            Ok(None) => std::thread::sleep(WAIT_POLL_INTERVAL),
            Err(e) => {
                return Err(Error::HostUnavailable(format!(
                    "failed waiting for '{program}': {e}"
                )));
            },
        }
    };

    Ok(CommandOutput {
        status,
        stdout: join_pipe_reader(stdout_reader, program)?,
        stderr: join_pipe_reader(stderr_reader, program)?,
    })
}

/// Drains a child pipe to a string on a background thread.
fn spawn_pipe_reader<R: Read + Send + 'static>(
    mut pipe: R,
) -> std::thread::JoinHandle<std::io::Result<String>> {
    std::thread::spawn(move || {
        let mut buf = String::new();
        pipe.read_to_string(&mut buf)?;
        Ok(buf)
    })
}

/// Collects a reader thread's result once the child has exited.
fn join_pipe_reader(
    reader: Option<std::thread::JoinHandle<std::io::Result<String>>>,
    program: &str,
) -> Result<String> {
    let Some(handle) = reader else {
        return Ok(String::new());
    };
    handle
        .join()
        .map_err(|_| Error::HostUnavailable(format!("'{program}' output reader panicked")))?
        .map_err(|e| Error::HostUnavailable(format!("failed reading '{program}' output: {e}")))
}
