//! Blocking process execution for external build tools (`javac`, `aapt`).
//!
//! Timeouts are a property of the [`ExecConfig`] a caller passes in. The
//! engine itself never sets one; the orchestration layer decides.

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use wait_timeout::ChildExt;

/// How to run an external tool.
#[derive(Debug, Clone, Default)]
pub struct ExecConfig {
    /// Kill the tool after this long. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Stream the tool's output to our stdout/stderr instead of capturing it.
    pub inherit_output: bool,
}

impl ExecConfig {
    /// Set a timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Stream output to the terminal instead of capturing it.
    pub fn inherit_output(mut self, inherit: bool) -> Self {
        self.inherit_output = inherit;
        self
    }
}

/// Failure to run a tool at all (as opposed to the tool reporting failure).
#[derive(Error, Debug)]
pub enum ExecError {
    /// The program is not on `PATH`.
    #[error("'{program}' not found")]
    NotFound {
        /// Program name.
        program: String,
    },

    /// Spawning failed for another reason.
    #[error("Failed to spawn '{program}'")]
    Spawn {
        /// Program name.
        program: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the child failed.
    #[error("Failed waiting for '{program}'")]
    Wait {
        /// Program name.
        program: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The configured timeout elapsed; the child was killed.
    #[error("'{program}' timed out after {}s", timeout.as_secs_f64())]
    TimedOut {
        /// Program name.
        program: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },
}

/// Result of a finished tool run.
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    /// Exit code, `None` if the process was terminated by a signal.
    pub code: Option<i32>,
    /// Captured stdout (empty when output is inherited).
    pub stdout: String,
    /// Captured stderr (empty when output is inherited).
    pub stderr: String,
}

impl ExecOutput {
    /// Whether the tool exited with status zero.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Run `cmd` to completion under `config`.
///
/// # Errors
///
/// Returns an [`ExecError`] if the program cannot be spawned or waited on,
/// or if it exceeds the configured timeout. A non-zero exit is *not* an
/// error; inspect [`ExecOutput::success`].
pub fn run(mut cmd: Command, config: &ExecConfig) -> Result<ExecOutput, ExecError> {
    let program = cmd.get_program().to_string_lossy().into_owned();

    cmd.stdin(Stdio::null());
    if config.inherit_output {
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    } else {
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    }

    debug!(command = ?cmd, "spawning");
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ExecError::NotFound { program });
        }
        Err(source) => return Err(ExecError::Spawn { program, source }),
    };

    // Drain pipes on their own threads so a chatty tool cannot block on a
    // full pipe while we wait for it.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let status = match config.timeout {
        Some(timeout) => match child.wait_timeout(timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ExecError::TimedOut { program, timeout });
            }
            Err(source) => return Err(ExecError::Wait { program, source }),
        },
        None => child
            .wait()
            .map_err(|source| ExecError::Wait { program, source })?,
    };

    Ok(ExecOutput {
        code: status.code(),
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        let _ = pipe.read_to_end(&mut bytes);
        String::from_utf8_lossy(&bytes).into_owned()
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
