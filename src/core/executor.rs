//! Command execution trait and the bash-backed implementation.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use super::ToolError;
use crate::runtime::{run_captured, Invocation};
use crate::util::{tail_chars, MAX_OUTPUT_CHARS};

/// A shell command to run, with its environment overlay, working directory and timeout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandRequest {
    /// Shell command line.
    pub command: String,
    /// Environment overrides layered on the parent environment.
    pub env: BTreeMap<String, String>,
    /// Working directory.
    pub workdir: Option<PathBuf>,
    /// Timeout after which the command is killed.
    pub timeout: Option<Duration>,
}

impl CommandRequest {
    /// Request for a bare command line.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    /// Set the timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Result of running a [`CommandRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// The command exited (successfully or not).
    Exited {
        /// Exit code, `-N` when terminated by signal `N`.
        returncode: Option<i32>,
        /// Wall-clock duration in seconds.
        duration_s: f64,
        /// Tail of stdout.
        stdout: String,
        /// Tail of stderr.
        stderr: String,
    },
    /// The command was killed after exceeding its timeout.
    TimedOut {
        /// Configured timeout.
        timeout: Duration,
    },
}

impl CommandOutcome {
    /// True when the command exited with status 0.
    pub const fn passed(&self) -> bool {
        matches!(self, Self::Exited { returncode: Some(0), .. })
    }
}

/// Abstraction for running shell commands.
///
/// The suite runner and the environment probes only talk to this trait, so
/// tests can substitute a scripted runner for `/bin/bash`.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion (or timeout) and report its outcome.
    ///
    /// Errors are reserved for failures to start the command at all.
    async fn run(&self, request: &CommandRequest) -> Result<CommandOutcome, ToolError>;
}

/// Runs commands through `/bin/bash -c`, capturing output tails.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
}

impl ShellRunner {
    /// Runner using `/bin/bash`.
    pub fn new() -> Self {
        Self::with_shell("/bin/bash")
    }

    /// Runner using a specific shell binary that understands `-c`.
    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self { shell: shell.into() }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, request: &CommandRequest) -> Result<CommandOutcome, ToolError> {
        let mut invocation = Invocation::new(self.shell.clone(), ["-c".to_string(), request.command.clone()])
            .with_env(request.env.clone());
        invocation.workdir.clone_from(&request.workdir);

        tracing::debug!(command = %request.command, workdir = ?request.workdir, "spawning shell command");
        let output = run_captured(&invocation, request.timeout).await?;
        if output.timed_out {
            // A timeout is only possible when one was configured.
            return Ok(CommandOutcome::TimedOut {
                timeout: request.timeout.unwrap_or_default(),
            });
        }
        Ok(CommandOutcome::Exited {
            returncode: output.code,
            duration_s: output.duration.as_secs_f64(),
            stdout: tail_chars(&output.stdout, MAX_OUTPUT_CHARS),
            stderr: tail_chars(&output.stderr, MAX_OUTPUT_CHARS),
        })
    }
}
