//! Child-process helpers built on `tokio::process`.
//!
//! Two flavours are provided: [`run_captured`] collects stdout/stderr and
//! enforces an optional timeout, [`run_inherited`] streams output straight to
//! the terminal the way an interactive tool would.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;

use crate::core::ToolError;
use crate::util::shell_join;

/// A program invocation: argv plus environment overrides and working directory.
///
/// Environment entries are layered on top of the parent environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    /// Program to execute (looked up on `PATH`).
    pub program: String,
    /// Arguments, not including the program.
    pub args: Vec<String>,
    /// Environment overrides.
    pub env: BTreeMap<String, String>,
    /// Working directory, inherited when `None`.
    pub workdir: Option<PathBuf>,
}

impl Invocation {
    /// Build an invocation from a program and its arguments.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: BTreeMap::new(),
            workdir: None,
        }
    }

    /// Build an invocation from a full argv. Returns `None` for an empty argv.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.iter().cloned()))
    }

    /// Attach environment overrides.
    #[must_use]
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    /// Full argv including the program.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Shell-quoted rendering, suitable for logs and `--print-command`.
    pub fn display_line(&self) -> String {
        shell_join(&self.argv())
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).envs(&self.env);
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

/// Exit code of a finished process; a signal `N` is reported as `-N`.
pub fn exit_code(status: std::process::ExitStatus) -> Option<i32> {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Some(-signal);
        }
    }
    status.code()
}

/// Output of a captured run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    /// Exit code, `-N` when killed by signal `N`; `None` when timed out.
    pub code: Option<i32>,
    /// Captured stdout (lossy UTF-8).
    pub stdout: String,
    /// Captured stderr (lossy UTF-8).
    pub stderr: String,
    /// Wall-clock duration.
    pub duration: Duration,
    /// Whether the timeout fired.
    pub timed_out: bool,
}

impl CapturedOutput {
    /// True when the process exited with status 0.
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Run an invocation with piped output, killing it if `timeout` elapses.
pub async fn run_captured(
    invocation: &Invocation,
    timeout: Option<Duration>,
) -> Result<CapturedOutput, ToolError> {
    let mut cmd = invocation.command();
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();
    let child = cmd.spawn().map_err(|source| ToolError::Spawn {
        program: invocation.program.clone(),
        source,
    })?;

    let waited = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
            Ok(result) => Some(result),
            // Dropping the future drops the child, which kills it.
            Err(_) => None,
        },
        None => Some(child.wait_with_output().await),
    };
    let duration = start.elapsed();

    match waited {
        Some(result) => {
            let output = result.map_err(|source| ToolError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;
            Ok(CapturedOutput {
                code: exit_code(output.status),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                duration,
                timed_out: false,
            })
        }
        None => {
            tracing::warn!(program = %invocation.program, ?duration, "command timed out");
            Ok(CapturedOutput {
                code: None,
                stdout: String::new(),
                stderr: String::new(),
                duration,
                timed_out: true,
            })
        }
    }
}

/// Run an invocation with inherited stdio and return its exit code
/// (`-N` for signal `N`).
pub async fn run_inherited(invocation: &Invocation) -> Result<Option<i32>, ToolError> {
    let mut cmd = invocation.command();
    cmd.stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    let status = cmd
        .status()
        .await
        .map_err(|source| ToolError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;
    Ok(exit_code(status))
}
