//! Result records produced by the suite runner, plus output-path resolution
//! and run summaries.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ToolError;
use crate::util::file_stamp;

/// Final status of one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    /// Exit status 0.
    Passed,
    /// Non-zero exit status or killed by a signal.
    Failed,
    /// Killed after exceeding its timeout.
    Timeout,
}

impl CommandStatus {
    /// Lowercase label used in JSON and reports.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One executed command, as written to the results JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    /// Profile the run was started with.
    pub profile: String,
    /// Suite name.
    pub suite: String,
    /// Command name.
    pub name: String,
    /// Shell command line.
    pub command: String,
    /// Start time, ISO-8601 UTC.
    pub timestamp: String,
    /// Outcome.
    pub status: CommandStatus,
    /// Exit code (`-N` for signal `N`); null on timeout.
    pub returncode: Option<i32>,
    /// Duration in seconds (the timeout value for timed-out commands).
    pub duration_s: f64,
    /// Tail of stdout.
    pub stdout: String,
    /// Tail of stderr.
    pub stderr: String,
}

/// Render an optional return code the way reports print it.
pub fn format_returncode(code: Option<i64>) -> String {
    code.map_or_else(|| "None".to_string(), |c| c.to_string())
}

/// Decide where results are written.
///
/// An existing directory gets a timestamped file inside it, any other
/// explicit path is used as-is, and no path means a timestamped file in
/// `results_dir`.
pub fn resolve_output_path(
    output: Option<&Path>,
    profile: &str,
    results_dir: &Path,
    now: DateTime<Utc>,
) -> PathBuf {
    let file_name = format!("{}-{profile}.json", file_stamp(now));
    match output {
        Some(path) if path.is_dir() => path.join(file_name),
        Some(path) => path.to_path_buf(),
        None => results_dir.join(file_name),
    }
}

/// Write records as pretty-printed JSON, creating parent directories.
pub fn write_results(path: &Path, records: &[CommandRecord]) -> Result<(), ToolError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ToolError::io(parent, e))?;
    }
    let body = serde_json::to_string_pretty(records).map_err(|source| ToolError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, body).map_err(|e| ToolError::io(path, e))?;
    tracing::debug!(path = %path.display(), records = records.len(), "results written");
    Ok(())
}

/// Aggregate view of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Number of records.
    pub total: usize,
    /// Records that did not pass.
    pub failures: Vec<CommandRecord>,
}

impl RunSummary {
    /// Summarise a set of records.
    pub fn from_records(records: &[CommandRecord]) -> Self {
        Self {
            total: records.len(),
            failures: records
                .iter()
                .filter(|r| r.status != CommandStatus::Passed)
                .cloned()
                .collect(),
        }
    }

    /// True when every record passed.
    pub fn all_passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// Report lines: the totals, then one line per failure.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "[summary] total={} failures={}",
            self.total,
            self.failures.len()
        )];
        lines.extend(self.failures.iter().map(|item| {
            format!(
                "[summary] {}::{} [{}] rc={}",
                item.suite,
                item.name,
                item.status,
                format_returncode(item.returncode.map(i64::from))
            )
        }));
        lines
    }
}
