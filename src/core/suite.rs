//! Sequential suite execution.

use chrono::Utc;

use super::{CommandOutcome, CommandRecord, CommandRunner, CommandStatus, ToolError};
use crate::config::{SuiteConfig, TestMatrix};
use crate::util::record_timestamp;

/// Runs suites command by command and turns outcomes into [`CommandRecord`]s.
pub struct SuiteRunner<R> {
    runner: R,
    profile: String,
}

impl<R: CommandRunner> SuiteRunner<R> {
    /// Create a runner tagging records with `profile`.
    pub fn new(runner: R, profile: impl Into<String>) -> Self {
        Self {
            runner,
            profile: profile.into(),
        }
    }

    /// Profile name recorded in every result.
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Run every command of a suite in order.
    ///
    /// A failing command does not stop the suite; only a command that cannot
    /// be started at all aborts the run.
    pub async fn run_suite(
        &self,
        suite_name: &str,
        suite: &SuiteConfig,
    ) -> Result<Vec<CommandRecord>, ToolError> {
        let mut records = Vec::with_capacity(suite.commands.len());
        for spec in &suite.commands {
            println!("[suite:{suite_name}] running '{}' -> {}", spec.name, spec.cmd);
            let timestamp = record_timestamp(Utc::now());
            let outcome = self.runner.run(&spec.to_request()).await?;

            let record = match outcome {
                CommandOutcome::Exited {
                    returncode,
                    duration_s,
                    stdout,
                    stderr,
                } => CommandRecord {
                    profile: self.profile.clone(),
                    suite: suite_name.to_string(),
                    name: spec.name.clone(),
                    command: spec.cmd.clone(),
                    timestamp,
                    status: if returncode == Some(0) {
                        CommandStatus::Passed
                    } else {
                        CommandStatus::Failed
                    },
                    returncode,
                    duration_s,
                    stdout,
                    stderr,
                },
                CommandOutcome::TimedOut { timeout } => CommandRecord {
                    profile: self.profile.clone(),
                    suite: suite_name.to_string(),
                    name: spec.name.clone(),
                    command: spec.cmd.clone(),
                    timestamp,
                    status: CommandStatus::Timeout,
                    returncode: None,
                    duration_s: timeout.as_secs_f64(),
                    stdout: String::new(),
                    stderr: format!("Command timed out after {}s", timeout.as_secs()),
                },
            };
            println!(
                "[suite:{suite_name}] {} -> {} ({:.2}s)",
                record.name, record.status, record.duration_s
            );
            tracing::debug!(
                suite = suite_name,
                command = %record.name,
                returncode = ?record.returncode,
                "command finished"
            );
            records.push(record);
        }
        Ok(records)
    }

    /// Validate every selected suite, then run them in order.
    ///
    /// No command runs unless every selected suite is valid.
    pub async fn run_selected(
        &self,
        matrix: &TestMatrix,
        suites: &[String],
    ) -> Result<Vec<CommandRecord>, ToolError> {
        let configs = suites
            .iter()
            .map(|name| matrix.suite(name).map(|cfg| (name.as_str(), cfg)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::new();
        for (name, cfg) in configs {
            records.extend(self.run_suite(name, &cfg).await?);
        }
        Ok(records)
    }
}
