//! CUDA toolchain presence (`nvcc`, `nvidia-smi`).

use std::time::Duration;

use tracing::debug;

use super::report::CheckResult;
use crate::core::{CommandOutcome, CommandRequest, CommandRunner};

/// Per-command timeout.
pub const TOOLCHAIN_TIMEOUT: Duration = Duration::from_secs(30);

async fn probe<R: CommandRunner + ?Sized>(runner: &R, command: &str, details: &mut Vec<String>) -> bool {
    let request = CommandRequest::new(command).with_timeout(TOOLCHAIN_TIMEOUT);
    match runner.run(&request).await {
        Ok(CommandOutcome::Exited {
            returncode, stdout, stderr, ..
        }) => {
            let ok = returncode == Some(0);
            let summary = stdout.lines().rfind(|line| !line.trim().is_empty()).unwrap_or("").trim();
            if ok {
                details.push(format!("{command}: ok {summary}").trim_end().to_string());
            } else {
                debug!(command, stderr = %stderr, "toolchain probe failed");
                let reason = stderr.lines().next().unwrap_or("").trim();
                let code = returncode.map_or_else(|| "signal".to_string(), |c| c.to_string());
                details.push(format!("{command}: exit {code} {reason}").trim_end().to_string());
            }
            ok
        }
        Ok(CommandOutcome::TimedOut { timeout }) => {
            details.push(format!("{command}: timed out after {}s", timeout.as_secs()));
            false
        }
        Err(err) => {
            details.push(format!("{command}: {err}"));
            false
        }
    }
}

/// Passes when both `nvcc --version` and `nvidia-smi` succeed.
pub async fn check_cuda_toolchain<R: CommandRunner + ?Sized>(runner: &R) -> CheckResult {
    let mut details = Vec::new();
    let nvcc = probe(runner, "nvcc --version", &mut details).await;
    let smi = probe(runner, "nvidia-smi", &mut details).await;
    CheckResult::new("cuda", nvcc && smi, details)
}
