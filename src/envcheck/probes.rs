//! Python probes for PyTorch and vLLM.
//!
//! Each probe is a small script that prints one JSON object on its last
//! stdout line. Probes run from the temp directory so a source checkout in
//! the working directory cannot shadow the installed package.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::report::CheckResult;
use crate::core::{CommandOutcome, CommandRequest, CommandRunner, ToolError};
use crate::util::shell_join;

const TORCH_SCRIPT: &str = include_str!("scripts/torch_probe.py");
const VLLM_SCRIPT: &str = include_str!("scripts/vllm_probe.py");

/// Probe timeout; importing vLLM can be slow on a cold cache.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(300);

/// GPU details reported by the PyTorch probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeviceInfo {
    /// Device name.
    pub name: String,
    /// Total memory in GiB.
    #[serde(default)]
    pub total_memory_gib: u64,
    /// Compute capability `[major, minor]`.
    #[serde(default)]
    pub capability: Vec<u32>,
}

/// PyTorch probe output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TorchProbe {
    /// Import succeeded.
    pub ok: bool,
    /// Import error.
    pub error: Option<String>,
    /// `torch.__version__`.
    pub version: Option<String>,
    /// `torch.version.cuda`.
    pub cuda_version: Option<String>,
    /// `torch.cuda.is_available()`.
    pub cuda_available: bool,
    /// Visible device count.
    pub device_count: u32,
    /// First device.
    pub device: Option<DeviceInfo>,
    /// Error querying the first device.
    pub device_error: Option<String>,
    /// CUDA arch flags the extension builder would use.
    pub arch_flags: Option<Vec<String>>,
    /// Error querying arch flags.
    pub arch_flags_error: Option<String>,
}

/// vLLM probe output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VllmProbe {
    /// Import succeeded.
    pub ok: bool,
    /// Import error.
    pub error: Option<String>,
    /// `vllm.__version__`.
    pub version: Option<String>,
    /// Package location.
    pub location: Option<String>,
    /// `LLM` and `SamplingParams` importable.
    pub core_classes: bool,
    /// Error importing the core classes.
    pub core_classes_error: Option<String>,
    /// Compiled CUDA ops importable.
    pub cuda_ops: bool,
    /// Error importing CUDA ops.
    pub cuda_ops_error: Option<String>,
}

/// Parse the JSON object on the last `{`-prefixed stdout line.
pub fn parse_probe_output<T: DeserializeOwned>(stdout: &str) -> Result<T, ToolError> {
    let line = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| line.starts_with('{'))
        .ok_or_else(|| ToolError::Config("probe produced no JSON output".into()))?;
    serde_json::from_str(line).map_err(|err| ToolError::Config(format!("invalid probe output: {err}")))
}

async fn run_probe<T, R>(runner: &R, python: &str, script: &str) -> Result<T, String>
where
    T: DeserializeOwned,
    R: CommandRunner + ?Sized,
{
    let mut request = CommandRequest::new(shell_join(&[python, "-c", script])).with_timeout(PROBE_TIMEOUT);
    request.workdir = Some(std::env::temp_dir());
    match runner.run(&request).await {
        Ok(CommandOutcome::Exited {
            returncode: Some(0),
            stdout,
            ..
        }) => parse_probe_output(&stdout).map_err(|err| err.to_string()),
        Ok(CommandOutcome::Exited { returncode, stderr, .. }) => {
            let code = returncode.map_or_else(|| "signal".to_string(), |c| c.to_string());
            Err(format!("{python} exited with {code}: {}", stderr.trim()))
        }
        Ok(CommandOutcome::TimedOut { timeout }) => Err(format!("probe timed out after {}s", timeout.as_secs())),
        Err(err) => Err(err.to_string()),
    }
}

/// Judge PyTorch probe output. Passes when torch imports.
pub fn evaluate_torch(probe: &TorchProbe) -> CheckResult {
    let mut details = Vec::new();
    if !probe.ok {
        details.push(format!(
            "PyTorch import failed: {}",
            probe.error.as_deref().unwrap_or("unknown error")
        ));
        return CheckResult::new("pytorch", false, details);
    }
    details.push(format!("Version: {}", probe.version.as_deref().unwrap_or("unknown")));
    details.push(format!("CUDA version: {}", probe.cuda_version.as_deref().unwrap_or("None")));
    details.push(format!("CUDA available: {}", probe.cuda_available));
    if probe.cuda_available {
        details.push(format!("CUDA device count: {}", probe.device_count));
        if let Some(device) = &probe.device {
            details.push(format!("GPU: {} ({} GiB)", device.name, device.total_memory_gib));
            let major = device.capability.first().copied().unwrap_or(0);
            let minor = device.capability.get(1).copied().unwrap_or(0);
            details.push(format!("Compute capability: {major}.{minor}"));
            if device.name.contains("RTX 5090") {
                if major >= 12 {
                    details.push("RTX 5090 detected, compute capability confirmed".into());
                } else {
                    details.push(format!("RTX 5090 detected with unexpected compute capability {major}.{minor}"));
                }
            }
        }
        if let Some(err) = &probe.device_error {
            details.push(format!("GPU details unavailable: {err}"));
        }
    } else {
        details.push("CUDA not available in PyTorch".into());
    }
    match (&probe.arch_flags, &probe.arch_flags_error) {
        (Some(flags), _) => {
            details.push(format!("CUDA arch flags: {}", flags.join(" ")));
            if flags.iter().any(|flag| flag.contains("120")) {
                details.push("sm_120 architecture flags detected".into());
            } else {
                details.push("sm_120 architecture flags missing".into());
            }
        }
        (None, Some(err)) => details.push(format!("Could not check CUDA arch flags: {err}")),
        (None, None) => {}
    }
    CheckResult::new("pytorch", true, details)
}

/// Judge vLLM probe output. Passes when vllm imports; missing CUDA ops only
/// warn.
pub fn evaluate_vllm(probe: &VllmProbe) -> CheckResult {
    let mut details = Vec::new();
    if !probe.ok {
        details.push(format!("vLLM import failed: {}", probe.error.as_deref().unwrap_or("unknown error")));
        return CheckResult::new("vllm", false, details);
    }
    details.push(format!("Version: {}", probe.version.as_deref().unwrap_or("unknown")));
    if let Some(location) = &probe.location {
        details.push(format!("Location: {location}"));
    }
    if probe.core_classes {
        details.push("LLM and SamplingParams importable".into());
    } else {
        details.push(format!(
            "warning: core classes unavailable: {}",
            probe.core_classes_error.as_deref().unwrap_or("unknown error")
        ));
    }
    if probe.cuda_ops {
        details.push("CUDA ops importable".into());
    } else {
        details.push(format!(
            "warning: CUDA ops unavailable: {}",
            probe.cuda_ops_error.as_deref().unwrap_or("unknown error")
        ));
    }
    CheckResult::new("vllm", true, details)
}

/// Run the PyTorch probe.
pub async fn probe_torch<R: CommandRunner + ?Sized>(runner: &R, python: &str) -> CheckResult {
    match run_probe::<TorchProbe, _>(runner, python, TORCH_SCRIPT).await {
        Ok(probe) => evaluate_torch(&probe),
        Err(reason) => CheckResult::new("pytorch", false, vec![format!("PyTorch probe failed: {reason}")]),
    }
}

/// Run the vLLM probe.
pub async fn probe_vllm<R: CommandRunner + ?Sized>(runner: &R, python: &str) -> CheckResult {
    match run_probe::<VllmProbe, _>(runner, python, VLLM_SCRIPT).await {
        Ok(probe) => evaluate_vllm(&probe),
        Err(reason) => CheckResult::new("vllm", false, vec![format!("vLLM probe failed: {reason}")]),
    }
}
