//! Check results, the aggregate report and the readiness verdict.

use serde::Serialize;

use super::probes::{probe_torch, probe_vllm};
use super::toolchain::check_cuda_toolchain;
use super::vars::{check_environment, has_sm120};
use crate::core::CommandRunner;

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    /// Check name (lowercase).
    pub name: String,
    /// Whether the check passed.
    pub passed: bool,
    /// Human-readable observations.
    pub details: Vec<String>,
}

impl CheckResult {
    /// Build a result.
    pub fn new(name: impl Into<String>, passed: bool, details: Vec<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            details,
        }
    }
}

/// Overall verdict for `sm_120` builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    /// PyTorch works and the arch list includes 12.0.
    Ready,
    /// PyTorch works but the arch list lacks 12.0.
    Partial,
    /// PyTorch does not work.
    NotReady,
}

impl Readiness {
    /// Verdict line.
    pub const fn message(self) -> &'static str {
        match self {
            Self::Ready => "RTX 5090 support ready: PyTorch working and sm_120 in TORCH_CUDA_ARCH_LIST",
            Self::Partial => "PyTorch working but RTX 5090 support incomplete: TORCH_CUDA_ARCH_LIST must include '12.0'",
            Self::NotReady => "RTX 5090 support not ready: PyTorch check failed",
        }
    }
}

/// All check results plus the verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvReport {
    /// Results in execution order.
    pub checks: Vec<CheckResult>,
    /// Value of `TORCH_CUDA_ARCH_LIST` at run time.
    pub arch_list: String,
    /// Verdict.
    pub readiness: Readiness,
}

impl EnvReport {
    /// Aggregate results and derive the verdict.
    pub fn new(checks: Vec<CheckResult>, arch_list: impl Into<String>) -> Self {
        let arch_list = arch_list.into();
        let torch_ok = checks.iter().any(|c| c.name == "pytorch" && c.passed);
        let readiness = match (torch_ok, has_sm120(&arch_list)) {
            (true, true) => Readiness::Ready,
            (true, false) => Readiness::Partial,
            (false, _) => Readiness::NotReady,
        };
        Self {
            checks,
            arch_list,
            readiness,
        }
    }

    /// Number of passed checks.
    pub fn passed(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    /// True when every check passed.
    pub fn all_passed(&self) -> bool {
        self.passed() == self.checks.len()
    }

    /// Text report.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for check in &self.checks {
            let status = if check.passed { "PASS" } else { "FAIL" };
            lines.push(format!("[{status}] {}", check.name.to_uppercase()));
            lines.extend(check.details.iter().map(|d| format!("    {d}")));
        }
        lines.push(format!("Overall: {}/{} checks passed", self.passed(), self.checks.len()));
        lines.push(self.readiness.message().to_string());
        lines
    }
}

/// Run the smoke tests.
///
/// `quick` runs only the PyTorch and vLLM probes. `lookup` reads environment
/// variables.
pub async fn run_checks<R, F>(runner: &R, python: &str, quick: bool, lookup: F) -> EnvReport
where
    R: CommandRunner + ?Sized,
    F: Fn(&str) -> Option<String>,
{
    let mut checks = Vec::with_capacity(4);
    if !quick {
        checks.push(check_environment(&lookup));
        checks.push(check_cuda_toolchain(runner).await);
    }
    checks.push(probe_torch(runner, python).await);
    checks.push(probe_vllm(runner, python).await);
    EnvReport::new(checks, lookup("TORCH_CUDA_ARCH_LIST").unwrap_or_default())
}
