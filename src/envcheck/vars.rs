//! Build-environment variables.

use super::report::CheckResult;

/// Variables reported by the environment check.
pub const TRACKED_VARS: [&str; 5] = [
    "TORCH_CUDA_ARCH_LIST",
    "CUDA_HOME",
    "CMAKE_ARGS",
    "MAX_JOBS",
    "VLLM_TARGET_DEVICE",
];

/// Whether an arch list includes compute capability 12.0.
pub fn has_sm120(arch_list: &str) -> bool {
    arch_list.contains("12.0")
}

/// Report tracked variables. Informational: always passes.
pub fn check_environment<F>(lookup: F) -> CheckResult
where
    F: Fn(&str) -> Option<String>,
{
    let mut details = Vec::with_capacity(TRACKED_VARS.len() + 1);
    for var in TRACKED_VARS {
        match lookup(var) {
            Some(value) => details.push(format!("set   {var}: {value}")),
            None => details.push(format!("unset {var}")),
        }
    }
    let arch_list = lookup("TORCH_CUDA_ARCH_LIST").unwrap_or_default();
    if has_sm120(&arch_list) {
        details.push("sm_120 architecture included in TORCH_CUDA_ARCH_LIST".into());
    } else {
        details.push("sm_120 architecture missing from TORCH_CUDA_ARCH_LIST (expected '12.0')".into());
    }
    CheckResult::new("environment", true, details)
}
