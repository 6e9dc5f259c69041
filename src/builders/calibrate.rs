//! Commands of the KV-cache calibration pipeline.

use std::collections::BTreeMap;
use std::path::Path;

use crate::modelscope::CalibrationPlan;
use crate::runtime::Invocation;

/// Upstream llm-compressor repository.
pub const LLM_COMPRESSOR_URL: &str = "https://github.com/vllm-project/llm-compressor";

/// Pinned packages installed before calibration.
pub const PINNED_DEPENDENCIES: [&str; 4] = [
    "loguru>=0.7,<1",
    "datasets>=4.0.0,<5",
    "compressed-tensors>=0.12.3a2,<0.13",
    "accelerate>=0.32,<1",
];

const DEPS_CHECK_SCRIPT: &str = include_str!("../modelscope/scripts/deps_check.py");

/// One step of dependency preparation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyStep {
    /// Command to run.
    pub invocation: Invocation,
    /// Whether a non-zero exit aborts calibration.
    pub checked: bool,
}

/// Shallow clone of llm-compressor into `repo`.
pub fn build_clone_command(repo: &Path) -> Invocation {
    Invocation::new(
        "git",
        [
            "clone".to_string(),
            "--depth".to_string(),
            "1".to_string(),
            LLM_COMPRESSOR_URL.to_string(),
            repo.display().to_string(),
        ],
    )
}

/// Dependency preparation: drop `compressed-tensors` (failure ignored),
/// install the pinned set, install the checkout editable, print versions.
pub fn build_dependency_steps(python: &str, repo: &Path) -> Vec<DependencyStep> {
    let pip = |args: Vec<String>| {
        Invocation::new(python, ["-m".to_string(), "pip".to_string()].into_iter().chain(args))
    };
    let strings = |items: &[&str]| items.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();

    let mut install = strings(&["install", "--no-cache-dir", "-q", "--upgrade", "--pre"]);
    install.extend(strings(&PINNED_DEPENDENCIES));
    let mut editable = strings(&["install", "--no-cache-dir", "-q", "--no-deps", "-e"]);
    editable.push(repo.display().to_string());

    vec![
        DependencyStep {
            invocation: pip(strings(&["uninstall", "-y", "compressed-tensors"])),
            checked: false,
        },
        DependencyStep {
            invocation: pip(install),
            checked: true,
        },
        DependencyStep {
            invocation: pip(editable),
            checked: true,
        },
        DependencyStep {
            invocation: Invocation::new(python, ["-c", DEPS_CHECK_SCRIPT]),
            checked: true,
        },
    ]
}

/// Runner invocation for a calibration plan.
///
/// `env` is the complete child environment; the runner-specific variables
/// (`MODEL_DIR`, `CALIB_DATA_PATH`, sequence length and sample count) are
/// layered on top, with `PYTHONPATH` and `MODEL_ID_MS` only defaulted.
pub fn build_calibration_command(
    python: &str,
    runner: &Path,
    quant_script: &Path,
    model_dir: &Path,
    plan: &CalibrationPlan,
    mut env: BTreeMap<String, String>,
) -> Invocation {
    env.entry("PYTHONPATH".into())
        .or_insert_with(|| plan.llm_compressor_repo.join("src").display().to_string());
    env.entry("MODEL_ID_MS".into())
        .or_insert_with(|| plan.model_id.clone());
    env.insert("MODEL_DIR".into(), model_dir.display().to_string());
    env.insert("CALIB_DATA_PATH".into(), plan.calib_data.display().to_string());
    env.insert("KV_CALIB_SEQ_LEN".into(), plan.seq_len.to_string());
    env.insert("KV_CALIB_SAMPLES".into(), plan.samples.to_string());

    let mut args = vec![
        runner.display().to_string(),
        quant_script.display().to_string(),
        "--model".to_string(),
        model_dir.display().to_string(),
        "--output".to_string(),
        plan.output.display().to_string(),
        "--kv-only".to_string(),
        "true".to_string(),
        "--seq-len".to_string(),
        plan.seq_len.to_string(),
        "--calib-data".to_string(),
        plan.calib_data.display().to_string(),
    ];
    args.extend(plan.quant_args.iter().cloned());
    Invocation::new(python, args).with_env(env)
}
