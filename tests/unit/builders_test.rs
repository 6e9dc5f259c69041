//! Tests for serve and calibration command builders

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use vllm_extras::builders::{
    build_calibration_command, build_clone_command, build_dependency_steps, build_serve_command, LLM_COMPRESSOR_URL,
};
use vllm_extras::config::ProfileBook;
use vllm_extras::modelscope::{CacheLayout, CalibrationOverrides, CalibrationPlan};

const PROFILES: &str = r"
profiles:
  qwen:
    description: Qwen
    env:
      CUDA_VISIBLE_DEVICES: 0
      SHARED: profile
    serve:
      entrypoint: vllm serve
      args:
        - Qwen/Qwen2.5-7B-Instruct
        - --max-model-len 8192
      env:
        SHARED: serve
  plain:
    description: defaults
";

fn book() -> ProfileBook {
    ProfileBook::from_yaml_str(PROFILES).unwrap()
}

#[test]
fn test_serve_argv_layers_entrypoint_args_and_extras() {
    let book = book();
    let layout = CacheLayout::from_home("/home/dev");
    let cmd = build_serve_command(
        book.ensure("qwen").unwrap(),
        &["--port 9000".to_string()],
        &[],
        &BTreeMap::new(),
        &layout,
    )
    .unwrap();
    assert_eq!(
        cmd.argv,
        vec!["vllm", "serve", "Qwen/Qwen2.5-7B-Instruct", "--max-model-len", "8192", "--port", "9000"]
    );
}

#[test]
fn test_serve_default_entrypoint() {
    let book = book();
    let layout = CacheLayout::from_home("/home/dev");
    let cmd = build_serve_command::<String>(book.ensure("plain").unwrap(), &[], &[], &BTreeMap::new(), &layout).unwrap();
    assert_eq!(cmd.argv, vec!["python", "-m", "vllm.entrypoints.openai.api_server"]);
}

#[test]
fn test_serve_env_precedence() {
    let book = book();
    let layout = CacheLayout::from_home("/home/dev");
    let process_env = BTreeMap::from([
        ("PATH".to_string(), "/usr/bin".to_string()),
        ("SHARED".to_string(), "process".to_string()),
        ("HF_HUB_OFFLINE".to_string(), "0".to_string()),
    ]);
    let cmd = build_serve_command(
        book.ensure("qwen").unwrap(),
        &[],
        &["EXTRA=1".to_string(), "CUDA_VISIBLE_DEVICES=1".to_string()],
        &process_env,
        &layout,
    )
    .unwrap();
    assert_eq!(cmd.env["PATH"], "/usr/bin");
    assert_eq!(cmd.env["SHARED"], "serve");
    assert_eq!(cmd.env["CUDA_VISIBLE_DEVICES"], "1");
    assert_eq!(cmd.env["EXTRA"], "1");
    // offline defaults come from the profile layer and win over the process env
    assert_eq!(cmd.env["HF_HUB_OFFLINE"], "1");
    assert_eq!(cmd.env["MODELSCOPE_CACHE"], "/home/dev/.cache/modelscope");
    assert_eq!(cmd.env["HF_HOME"], "/home/dev/.cache/hf");
}

#[test]
fn test_serve_rejects_bad_override() {
    let book = book();
    let layout = CacheLayout::from_home("/home/dev");
    let err = build_serve_command(
        book.ensure("qwen").unwrap(),
        &[],
        &["BROKEN".to_string()],
        &BTreeMap::new(),
        &layout,
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "Invalid env override 'BROKEN', expected KEY=VALUE");
}

#[test]
fn test_clone_command() {
    let inv = build_clone_command(Path::new("/opt/llm-compressor"));
    assert_eq!(
        inv.argv(),
        vec!["git", "clone", "--depth", "1", LLM_COMPRESSOR_URL, "/opt/llm-compressor"]
    );
}

#[test]
fn test_dependency_steps() {
    let steps = build_dependency_steps("python3", Path::new("/opt/lc"));
    assert_eq!(steps.len(), 4);
    assert!(!steps[0].checked);
    assert_eq!(steps[0].invocation.display_line(), "python3 -m pip uninstall -y compressed-tensors");
    assert!(steps[1].invocation.args.contains(&"compressed-tensors>=0.12.3a2,<0.13".to_string()));
    assert!(steps[1].invocation.args.contains(&"--pre".to_string()));
    assert_eq!(
        steps[2].invocation.argv(),
        vec!["python3", "-m", "pip", "install", "--no-cache-dir", "-q", "--no-deps", "-e", "/opt/lc"]
    );
    assert!(steps[1..].iter().all(|step| step.checked));
}

#[test]
fn test_calibration_command() {
    let layout = CacheLayout::from_home("/home/dev");
    let overrides = CalibrationOverrides {
        quant_args: vec!["--scheme".into(), "FP8".into()],
        ..CalibrationOverrides::default()
    };
    let plan = CalibrationPlan::adhoc("org/m", &overrides, &layout).unwrap();
    let base = BTreeMap::from([("PYTHONPATH".to_string(), "/custom".to_string())]);
    let inv = build_calibration_command(
        "python3",
        Path::new("/lc/_modelscope_runner.py"),
        Path::new("/lc/examples/q.py"),
        Path::new("/snap"),
        &plan,
        base,
    );
    let argv = inv.argv();
    assert_eq!(&argv[..3], ["python3", "/lc/_modelscope_runner.py", "/lc/examples/q.py"]);
    assert!(argv.windows(2).any(|w| w == ["--kv-only", "true"]));
    assert!(argv.windows(2).any(|w| w == ["--seq-len", "4096"]));
    assert_eq!(&argv[argv.len() - 2..], ["--scheme", "FP8"]);
    assert_eq!(inv.env["PYTHONPATH"], "/custom");
    assert_eq!(inv.env["MODEL_ID_MS"], "org/m");
    assert_eq!(inv.env["MODEL_DIR"], "/snap");
    assert_eq!(inv.env["KV_CALIB_SAMPLES"], "512");
    assert_eq!(
        PathBuf::from(&inv.env["CALIB_DATA_PATH"]),
        PathBuf::from("/home/dev/kvdata/org_m/calib/snippets.jsonl")
    );
}
