//! Tests for process execution

use std::collections::BTreeMap;
use std::time::Duration;

use vllm_extras::runtime::{run_captured, run_inherited, Invocation};

#[test]
fn test_invocation_display_and_argv() {
    let inv = Invocation::new("python3", ["-m", "vllm.entrypoints.openai.api_server", "--port", "8000"]);
    assert_eq!(inv.argv()[0], "python3");
    assert_eq!(inv.display_line(), "python3 -m vllm.entrypoints.openai.api_server --port 8000");
    assert!(Invocation::from_argv(&[]).is_none());
}

#[tokio::test]
async fn test_run_captured_collects_output_and_env() {
    let mut env = BTreeMap::new();
    env.insert("EXTRA_VALUE".to_string(), "42".to_string());
    let inv = Invocation::new("/bin/bash", ["-c", "echo out-$EXTRA_VALUE; echo err >&2; exit 3"]).with_env(env);
    let output = run_captured(&inv, None).await.unwrap();
    assert_eq!(output.code, Some(3));
    assert!(!output.success());
    assert_eq!(output.stdout.trim(), "out-42");
    assert_eq!(output.stderr.trim(), "err");
    assert!(!output.timed_out);
}

#[tokio::test]
async fn test_run_captured_times_out() {
    let inv = Invocation::new("/bin/bash", ["-c", "sleep 5"]);
    let output = run_captured(&inv, Some(Duration::from_millis(200))).await.unwrap();
    assert!(output.timed_out);
    assert_eq!(output.code, None);
}

#[tokio::test]
async fn test_run_captured_missing_program() {
    let inv = Invocation::new("definitely-not-a-real-binary-xyz", Vec::<String>::new());
    assert!(run_captured(&inv, None).await.is_err());
}

#[tokio::test]
async fn test_run_inherited_reports_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let inv = Invocation::new("/bin/bash", ["-c", "test \"$(pwd)\" = \"$EXPECTED\""])
        .with_env(BTreeMap::from([(
            "EXPECTED".to_string(),
            dir.path().canonicalize().unwrap().display().to_string(),
        )]))
        .with_workdir(dir.path().canonicalize().unwrap());
    assert_eq!(run_inherited(&inv).await.unwrap(), Some(0));
}
