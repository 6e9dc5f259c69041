//! Tests for the test matrix and model profile models

use std::path::Path;
use std::time::Duration;

use vllm_extras::config::{ProfileBook, TestMatrix, DEFAULT_SERVE_ENTRYPOINT};

const MATRIX: &str = r"
default_suites: [unit]
suites:
  smoke:
    commands:
      - name: import
        cmd: python -c 'import vllm'
        timeout: 60
      - cmd: echo second
        env:
          FLAG: true
          LEVEL: 3
  unit:
    commands:
      - cmd: pytest tests/unit
        workdir: /opt/vllm
profiles:
  ci:
    suites: [smoke, unit]
  empty:
    suites: []
";

#[test]
fn test_matrix_suite_selection_precedence() {
    let matrix = TestMatrix::from_yaml_str(MATRIX).unwrap();
    let explicit = vec!["unit".to_string()];
    assert_eq!(matrix.collect_suites("ci", &explicit).unwrap(), vec!["unit"]);
    assert_eq!(matrix.collect_suites("ci", &[]).unwrap(), vec!["smoke", "unit"]);
    assert_eq!(matrix.collect_suites("empty", &[]).unwrap(), vec!["unit"]);
    assert_eq!(matrix.collect_suites("unknown", &[]).unwrap(), vec!["unit"]);
}

#[test]
fn test_matrix_falls_back_to_all_suites_in_order() {
    let matrix = TestMatrix::from_yaml_str("suites:\n  b: {commands: []}\n  a: {commands: []}\n").unwrap();
    assert_eq!(matrix.collect_suites("any", &[]).unwrap(), vec!["b", "a"]);
}

#[test]
fn test_matrix_without_suites_selects_nothing() {
    let matrix = TestMatrix::from_yaml_str("suites: {}\n").unwrap();
    let err = matrix.collect_suites("any", &[]).unwrap_err();
    assert_eq!(err.to_string(), "No suites selected to run");
}

#[test]
fn test_matrix_root_errors() {
    let err = TestMatrix::from_yaml_str("- a\n- b\n").unwrap_err();
    assert_eq!(err.to_string(), "Matrix root must be a mapping");
    let err = TestMatrix::from_yaml_str("profiles: {}\n").unwrap_err();
    assert_eq!(err.to_string(), "Matrix missing 'suites' mapping");
}

#[test]
fn test_matrix_load_missing_file() {
    let err = TestMatrix::load(Path::new("/nonexistent/test_matrix.yaml")).unwrap_err();
    assert_eq!(err.to_string(), "Test matrix not found: /nonexistent/test_matrix.yaml");
}

#[test]
fn test_command_spec_defaults_and_env() {
    let matrix = TestMatrix::from_yaml_str(MATRIX).unwrap();
    let smoke = matrix.suite("smoke").unwrap();
    assert_eq!(smoke.commands.len(), 2);
    assert_eq!(smoke.commands[0].name, "import");
    assert_eq!(smoke.commands[0].timeout_secs, Some(60));
    assert_eq!(smoke.commands[1].name, "smoke-1");
    assert_eq!(smoke.commands[1].env["FLAG"], "True");
    assert_eq!(smoke.commands[1].env["LEVEL"], "3");

    let request = smoke.commands[0].to_request();
    assert_eq!(request.timeout, Some(Duration::from_secs(60)));
    assert_eq!(request.command, "python -c 'import vllm'");

    let unit = matrix.suite("unit").unwrap();
    assert_eq!(unit.commands[0].workdir.as_deref(), Some(Path::new("/opt/vllm")));
}

#[test]
fn test_suite_validation_messages() {
    let matrix = TestMatrix::from_yaml_str(
        r"
suites:
  nocommands: {}
  scalar:
    commands: [just-a-string]
  nocmd:
    commands:
      - name: broken
  badenv:
    commands:
      - name: e
        cmd: 'true'
        env: [A]
  badworkdir:
    commands:
      - name: w
        cmd: 'true'
        workdir: [x]
",
    )
    .unwrap();
    let message = |name: &str| matrix.suite(name).unwrap_err().to_string();
    assert_eq!(message("nocommands"), "Suite 'nocommands' must contain a sequence of commands");
    assert_eq!(message("scalar"), "Suite 'scalar' command #0 must be a mapping");
    assert_eq!(message("nocmd"), "Suite 'nocmd' command 'broken' missing 'cmd'");
    assert_eq!(message("badenv"), "Suite 'badenv' command 'e' env must be a mapping");
    assert_eq!(message("badworkdir"), "Suite 'badworkdir' command 'w' has invalid workdir");
    assert_eq!(message("absent"), "Suite 'absent' missing configuration");
}

const PROFILES: &str = r"
profiles:
  qwen:
    description: Qwen 7B on one GPU
    env:
      CUDA_VISIBLE_DEVICES: 0
    serve:
      args:
        - --model Qwen/Qwen2.5-7B-Instruct
        - --max-model-len 8192
      env:
        VLLM_LOGGING_LEVEL: DEBUG
    kv_calibration:
      model_id: Qwen/Qwen2.5-7B-Instruct
      samples: 64
      quant_args: [--scheme, FP8]
  bare:
    description: defaults only
";

#[test]
fn test_profiles_parse() {
    let book = ProfileBook::from_yaml_str(PROFILES).unwrap();
    let qwen = book.ensure("qwen").unwrap();
    assert_eq!(qwen.env["CUDA_VISIBLE_DEVICES"].as_str(), "0");
    assert_eq!(qwen.serve.args.len(), 2);
    let kv = qwen.kv_calibration.as_ref().unwrap();
    assert_eq!(kv.samples, Some(64));
    assert_eq!(kv.quant_args, vec!["--scheme", "FP8"]);

    let bare = book.ensure("bare").unwrap();
    assert_eq!(bare.serve.entrypoint(), DEFAULT_SERVE_ENTRYPOINT);
    assert!(bare.kv_calibration.is_none());
}

#[test]
fn test_profiles_unknown_lists_available() {
    let book = ProfileBook::from_yaml_str(PROFILES).unwrap();
    let err = book.ensure("llama").unwrap_err();
    assert_eq!(err.to_string(), "Unknown profile 'llama'. Available: bare, qwen");
}

#[test]
fn test_profiles_root_errors() {
    assert_eq!(
        ProfileBook::from_yaml_str("[]").unwrap_err().to_string(),
        "Invalid config root"
    );
    assert_eq!(
        ProfileBook::from_yaml_str("other: 1").unwrap_err().to_string(),
        "'profiles' section missing"
    );
}

#[test]
fn test_profile_summaries_sorted() {
    let book = ProfileBook::from_yaml_str(PROFILES).unwrap();
    assert_eq!(
        book.summaries(),
        vec![("bare", "defaults only"), ("qwen", "Qwen 7B on one GPU")]
    );
}
