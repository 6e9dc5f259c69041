//! Tests for error messages

use std::path::PathBuf;

use vllm_extras::core::ToolError;

#[test]
fn test_not_found_message() {
    let err = ToolError::NotFound {
        what: "Test matrix",
        path: PathBuf::from("/tmp/missing.yaml"),
    };
    assert_eq!(err.to_string(), "Test matrix not found: /tmp/missing.yaml");
}

#[test]
fn test_command_failed_message() {
    let err = ToolError::CommandFailed {
        command: "git clone x".into(),
        code: Some(128),
    };
    assert_eq!(err.to_string(), "command `git clone x` exited with status 128");

    let err = ToolError::CommandFailed {
        command: "python3 run.py".into(),
        code: None,
    };
    assert_eq!(err.to_string(), "command `python3 run.py` exited with signal");
}

#[test]
fn test_refused_root_message() {
    let err = ToolError::RefusedRootRemoval(PathBuf::from("/"));
    assert_eq!(err.to_string(), "Refusing to remove root directory: /");
}

#[test]
fn test_io_error_keeps_source() {
    let err = ToolError::io("/data/x", std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"));
    assert!(err.to_string().starts_with("io error at /data/x"));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_config_error_converts_to_anyhow() {
    let result: vllm_extras::core::AppResult<()> = Err(ToolError::Config("No suites selected to run".into()).into());
    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "No suites selected to run");
    assert!(err.downcast_ref::<ToolError>().is_some());
}
