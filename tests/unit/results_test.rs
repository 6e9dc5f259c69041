//! Tests for result records, output paths and the comparator

use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use serde_json::json;
use vllm_extras::core::{
    compare, index_results, resolve_output_path, write_results, CommandRecord, CommandStatus, ComparisonEntry,
    RunSummary,
};

fn record(suite: &str, name: &str, status: CommandStatus, returncode: Option<i32>) -> CommandRecord {
    CommandRecord {
        profile: "ci".into(),
        suite: suite.into(),
        name: name.into(),
        command: "true".into(),
        timestamp: "2026-01-01T00:00:00.000000Z".into(),
        status,
        returncode,
        duration_s: 0.5,
        stdout: String::new(),
        stderr: String::new(),
    }
}

#[test]
fn test_record_json_field_order() {
    let json = serde_json::to_string(&record("s", "n", CommandStatus::Timeout, None)).unwrap();
    let fields = [
        "\"profile\"", "\"suite\"", "\"name\"", "\"command\"", "\"timestamp\"", "\"status\"", "\"returncode\"",
        "\"duration_s\"", "\"stdout\"", "\"stderr\"",
    ];
    let positions: Vec<usize> = fields.iter().map(|f| json.find(f).unwrap()).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert!(json.contains("\"status\":\"timeout\""));
    assert!(json.contains("\"returncode\":null"));
}

#[test]
fn test_resolve_output_path() {
    let now = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(
        resolve_output_path(Some(dir.path()), "ci", Path::new("results"), now),
        dir.path().join("20260501-120000-ci.json")
    );
    assert_eq!(
        resolve_output_path(Some(Path::new("/tmp/out.json")), "ci", Path::new("results"), now),
        PathBuf::from("/tmp/out.json")
    );
    assert_eq!(
        resolve_output_path(None, "nightly", Path::new("results"), now),
        PathBuf::from("results/20260501-120000-nightly.json")
    );
}

#[test]
fn test_write_results_creates_parents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/run.json");
    write_results(&path, &[record("s", "n", CommandStatus::Passed, Some(0))]).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("[\n  {"));
    let parsed: Vec<CommandRecord> = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed[0].status, CommandStatus::Passed);
}

#[test]
fn test_summary_lines() {
    let records = vec![
        record("smoke", "ok", CommandStatus::Passed, Some(0)),
        record("smoke", "bad", CommandStatus::Failed, Some(2)),
        record("unit", "slow", CommandStatus::Timeout, None),
    ];
    let summary = RunSummary::from_records(&records);
    assert!(!summary.all_passed());
    assert_eq!(
        summary.lines(),
        vec![
            "[summary] total=3 failures=2",
            "[summary] smoke::bad [failed] rc=2",
            "[summary] unit::slow [timeout] rc=None",
        ]
    );
}

#[test]
fn test_index_results_errors() {
    let path = Path::new("r.json");
    assert_eq!(
        index_results(&json!({"a": 1}), path).unwrap_err().to_string(),
        "Unexpected results format in r.json"
    );
    assert_eq!(
        index_results(&json!([1]), path).unwrap_err().to_string(),
        "Invalid entry in r.json"
    );
}

#[test]
fn test_index_results_later_duplicates_win() {
    let index = index_results(
        &json!([
            {"suite": "s", "name": "n", "status": "failed"},
            {"suite": "s", "name": "n", "status": "passed"},
            {"status": "passed"}
        ]),
        Path::new("r.json"),
    )
    .unwrap();
    assert_eq!(index.len(), 2);
    assert_eq!(index[&("s".to_string(), "n".to_string())].status.as_deref(), Some("passed"));
    assert!(index.contains_key(&(String::new(), String::new())));
}

#[test]
fn test_compare_outcomes() {
    let base = index_results(
        &json!([
            {"suite": "a", "name": "gone", "status": "passed", "duration_s": 1.0, "returncode": 0},
            {"suite": "a", "name": "fast", "status": "passed", "duration_s": 5.0, "returncode": 0},
            {"suite": "a", "name": "same", "status": "passed", "duration_s": 5.0, "returncode": 0},
            {"suite": "a", "name": "broke", "status": "passed", "duration_s": 1.0, "returncode": 0},
            {"suite": "a", "name": "still", "status": "failed", "duration_s": 1.0, "returncode": 1}
        ]),
        Path::new("base.json"),
    )
    .unwrap();
    let patched = index_results(
        &json!([
            {"suite": "a", "name": "fast", "status": "passed", "duration_s": 3.5, "returncode": 0},
            {"suite": "a", "name": "same", "status": "passed", "duration_s": 5.5, "returncode": 0},
            {"suite": "a", "name": "broke", "status": "timeout", "duration_s": 30.0, "returncode": null},
            {"suite": "a", "name": "still", "status": "failed", "duration_s": 1.25, "returncode": 1},
            {"suite": "b", "name": "new", "status": "passed", "duration_s": 2.0, "returncode": 0}
        ]),
        Path::new("patched.json"),
    )
    .unwrap();

    let comparison = compare(&base, &patched);
    let lines: Vec<String> = comparison.entries.iter().map(ToString::to_string).collect();
    assert_eq!(
        lines,
        vec![
            "[!] a::broke status regression: base=passed patched=timeout (base status=passed duration=1.00s rc=0 | patched status=timeout duration=30.00s rc=None)",
            "[=] a::fast passed; patched faster by 1.50s (base 5.00s -> patched 3.50s)",
            "[-] a::gone missing in patched run",
            "[~] a::still still failing: base=status=failed duration=1.00s rc=1 | patched=status=failed duration=1.25s rc=1",
            "[+] b::new added -> status=passed duration=2.00s rc=0",
        ]
    );
    assert_eq!(comparison.regressions(), 3);
    assert_eq!(comparison.summary_line(), "[summary] regressions detected: 3");
    assert!(matches!(comparison.entries[1], ComparisonEntry::Timing { .. }));
}

#[test]
fn test_compare_identical_runs() {
    let payload = json!([{"suite": "a", "name": "x", "status": "passed", "duration_s": 1.0}]);
    let index = index_results(&payload, Path::new("r.json")).unwrap();
    let comparison = compare(&index, &index);
    assert!(comparison.entries.is_empty());
    assert_eq!(comparison.summary_line(), "[summary] no regressions detected");
}

#[test]
fn test_compare_missing_status_label() {
    let base = index_results(
        &json!([{"suite": "a", "name": "x", "status": "passed", "duration_s": 1.0, "returncode": 0}]),
        Path::new("base.json"),
    )
    .unwrap();
    let patched = index_results(&json!([{"suite": "a", "name": "x"}]), Path::new("patched.json")).unwrap();
    let comparison = compare(&base, &patched);
    assert_eq!(
        comparison.entries[0].to_string(),
        "[!] a::x status regression: base=passed patched=None (base status=passed duration=1.00s rc=0 | patched status=? duration=0.00s rc=None)"
    );
}
