//! Tests for clock and text helpers

use chrono::{TimeZone, Utc};
use vllm_extras::util::{file_stamp, record_timestamp, seconds_timestamp, shell_join, shell_split, tail_chars, MAX_OUTPUT_CHARS};

#[test]
fn test_timestamp_formats() {
    let at = Utc.with_ymd_and_hms(2026, 3, 9, 7, 5, 1).unwrap();
    assert_eq!(record_timestamp(at), "2026-03-09T07:05:01.000000Z");
    assert_eq!(seconds_timestamp(at), "2026-03-09T07:05:01Z");
    assert_eq!(file_stamp(at), "20260309-070501");
}

#[test]
fn test_output_tail_limit() {
    let long = "x".repeat(MAX_OUTPUT_CHARS + 10) + "END";
    let tail = tail_chars(&long, MAX_OUTPUT_CHARS);
    assert_eq!(tail.chars().count(), MAX_OUTPUT_CHARS);
    assert!(tail.ends_with("END"));
}

#[test]
fn test_shell_join_quotes_when_needed() {
    let line = shell_join(&["python", "-c", "print('hi there')"]);
    assert_eq!(shell_split(&line).unwrap(), vec!["python", "-c", "print('hi there')"]);
    assert!(line.starts_with("python -c "));
}

#[test]
fn test_shell_split_rejects_unbalanced_quotes() {
    let err = shell_split("--model 'unterminated").unwrap_err();
    assert!(err.to_string().starts_with("failed to parse command line"));
}
