//! Baseline-versus-patched comparison of suite results.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde_json::Value;

use super::results::format_returncode;
use super::ToolError;

/// Minimum absolute duration change, in seconds, worth reporting for passing commands.
pub const TIMING_THRESHOLD_S: f64 = 1.0;

/// `(suite, name)` identity of a result.
pub type ResultKey = (String, String);

/// A loosely-typed result entry; every field is optional in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultEntry {
    /// Status label, if present.
    pub status: Option<String>,
    /// Duration in seconds, `0.0` when absent.
    pub duration_s: f64,
    /// Return code, if present and numeric.
    pub returncode: Option<i64>,
}

impl ResultEntry {
    fn from_object(item: &serde_json::Map<String, Value>) -> Self {
        Self {
            status: item.get("status").and_then(|v| match v {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            }),
            duration_s: item.get("duration_s").and_then(Value::as_f64).unwrap_or(0.0),
            returncode: item.get("returncode").and_then(Value::as_i64),
        }
    }

    fn passed(&self) -> bool {
        self.status.as_deref() == Some("passed")
    }

    fn status_label(&self) -> &str {
        self.status.as_deref().unwrap_or("?")
    }

    fn raw_status(&self) -> &str {
        self.status.as_deref().unwrap_or("None")
    }

    /// One-line description: `status=.. duration=..s rc=..`.
    pub fn describe(&self) -> String {
        format!(
            "status={} duration={:.2}s rc={}",
            self.status_label(),
            self.duration_s,
            format_returncode(self.returncode)
        )
    }
}

/// Results indexed by `(suite, name)`, sorted.
pub type ResultIndex = BTreeMap<ResultKey, ResultEntry>;

fn key_part(item: &serde_json::Map<String, Value>, field: &str) -> String {
    match item.get(field) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Parse a results document. Later duplicates of a key replace earlier ones.
pub fn index_results(payload: &Value, path: &Path) -> Result<ResultIndex, ToolError> {
    let Value::Array(items) = payload else {
        return Err(ToolError::Config(format!(
            "Unexpected results format in {}",
            path.display()
        )));
    };
    let mut index = ResultIndex::new();
    for item in items {
        let Value::Object(item) = item else {
            return Err(ToolError::Config(format!("Invalid entry in {}", path.display())));
        };
        let key = (key_part(item, "suite"), key_part(item, "name"));
        index.insert(key, ResultEntry::from_object(item));
    }
    Ok(index)
}

/// Load and index a results file written by the suite runner.
pub fn load_results(path: &Path) -> Result<ResultIndex, ToolError> {
    if !path.exists() {
        return Err(ToolError::NotFound {
            what: "Results file",
            path: path.to_path_buf(),
        });
    }
    let text = std::fs::read_to_string(path).map_err(|e| ToolError::io(path, e))?;
    let payload: Value = serde_json::from_str(&text).map_err(|source| ToolError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    index_results(&payload, path)
}

/// One reportable difference between two runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ComparisonEntry {
    /// Present only in the patched run.
    Added {
        /// Result identity.
        key: ResultKey,
        /// Patched entry.
        patched: ResultEntry,
    },
    /// Present only in the baseline run.
    Missing {
        /// Result identity.
        key: ResultKey,
    },
    /// Passed in both runs with a notable duration change.
    Timing {
        /// Result identity.
        key: ResultKey,
        /// Baseline duration.
        base_s: f64,
        /// Patched duration.
        patched_s: f64,
    },
    /// Status differs between runs.
    StatusChanged {
        /// Result identity.
        key: ResultKey,
        /// Baseline entry.
        base: ResultEntry,
        /// Patched entry.
        patched: ResultEntry,
    },
    /// Same non-passing status in both runs.
    StillFailing {
        /// Result identity.
        key: ResultKey,
        /// Baseline entry.
        base: ResultEntry,
        /// Patched entry.
        patched: ResultEntry,
    },
}

impl ComparisonEntry {
    /// Whether this entry counts towards the regression total.
    pub const fn is_regression(&self) -> bool {
        matches!(
            self,
            Self::Missing { .. } | Self::StatusChanged { .. } | Self::StillFailing { .. }
        )
    }
}

fn header((suite, name): &ResultKey) -> String {
    format!("{suite}::{name}")
}

impl fmt::Display for ComparisonEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added { key, patched } => {
                write!(f, "[+] {} added -> {}", header(key), patched.describe())
            }
            Self::Missing { key } => write!(f, "[-] {} missing in patched run", header(key)),
            Self::Timing {
                key,
                base_s,
                patched_s,
            } => {
                let delta = patched_s - base_s;
                let flag = if delta > 0.0 { "slower" } else { "faster" };
                write!(
                    f,
                    "[=] {} passed; patched {flag} by {:.2}s (base {base_s:.2}s -> patched {patched_s:.2}s)",
                    header(key),
                    delta.abs()
                )
            }
            Self::StatusChanged { key, base, patched } => write!(
                f,
                "[!] {} status regression: base={} patched={} (base {} | patched {})",
                header(key),
                base.raw_status(),
                patched.raw_status(),
                base.describe(),
                patched.describe()
            ),
            Self::StillFailing { key, base, patched } => write!(
                f,
                "[~] {} still failing: base={} | patched={}",
                header(key),
                base.describe(),
                patched.describe()
            ),
        }
    }
}

/// Outcome of comparing two runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comparison {
    /// Reportable entries in key order.
    pub entries: Vec<ComparisonEntry>,
}

impl Comparison {
    /// Number of regressions.
    pub fn regressions(&self) -> usize {
        self.entries.iter().filter(|e| e.is_regression()).count()
    }

    /// Final summary line.
    pub fn summary_line(&self) -> String {
        match self.regressions() {
            0 => "[summary] no regressions detected".to_string(),
            n => format!("[summary] regressions detected: {n}"),
        }
    }
}

/// Compare a baseline run against a patched run.
///
/// Any status change counts as a regression, including a fix, as does a
/// command that keeps failing.
pub fn compare(baseline: &ResultIndex, patched: &ResultIndex) -> Comparison {
    let mut keys: Vec<&ResultKey> = baseline.keys().chain(patched.keys()).collect();
    keys.sort();
    keys.dedup();

    let mut entries = Vec::new();
    for key in keys {
        let entry = match (baseline.get(key), patched.get(key)) {
            (None, Some(patch)) => Some(ComparisonEntry::Added {
                key: key.clone(),
                patched: patch.clone(),
            }),
            (Some(_), None) => Some(ComparisonEntry::Missing { key: key.clone() }),
            (Some(base), Some(patch)) if base.passed() && patch.passed() => {
                let delta = patch.duration_s - base.duration_s;
                (delta.abs() >= TIMING_THRESHOLD_S).then(|| ComparisonEntry::Timing {
                    key: key.clone(),
                    base_s: base.duration_s,
                    patched_s: patch.duration_s,
                })
            }
            (Some(base), Some(patch)) if base.status != patch.status => {
                Some(ComparisonEntry::StatusChanged {
                    key: key.clone(),
                    base: base.clone(),
                    patched: patch.clone(),
                })
            }
            (Some(base), Some(patch)) if !patch.passed() => Some(ComparisonEntry::StillFailing {
                key: key.clone(),
                base: base.clone(),
                patched: patch.clone(),
            }),
            _ => None,
        };
        entries.extend(entry);
    }
    Comparison { entries }
}
