//! Test matrix configuration: suites, profiles and default selections.
//!
//! ```yaml
//! default_suites: [smoke]
//! profiles:
//!   nightly:
//!     suites: [smoke, kernels]
//! suites:
//!   smoke:
//!     commands:
//!       - name: import
//!         cmd: python -c "import vllm"
//!         timeout: 60
//!         env: { CUDA_VISIBLE_DEVICES: 0 }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use super::env::{render_env, EnvMap};
use crate::core::{CommandRequest, ToolError};
use crate::util::absolutize;

/// Root of `test_matrix.yaml`.
///
/// Suites are kept in declaration order and validated lazily, so a broken
/// suite only fails a run that selects it.
#[derive(Debug, Clone)]
pub struct TestMatrix {
    suites: Mapping,
    profiles: Mapping,
    default_suites: Vec<String>,
}

/// A validated suite: an ordered list of commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteConfig {
    /// Commands in execution order.
    pub commands: Vec<CommandSpec>,
}

/// One command in a suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Display name, defaulting to `{suite}-{index}`.
    pub name: String,
    /// Shell command line.
    pub cmd: String,
    /// Absolute working directory.
    pub workdir: Option<PathBuf>,
    /// Environment overrides, already rendered.
    pub env: std::collections::BTreeMap<String, String>,
    /// Timeout in seconds.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawCommand {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    cmd: Option<Value>,
    #[serde(default)]
    workdir: Option<Value>,
    #[serde(default)]
    env: Option<Value>,
    #[serde(default)]
    timeout: Option<u64>,
}

impl TestMatrix {
    /// Read and parse a matrix file.
    pub fn load(path: &Path) -> Result<Self, ToolError> {
        if !path.exists() {
            return Err(ToolError::NotFound {
                what: "Test matrix",
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|e| ToolError::io(path, e))?;
        let root: Value = serde_yaml::from_str(&text).map_err(|source| ToolError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_value(root)
    }

    /// Parse a matrix from YAML text.
    pub fn from_yaml_str(input: &str) -> Result<Self, ToolError> {
        let root: Value = serde_yaml::from_str(input).map_err(|source| ToolError::Yaml {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        Self::from_value(root)
    }

    fn from_value(root: Value) -> Result<Self, ToolError> {
        let Value::Mapping(mut root) = root else {
            return Err(ToolError::Config("Matrix root must be a mapping".into()));
        };
        let Some(Value::Mapping(suites)) = root.remove("suites") else {
            return Err(ToolError::Config("Matrix missing 'suites' mapping".into()));
        };
        let profiles = match root.remove("profiles") {
            Some(Value::Mapping(profiles)) => profiles,
            _ => Mapping::new(),
        };
        let default_suites = root
            .remove("default_suites")
            .map(string_list)
            .unwrap_or_default();
        Ok(Self {
            suites,
            profiles,
            default_suites,
        })
    }

    /// Suite names in declaration order.
    pub fn suite_names(&self) -> Vec<String> {
        self.suites.keys().map(yaml_key).collect()
    }

    /// Suites listed by a profile, empty when the profile is unknown.
    pub fn profile_suites(&self, profile: &str) -> Vec<String> {
        match self.profiles.get(profile) {
            Some(Value::Mapping(payload)) => payload
                .get("suites")
                .cloned()
                .map(string_list)
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// `default_suites` from the matrix root.
    pub fn default_suites(&self) -> &[String] {
        &self.default_suites
    }

    /// Select the suites to run.
    ///
    /// Precedence: explicit selection, then the profile's list, then
    /// `default_suites`, then every declared suite.
    pub fn collect_suites(&self, profile: &str, explicit: &[String]) -> Result<Vec<String>, ToolError> {
        let selected = [
            explicit.to_vec(),
            self.profile_suites(profile),
            self.default_suites.clone(),
            self.suite_names(),
        ]
        .into_iter()
        .find(|candidate| !candidate.is_empty())
        .unwrap_or_default();
        if selected.is_empty() {
            return Err(ToolError::Config("No suites selected to run".into()));
        }
        Ok(selected)
    }

    /// Validate and return a suite by name.
    pub fn suite(&self, name: &str) -> Result<SuiteConfig, ToolError> {
        match self.suites.get(name) {
            Some(value @ Value::Mapping(_)) => SuiteConfig::from_value(name, value),
            _ => Err(ToolError::Config(format!("Suite '{name}' missing configuration"))),
        }
    }
}

impl SuiteConfig {
    fn from_value(suite: &str, value: &Value) -> Result<Self, ToolError> {
        let Some(Value::Sequence(items)) = value.get("commands") else {
            return Err(ToolError::Config(format!(
                "Suite '{suite}' must contain a sequence of commands"
            )));
        };
        let commands = items
            .iter()
            .enumerate()
            .map(|(index, item)| CommandSpec::from_value(suite, index, item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { commands })
    }
}

impl CommandSpec {
    fn from_value(suite: &str, index: usize, item: &Value) -> Result<Self, ToolError> {
        if !item.is_mapping() {
            return Err(ToolError::Config(format!(
                "Suite '{suite}' command #{index} must be a mapping"
            )));
        }
        let raw: RawCommand = serde_yaml::from_value(item.clone()).map_err(|e| {
            ToolError::Config(format!("Suite '{suite}' command #{index} is invalid: {e}"))
        })?;
        let name = raw
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("{suite}-{index}"));

        let Some(Value::String(cmd)) = raw.cmd else {
            return Err(ToolError::Config(format!(
                "Suite '{suite}' command '{name}' missing 'cmd'"
            )));
        };

        let workdir = match raw.workdir {
            None | Some(Value::Null) => None,
            Some(Value::String(dir)) if dir.is_empty() => None,
            Some(Value::String(dir)) => Some(absolutize(Path::new(&dir))),
            Some(_) => {
                return Err(ToolError::Config(format!(
                    "Suite '{suite}' command '{name}' has invalid workdir"
                )))
            }
        };

        let env = match raw.env {
            None | Some(Value::Null) => EnvMap::new(),
            Some(value @ Value::Mapping(_)) => serde_yaml::from_value(value).map_err(|e| {
                ToolError::Config(format!("Suite '{suite}' command '{name}' env is invalid: {e}"))
            })?,
            Some(_) => {
                return Err(ToolError::Config(format!(
                    "Suite '{suite}' command '{name}' env must be a mapping"
                )))
            }
        };

        Ok(Self {
            name,
            cmd,
            workdir,
            env: render_env(&env),
            timeout_secs: raw.timeout,
        })
    }

    /// Convert into a runner request.
    pub fn to_request(&self) -> CommandRequest {
        CommandRequest {
            command: self.cmd.clone(),
            env: self.env.clone(),
            workdir: self.workdir.clone(),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

fn yaml_key(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

fn string_list(value: Value) -> Vec<String> {
    match value {
        Value::Sequence(items) => items.iter().map(yaml_key).collect(),
        _ => Vec::new(),
    }
}
