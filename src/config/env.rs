//! Environment handling: `.env` loading, YAML env values, offline defaults
//! and `KEY=VALUE` overrides.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::ToolError;
use crate::util::expand_user_with;

/// Environment variables forced for offline ModelScope/HF operation (unless already set).
pub const OFFLINE_ENV_DEFAULTS: &[(&str, &str)] = &[
    ("VLLM_USE_MODELSCOPE", "True"),
    ("HF_HUB_OFFLINE", "1"),
    ("HF_DATASETS_OFFLINE", "1"),
    ("TRANSFORMERS_OFFLINE", "1"),
    ("TRANSFORMERS_NO_ADVISORY_WARNINGS", "1"),
];

/// Load a `.env` file from the current directory or its parents, if any.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!(%err, "ignoring unreadable .env file"),
    }
}

/// A scalar environment value from YAML, rendered as a string.
///
/// Booleans render as `True`/`False` and null as an empty string, so that
/// profiles written for the Python tooling keep producing the same values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "serde_yaml::Value")]
pub struct EnvValue(String);

impl EnvValue {
    /// Borrow the rendered value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the rendered value.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for EnvValue {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for EnvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<serde_yaml::Value> for EnvValue {
    type Error = String;

    fn try_from(value: serde_yaml::Value) -> Result<Self, Self::Error> {
        use serde_yaml::Value;
        match value {
            Value::String(s) => Ok(Self(s)),
            Value::Number(n) => Ok(Self(n.to_string())),
            Value::Bool(true) => Ok(Self("True".into())),
            Value::Bool(false) => Ok(Self("False".into())),
            Value::Null => Ok(Self("None".into())),
            Value::Tagged(tagged) => Self::try_from(tagged.value),
            Value::Sequence(_) | Value::Mapping(_) => {
                Err("environment values must be scalars".to_string())
            }
        }
    }
}

/// Mapping of environment variable names to YAML scalar values.
pub type EnvMap = BTreeMap<String, EnvValue>;

/// Flatten an [`EnvMap`] into plain strings.
pub fn render_env(env: &EnvMap) -> BTreeMap<String, String> {
    env.iter()
        .map(|(k, v)| (k.clone(), v.as_str().to_string()))
        .collect()
}

/// Apply the offline defaults to `env`.
///
/// * every [`OFFLINE_ENV_DEFAULTS`] entry is set if absent;
/// * an existing `MODELSCOPE_CACHE` is `~`-expanded and `MODELSCOPE_HOME`
///   defaults to it, otherwise both are set to `cache_dir`;
/// * `HF_HOME` defaults to `default_hf_home`, and `TRANSFORMERS_CACHE` /
///   `HF_DATASETS_CACHE` default to subdirectories of it.
pub fn apply_offline_defaults(
    env: &mut BTreeMap<String, String>,
    cache_dir: &Path,
    default_hf_home: &Path,
    home: &Path,
) {
    for (key, value) in OFFLINE_ENV_DEFAULTS {
        env.entry((*key).to_string())
            .or_insert_with(|| (*value).to_string());
    }

    let existing = env
        .get("MODELSCOPE_CACHE")
        .filter(|value| !value.is_empty())
        .cloned();
    if let Some(cache_value) = existing {
        let cache_str = expand_user_with(Path::new(&cache_value), home)
            .display()
            .to_string();
        env.insert("MODELSCOPE_CACHE".into(), cache_str.clone());
        env.entry("MODELSCOPE_HOME".into()).or_insert(cache_str);
    } else {
        let cache_str = expand_user_with(cache_dir, home).display().to_string();
        env.insert("MODELSCOPE_CACHE".into(), cache_str.clone());
        env.insert("MODELSCOPE_HOME".into(), cache_str);
    }

    let hf_home = PathBuf::from(
        env.entry("HF_HOME".into())
            .or_insert_with(|| default_hf_home.display().to_string())
            .clone(),
    );
    env.entry("TRANSFORMERS_CACHE".into())
        .or_insert_with(|| hf_home.join("transformers").display().to_string());
    env.entry("HF_DATASETS_CACHE".into())
        .or_insert_with(|| hf_home.join("datasets").display().to_string());
}

/// Parse `KEY=VALUE` overrides. The value may itself contain `=`.
pub fn parse_env_overrides<S: AsRef<str>>(items: &[S]) -> Result<Vec<(String, String)>, ToolError> {
    items
        .iter()
        .map(|item| {
            let item = item.as_ref();
            let (key, value) = item.split_once('=').ok_or_else(|| {
                ToolError::Config(format!("Invalid env override '{item}', expected KEY=VALUE"))
            })?;
            if key.is_empty() {
                return Err(ToolError::Config(format!(
                    "Invalid env override '{item}', missing key"
                )));
            }
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}
