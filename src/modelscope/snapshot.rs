//! Snapshot layout repair and inspection.
//!
//! ModelScope snapshots do not always look like a Transformers checkpoint:
//! the weights may sit in a nested directory, `config.json` may be named
//! `configuration.json`, and tokenizer side files may be missing. The helpers
//! here make a snapshot loadable offline.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{info, warn};
use walkdir::WalkDir;

use super::metadata::read_snapshot_metadata;
use crate::core::ToolError;
use crate::util::{absolutize, expand_user};

/// Files that identify a model root, in priority order.
pub const MODEL_MARKERS: [&str; 3] = ["config.json", "configuration.json", "model_index.json"];

/// Side files created empty when missing, with their default JSON.
const PLACEHOLDER_FILES: [(&str, &str); 4] = [
    ("special_tokens_map.json", "{}"),
    ("generation_config.json", "{}"),
    ("preprocessor_config.json", "{}"),
    ("added_tokens.json", "[]"),
];

/// Repo id baked into some exported `auto_map` entries.
const LEAKED_REPO_ID: &str = "meta-llama/Meta-Llama-3-8B-Instruct";

/// Files named `name` below `base`, shallowest first then lexicographic.
fn find_by_depth(base: &Path, name: &str) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(base)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == name)
        .map(walkdir::DirEntry::into_path)
        .collect();
    found.sort_by(|a, b| {
        a.components()
            .count()
            .cmp(&b.components().count())
            .then_with(|| a.as_os_str().cmp(b.as_os_str()))
    });
    found
}

fn read_json(path: &Path) -> Option<Value> {
    let text = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&text).ok()
}

fn write_json(path: &Path, value: &Value, pretty: bool) -> Result<(), ToolError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|source| ToolError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, rendered).map_err(|e| ToolError::io(path, e))
}

/// Find the directory that actually holds the model inside a download.
///
/// A nonexistent `base` is returned unchanged. When the root was found via
/// `configuration.json` or `model_index.json`, its content is mirrored to a
/// `config.json` beside it.
pub fn resolve_model_root(base: &Path) -> PathBuf {
    let base = absolutize(&expand_user(base));
    if !base.exists() {
        return base;
    }
    for marker in MODEL_MARKERS {
        let Some(first) = find_by_depth(&base, marker).into_iter().next() else {
            continue;
        };
        let Some(chosen) = first.parent().map(Path::to_path_buf) else {
            continue;
        };
        if chosen != base {
            info!(dir = %chosen.display(), "nested model directory detected");
        }
        let config = chosen.join("config.json");
        if marker != "config.json" && !config.exists() {
            let content = std::fs::read_to_string(&first).unwrap_or_else(|_| "{}".to_string());
            match std::fs::write(&config, content) {
                Ok(()) => info!(from = marker, "mirrored model marker to config.json"),
                Err(err) => warn!(error = %err, "failed to mirror {marker} to config.json"),
            }
        }
        return chosen;
    }
    base
}

/// What [`synthesize_transformer_files`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesisReport {
    /// Files created from scratch.
    pub created: Vec<String>,
    /// `added_tokens.json` was rewritten from list to mapping form.
    pub normalized_added_tokens: bool,
    /// `tokenizer_file` was added to an existing tokenizer config.
    pub linked_tokenizer_file: bool,
    /// `config.json` had hub references stripped.
    pub sanitized_config: bool,
}

/// Create the side files Transformers expects, then normalize and sanitize.
pub fn synthesize_transformer_files(model_dir: &Path) -> Result<SynthesisReport, ToolError> {
    let mut report = SynthesisReport::default();

    let config = model_dir.join("config.json");
    if !config.exists() {
        let picked = pick_config_candidate(model_dir).unwrap_or_else(|| Value::Object(Map::new()));
        std::fs::create_dir_all(model_dir).map_err(|e| ToolError::io(model_dir, e))?;
        write_json(&config, &picked, false)?;
        report.created.push("config.json".into());
    }

    let tokenizer_config = model_dir.join("tokenizer_config.json");
    if !tokenizer_config.exists() {
        let mut payload = Map::new();
        if model_dir.join("tokenizer.json").exists() {
            payload.insert("tokenizer_file".into(), Value::from("tokenizer.json"));
        } else if model_dir.join("tokenizer.model").exists() {
            payload.insert("model_max_length".into(), Value::from(32768));
        }
        write_json(&tokenizer_config, &Value::Object(payload), false)?;
        report.created.push("tokenizer_config.json".into());
    }

    for (name, default) in PLACEHOLDER_FILES {
        let target = model_dir.join(name);
        if target.exists() {
            continue;
        }
        std::fs::write(&target, default).map_err(|e| ToolError::io(&target, e))?;
        report.created.push(name.into());
    }

    for name in &report.created {
        info!(file = %name, "synthesized");
    }

    let (normalized, linked) = normalize_tokenizer_artifacts(model_dir)?;
    report.normalized_added_tokens = normalized;
    report.linked_tokenizer_file = linked;
    report.sanitized_config = sanitize_config_for_offline(model_dir)?;
    Ok(report)
}

fn pick_config_candidate(model_dir: &Path) -> Option<Value> {
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(model_dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    candidates.sort();
    candidates.iter().filter_map(|path| read_json(path)).find(|payload| {
        payload
            .as_object()
            .is_some_and(|obj| obj.contains_key("model_type") || obj.contains_key("architectures"))
    })
}

/// Convert list-form `added_tokens.json` to `{token: index}` and make sure the
/// tokenizer config points at `tokenizer.json` when it exists.
///
/// Returns `(added_tokens_rewritten, tokenizer_file_added)`.
pub fn normalize_tokenizer_artifacts(model_dir: &Path) -> Result<(bool, bool), ToolError> {
    let mut normalized = false;
    let added_tokens = model_dir.join("added_tokens.json");
    if let Some(Value::Array(items)) = read_json(&added_tokens) {
        let mapping: Map<String, Value> = items
            .iter()
            .enumerate()
            .filter_map(|(idx, item)| item.as_str().map(|token| (token.to_string(), Value::from(idx))))
            .collect();
        write_json(&added_tokens, &Value::Object(mapping), false)?;
        info!("normalized added_tokens.json to mapping form");
        normalized = true;
    }

    let tokenizer_config = model_dir.join("tokenizer_config.json");
    let mut config = match read_json(&tokenizer_config) {
        Some(Value::Object(map)) => map,
        Some(_) => return Ok((normalized, false)),
        None => Map::new(),
    };
    if config.contains_key("tokenizer_file") || !model_dir.join("tokenizer.json").exists() {
        return Ok((normalized, false));
    }
    config.insert("tokenizer_file".into(), Value::from("tokenizer.json"));
    write_json(&tokenizer_config, &Value::Object(config), false)?;
    info!("updated tokenizer_config.json tokenizer_file entry");
    Ok((normalized, true))
}

/// Replace hub repository references in `config.json` with `"."`.
///
/// Returns whether the file was rewritten.
pub fn sanitize_config_for_offline(model_dir: &Path) -> Result<bool, ToolError> {
    let path = model_dir.join("config.json");
    let Some(Value::Object(mut data)) = read_json(&path) else {
        return Ok(false);
    };

    let mut changed = false;
    for key in ["base_model_name_or_path", "_name_or_path"] {
        let points_at_hub = data.get(key).and_then(Value::as_str).is_some_and(|val| {
            !val.trim().is_empty()
                && (val.contains("meta-llama") || val.starts_with("hf://") || val.contains('/'))
        });
        if points_at_hub {
            data.insert(key.into(), Value::from("."));
            changed = true;
        }
    }

    if let Some(Value::Object(auto_map)) = data.get_mut("auto_map") {
        for value in auto_map.values_mut() {
            if let Some(text) = value.as_str().filter(|text| text.contains("meta-llama")) {
                *value = Value::from(text.replace(LEAKED_REPO_ID, "."));
                changed = true;
            }
        }
    }

    if changed {
        write_json(&path, &Value::Object(data), true)?;
    }
    Ok(changed)
}

/// Snapshot directory for a cache root.
///
/// Prefers the metadata record; falls back to the shallowest directory
/// holding a `config.json`.
pub fn locate_snapshot(cache_root: &Path) -> Option<PathBuf> {
    if let Some(meta) = read_snapshot_metadata(cache_root) {
        let recorded = absolutize(&expand_user(Path::new(&meta.snapshot_path)));
        if !meta.snapshot_path.is_empty() && recorded.exists() {
            return Some(recorded);
        }
    }
    if !cache_root.exists() {
        return None;
    }
    find_by_depth(cache_root, "config.json")
        .into_iter()
        .find_map(|path| path.parent().map(Path::to_path_buf))
}

/// Total size of regular files below `dir`.
pub fn disk_usage_bytes(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}

/// Summary of an installed snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotInfo {
    /// Model identifier.
    pub model_id: String,
    /// Cache root.
    pub cache_root: PathBuf,
    /// Snapshot directory, if one was found.
    pub snapshot: Option<PathBuf>,
    /// Metadata timestamp.
    pub updated_at: Option<String>,
    /// Disk usage in bytes.
    pub disk_usage: Option<u64>,
    /// `model_type` from `config.json`, when the file exists.
    pub model_type: Option<String>,
    /// Architectures joined with `, `.
    pub architectures: Option<String>,
}

impl SnapshotInfo {
    /// Inspect a snapshot.
    pub fn collect(model_id: &str, cache_root: &Path, snapshot: Option<&Path>) -> Self {
        let mut info = Self {
            model_id: model_id.to_string(),
            cache_root: cache_root.to_path_buf(),
            snapshot: snapshot.map(Path::to_path_buf),
            ..Self::default()
        };
        let Some(dir) = snapshot else {
            return info;
        };
        info.updated_at = read_snapshot_metadata(cache_root)
            .map(|meta| meta.updated_at)
            .filter(|stamp| !stamp.is_empty());
        info.disk_usage = Some(disk_usage_bytes(dir));

        let config = dir.join("config.json");
        if config.exists() {
            let payload = read_json(&config);
            info.model_type = Some(
                payload
                    .as_ref()
                    .and_then(|p| p.get("model_type"))
                    .map_or_else(|| "<unknown>".to_string(), render_scalar),
            );
            info.architectures = payload
                .as_ref()
                .and_then(|p| p.get("architectures"))
                .map(|arch| match arch {
                    Value::Array(items) => items.iter().map(render_scalar).collect::<Vec<_>>().join(", "),
                    other => render_scalar(other),
                })
                .filter(|arch| !arch.is_empty());
        }
        info
    }

    /// Human-readable report lines.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Model ID    : {}", self.model_id),
            format!("Cache root  : {}", self.cache_root.display()),
        ];
        let Some(snapshot) = &self.snapshot else {
            lines.push("Snapshot    : <missing>".into());
            return lines;
        };
        lines.push(format!("Snapshot    : {}", snapshot.display()));
        if let Some(stamp) = &self.updated_at {
            lines.push(format!("Updated at  : {stamp}"));
        }
        if let Some(bytes) = self.disk_usage {
            #[allow(clippy::cast_precision_loss)]
            let megabytes = bytes as f64 / (1024.0 * 1024.0);
            lines.push(format!("Disk usage  : {megabytes:.2} MB"));
        }
        if let Some(model_type) = &self.model_type {
            lines.push(format!("Model type  : {model_type}"));
        }
        if let Some(arch) = &self.architectures {
            lines.push(format!("Architectures: {arch}"));
        }
        lines
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Remove a cache directory tree. Refuses filesystem roots.
pub fn clean_cache_root(path: &Path) -> Result<(), ToolError> {
    if !path.exists() {
        return Ok(());
    }
    if path.parent().is_none() {
        return Err(ToolError::RefusedRootRemoval(path.to_path_buf()));
    }
    if let Err(err) = std::fs::remove_dir_all(path) {
        warn!(path = %path.display(), error = %err, "cache removal incomplete");
    }
    Ok(())
}
