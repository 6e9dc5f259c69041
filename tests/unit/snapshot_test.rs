//! Tests for snapshot repair and inspection

use std::fs;
use std::path::Path;

use chrono::Utc;
use serde_json::{json, Value};
use vllm_extras::modelscope::{
    clean_cache_root, locate_snapshot, normalize_tokenizer_artifacts, resolve_model_root, sanitize_config_for_offline,
    synthesize_transformer_files, write_snapshot_metadata, SnapshotInfo,
};

fn read(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn write(path: &Path, value: &Value) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, value.to_string()).unwrap();
}

#[test]
fn test_resolve_model_root_prefers_shallowest() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().canonicalize().unwrap();
    write(&base.join("b/deep/x/config.json"), &json!({}));
    write(&base.join("a/config.json"), &json!({}));
    write(&base.join("c/config.json"), &json!({}));
    assert_eq!(resolve_model_root(&base), base.join("a"));
}

#[test]
fn test_resolve_model_root_mirrors_configuration_json() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().canonicalize().unwrap();
    write(&base.join("nested/configuration.json"), &json!({"model_type": "qwen2"}));
    let root = resolve_model_root(&base);
    assert_eq!(root, base.join("nested"));
    assert_eq!(read(&root.join("config.json"))["model_type"], "qwen2");
}

#[test]
fn test_resolve_model_root_missing_dir_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().canonicalize().unwrap().join("nope");
    assert_eq!(resolve_model_root(&missing), missing);
}

#[test]
fn test_synthesize_fills_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path();
    write(&model.join("a_weights_index.json"), &json!({"weight_map": {}}));
    write(&model.join("b_model.json"), &json!({"architectures": ["QWenLMHeadModel"]}));
    fs::write(model.join("tokenizer.json"), "{}").unwrap();

    let report = synthesize_transformer_files(model).unwrap();
    assert!(report.created.contains(&"config.json".to_string()));
    assert!(report.created.contains(&"tokenizer_config.json".to_string()));
    assert_eq!(read(&model.join("config.json"))["architectures"][0], "QWenLMHeadModel");
    assert_eq!(read(&model.join("tokenizer_config.json"))["tokenizer_file"], "tokenizer.json");
    assert_eq!(read(&model.join("special_tokens_map.json")), json!({}));
    assert_eq!(read(&model.join("generation_config.json")), json!({}));
    assert_eq!(read(&model.join("preprocessor_config.json")), json!({}));
    // the placeholder list is normalized to mapping form straight away
    assert_eq!(read(&model.join("added_tokens.json")), json!({}));
    assert!(report.normalized_added_tokens);
}

#[test]
fn test_synthesize_sentencepiece_tokenizer() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path();
    fs::write(model.join("tokenizer.model"), b"spm").unwrap();
    synthesize_transformer_files(model).unwrap();
    assert_eq!(read(&model.join("config.json")), json!({}));
    assert_eq!(read(&model.join("tokenizer_config.json")), json!({"model_max_length": 32768}));
}

#[test]
fn test_synthesize_keeps_existing_files() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path();
    write(&model.join("config.json"), &json!({"model_type": "llama"}));
    write(&model.join("generation_config.json"), &json!({"max_new_tokens": 8}));
    let report = synthesize_transformer_files(model).unwrap();
    assert!(!report.created.contains(&"config.json".to_string()));
    assert_eq!(read(&model.join("generation_config.json"))["max_new_tokens"], 8);
}

#[test]
fn test_normalize_added_tokens_list() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path();
    write(&model.join("added_tokens.json"), &json!(["<a>", 5, "<b>"]));
    write(&model.join("tokenizer_config.json"), &json!({"padding_side": "left"}));
    fs::write(model.join("tokenizer.json"), "{}").unwrap();

    let (normalized, linked) = normalize_tokenizer_artifacts(model).unwrap();
    assert!(normalized && linked);
    assert_eq!(read(&model.join("added_tokens.json")), json!({"<a>": 0, "<b>": 2}));
    let cfg = read(&model.join("tokenizer_config.json"));
    assert_eq!(cfg["padding_side"], "left");
    assert_eq!(cfg["tokenizer_file"], "tokenizer.json");

    assert_eq!(normalize_tokenizer_artifacts(model).unwrap(), (false, false));
}

#[test]
fn test_sanitize_config_for_offline() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path();
    write(
        &model.join("config.json"),
        &json!({
            "_name_or_path": "meta-llama/Meta-Llama-3-8B-Instruct",
            "base_model_name_or_path": "local-name",
            "auto_map": {"AutoModel": "meta-llama/Meta-Llama-3-8B-Instruct--modeling.Model", "Other": "mod.Cls"}
        }),
    );
    assert!(sanitize_config_for_offline(model).unwrap());
    let cfg = read(&model.join("config.json"));
    assert_eq!(cfg["_name_or_path"], ".");
    assert_eq!(cfg["base_model_name_or_path"], "local-name");
    assert_eq!(cfg["auto_map"]["AutoModel"], ".--modeling.Model");
    assert_eq!(cfg["auto_map"]["Other"], "mod.Cls");
    assert!(fs::read_to_string(model.join("config.json")).unwrap().contains("\n  "));

    assert!(!sanitize_config_for_offline(model).unwrap());
}

#[test]
fn test_locate_snapshot_via_metadata_and_scan() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().canonicalize().unwrap();
    assert!(locate_snapshot(&cache.join("missing")).is_none());

    write(&cache.join("models/org/m/config.json"), &json!({"model_type": "qwen2", "architectures": ["A", "B"]}));
    assert_eq!(locate_snapshot(&cache), Some(cache.join("models/org/m")));

    let snapshot = cache.join("models/org/m");
    write_snapshot_metadata(&cache, " org/m ", &snapshot, Utc::now()).unwrap();
    let meta = read(&cache.join(".modelscope-manage.json"));
    assert_eq!(meta["model_id"], "org/m");
    assert!(meta["updated_at"].as_str().unwrap().ends_with('Z'));
    assert_eq!(locate_snapshot(&cache), Some(snapshot.clone()));

    let info = SnapshotInfo::collect("org/m", &cache, Some(&snapshot));
    assert_eq!(info.model_type.as_deref(), Some("qwen2"));
    assert_eq!(info.architectures.as_deref(), Some("A, B"));
    let lines = info.lines();
    assert_eq!(lines[0], "Model ID    : org/m");
    assert!(lines.iter().any(|l| l.starts_with("Disk usage  : ") && l.ends_with(" MB")));
    assert!(lines.iter().any(|l| l == "Architectures: A, B"));
}

#[test]
fn test_snapshot_info_missing_snapshot() {
    let info = SnapshotInfo::collect("org/m", Path::new("/cache"), None);
    assert_eq!(info.lines().last().unwrap(), "Snapshot    : <missing>");
}

#[test]
fn test_clean_cache_root() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("cache");
    write(&target.join("x/file.json"), &json!({}));
    clean_cache_root(&target).unwrap();
    assert!(!target.exists());
    clean_cache_root(&target).unwrap();
    assert_eq!(
        clean_cache_root(Path::new("/")).unwrap_err().to_string(),
        "Refusing to remove root directory: /"
    );
}
