use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use walkaround_verify::config::{FailurePolicy, VerifyConfig};
use walkaround_verify::{LabelFilter, VerifyError};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "WALKAROUND_CONFIG",
        "WALKAROUND_FRAME_SKIP",
        "WALKAROUND_ALLOWED_LABELS",
        "WALKAROUND_MIN_PRESENCE_RATIO",
        "WALKAROUND_JUMP_THRESHOLD",
        "WALKAROUND_MIN_CONFIDENCE",
        "WALKAROUND_FAILURE_POLICY",
        "WALKAROUND_PIPELINE_DEPTH",
        "WALKAROUND_BACKEND",
        "WALKAROUND_MODEL_PATH",
    ] {
        std::env::remove_var(key);
    }
}

fn config_file(suffix: &str, body: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("temp config");
    file.write_all(body.as_bytes()).expect("write config");
    file
}

#[test]
fn defaults_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();

    let cfg = VerifyConfig::load().expect("load defaults");
    assert_eq!(cfg, VerifyConfig::default());
    assert_eq!(cfg.label_filter(), LabelFilter::only(["car"]));
}

#[test]
fn loads_json_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();

    let file = config_file(
        ".json",
        r#"{
            "frame_skip": 3,
            "allowed_labels": ["car", "truck"],
            "min_presence_ratio": 0.7,
            "jump_threshold": 150.0,
            "failure_policy": "abort",
            "pipeline": { "depth": 4, "batch_size": 2 },
            "detector": { "backend": "stub" }
        }"#,
    );
    std::env::set_var("WALKAROUND_CONFIG", file.path());
    std::env::set_var("WALKAROUND_FRAME_SKIP", "10");
    std::env::set_var("WALKAROUND_ALLOWED_LABELS", "bus, van");

    let cfg = VerifyConfig::load().expect("load config");
    assert_eq!(cfg.frame_skip, 10);
    assert_eq!(cfg.allowed_labels, vec!["bus", "van"]);
    assert_eq!(cfg.min_presence_ratio, 0.7);
    assert_eq!(cfg.jump_threshold, 150.0);
    assert_eq!(cfg.failure_policy, FailurePolicy::Abort);
    assert_eq!(cfg.pipeline_depth, 4);
    assert_eq!(cfg.batch_size, 2);
    assert_eq!(cfg.backend, "stub");
    assert_eq!(cfg.model_path, None);

    clear_env();
}

#[test]
fn loads_toml_file_by_extension() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();

    let file = config_file(
        ".toml",
        r#"
frame_skip = 2
allow_any_label = true
allowed_labels = []
min_confidence = 0.4

[detector]
backend = "tract"
model_path = "/models/yolo.onnx"
"#,
    );
    std::env::set_var("WALKAROUND_CONFIG", file.path());
    std::env::set_var("WALKAROUND_PIPELINE_DEPTH", "8");

    let cfg = VerifyConfig::load().expect("load toml config");
    assert_eq!(cfg.frame_skip, 2);
    assert_eq!(cfg.label_filter(), LabelFilter::Any);
    assert_eq!(cfg.min_confidence, 0.4);
    assert_eq!(cfg.backend, "tract");
    assert_eq!(cfg.model_path, Some(PathBuf::from("/models/yolo.onnx")));
    assert_eq!(cfg.pipeline_depth, 8);
    assert_eq!(cfg.batch_size, 1);

    clear_env();
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());

    for (key, value) in [
        ("WALKAROUND_FRAME_SKIP", "0"),
        ("WALKAROUND_FRAME_SKIP", "five"),
        ("WALKAROUND_MIN_PRESENCE_RATIO", "1.2"),
        ("WALKAROUND_JUMP_THRESHOLD", "-1"),
        ("WALKAROUND_MIN_CONFIDENCE", "2"),
        ("WALKAROUND_FAILURE_POLICY", "retry"),
        ("WALKAROUND_PIPELINE_DEPTH", "deep"),
    ] {
        clear_env();
        std::env::set_var(key, value);
        let err = VerifyConfig::load().expect_err(key);
        assert!(
            matches!(err, VerifyError::InvalidConfiguration(_)),
            "{key}={value}: {err}"
        );
    }

    clear_env();
}

#[test]
fn rejects_empty_label_set_without_any() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();

    let file = config_file(".json", r#"{ "allowed_labels": [] }"#);
    std::env::set_var("WALKAROUND_CONFIG", file.path());
    let err = VerifyConfig::load().expect_err("empty labels");
    assert!(err.to_string().contains("allowed_labels"));

    clear_env();
}

#[test]
fn reports_unreadable_and_malformed_files() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();

    std::env::set_var("WALKAROUND_CONFIG", "/nonexistent/walkaround.json");
    assert!(matches!(
        VerifyConfig::load(),
        Err(VerifyError::InvalidConfiguration(_))
    ));

    let file = config_file(".json", "{ frame_skip: ");
    std::env::set_var("WALKAROUND_CONFIG", file.path());
    assert!(matches!(
        VerifyConfig::load(),
        Err(VerifyError::InvalidConfiguration(_))
    ));

    clear_env();
}

#[test]
fn layered_leaves_validation_to_the_caller() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();

    let file = config_file(".json", r#"{ "allowed_labels": [] }"#);
    std::env::set_var("WALKAROUND_CONFIG", file.path());
    std::env::set_var("WALKAROUND_FRAME_SKIP", "0");

    let mut cfg = VerifyConfig::layered().expect("layered config");
    assert_eq!(cfg.frame_skip, 0);
    assert!(cfg.allowed_labels.is_empty());
    assert!(cfg.clone().validate().is_err());

    // Overrides applied after layering repair both values.
    cfg.frame_skip = 5;
    cfg.allow_any_label = true;
    cfg.validate().expect("overrides repair the layered values");
    assert_eq!(cfg.label_filter(), LabelFilter::Any);

    clear_env();
}
