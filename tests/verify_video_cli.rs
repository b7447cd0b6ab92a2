//! The `verify_video` binary end to end on synthetic videos.
//!
//! Flags are applied on top of the file and environment layers and the
//! result is validated once, so a flag can repair a bad layered value.
//! Uploads read from stdin keep the extension of `--stdin-name`.

use std::io::Write;
use std::process::{Command, Output, Stdio};

use serde_json::Value;

const WALKAROUND_ENV: [&str; 10] = [
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
];

fn command(args: &[&str], env: &[(&str, &str)]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_verify_video"));
    for key in WALKAROUND_ENV {
        cmd.env_remove(key);
    }
    cmd.env("RUST_LOG", "warn")
        .args(["--ui", "plain"])
        .args(args)
        .envs(env.iter().copied());
    cmd
}

fn verify_video(args: &[&str], env: &[(&str, &str)]) -> Output {
    command(args, env).output().expect("run verify_video")
}

fn verdict(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "exit {:?}: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("verdict json on stdout")
}

#[test]
fn prints_verdict_json() {
    let output = verify_video(&["--video", "stub://walkaround?frames=50"], &[]);
    let json = verdict(&output);
    assert_eq!(json["valid"], true);
    assert_eq!(json["total_frames"], 10);
    assert_eq!(json["car_detected_frames"], 10);
    assert_eq!(json["bbox_jumps"], 0);
}

#[test]
fn flag_overrides_invalid_env_value() {
    let output = verify_video(
        &["--video", "stub://walkaround?frames=50", "--frame-skip", "10"],
        &[("WALKAROUND_FRAME_SKIP", "0")],
    );
    assert_eq!(verdict(&output)["total_frames"], 5);
}

#[test]
fn any_label_flag_overrides_empty_label_file() {
    let mut file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("temp config");
    file.write_all(br#"{ "allowed_labels": [] }"#)
        .expect("write config");
    let config_path = file.path().to_string_lossy().into_owned();

    let output = verify_video(
        &["--video", "stub://walkaround?frames=20", "--any-label"],
        &[("WALKAROUND_CONFIG", config_path.as_str())],
    );
    assert_eq!(verdict(&output)["valid"], true);
}

#[test]
fn invalid_flag_value_is_a_fatal_error() {
    let output = verify_video(
        &["--video", "stub://walkaround?frames=20", "--frame-skip", "0"],
        &[],
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("frame_skip"));
}

#[test]
fn report_flag_includes_run_diagnostics() {
    let output = verify_video(
        &["--video", "stub://walkaround?frames=100&jump=70", "--report"],
        &[],
    );
    let json = verdict(&output);
    assert_eq!(json["verdict"]["bbox_jumps"], 1);
    assert_eq!(json["source_frames"], 100);
    assert_eq!(json["largest_jump"]["frame_index"], 70);
}

#[test]
fn stdin_upload_is_staged_with_its_original_extension() {
    let mut child = command(&["--stdin", "--stdin-name", "IMG_2565.MOV"], &[])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn verify_video");
    child
        .stdin
        .take()
        .expect("stdin pipe")
        .write_all(b"not a video")
        .expect("write upload");
    let output = child.wait_with_output().expect("wait for verify_video");

    // Garbage never decodes; the error names the staged temp file.
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("walkaround-"), "{stderr}");
    assert!(stderr.contains(".MOV"), "{stderr}");
}
