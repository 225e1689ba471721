//! Runs the smoke-test binary against model artifacts that cannot be loaded.

use std::path::Path;
use std::process::{Command, Output};

fn run_smoke_test(model: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_waste-smoke-test"))
        .arg("--model")
        .arg(model)
        .output()
        .unwrap()
}

#[test]
fn missing_manifest_prints_the_error_and_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_smoke_test(&dir.path().join("missing.onnx"));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("loading model..."));
    assert!(stdout.contains("❌ ERROR OCCURRED ❌"));
    assert!(stdout.contains("failed to read model manifest"));
    assert!(stdout.contains("missing.json"));
    assert!(!stdout.contains("MODEL LOADED SUCCESSFULLY"));
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn missing_model_graph_prints_the_error_and_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("model.json"),
        r#"{"vocab": ["biodegradable", "non_biodegradable"]}"#,
    )
    .unwrap();
    let output = run_smoke_test(&dir.path().join("model.onnx"));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("loading model..."));
    assert!(stdout.contains("❌ ERROR OCCURRED ❌"));
    assert!(stdout.contains("failed to load model"));
    assert_eq!(output.status.code(), Some(1));
}
