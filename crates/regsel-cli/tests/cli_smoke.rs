//! CLI binary smoke tests using assert_cmd.
//!
//! These tests run the compiled `regsel` binary end-to-end: argument parsing,
//! the configuration template, a full training run and prediction.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("regsel").unwrap()
}

fn write_line_csv(path: &Path, n: usize) {
    let mut body = String::from("x,y\n");
    for i in 0..n {
        body.push_str(&format!("{},{}\n", i, 2 * i + 1));
    }
    fs::write(path, body).unwrap();
}

fn write_config(dir: &Path, data: &Path, candidates: &str) -> std::path::PathBuf {
    let config = format!(
        r#"{{
            "data": {{ "path": "{}", "artifact_dir": "{}" }},
            "model_path": "{}",
            "candidates": {}
        }}"#,
        data.display(),
        dir.join("artifact").display(),
        dir.join("artifact").join("model.json").display(),
        candidates
    );
    let path = dir.join("config.json");
    fs::write(&path, config).unwrap();
    path
}

const LINEAR_ONLY: &str = r#"[{"name": "Linear Regression", "model": "linear_regression"}]"#;

// ---------------------------------------------------------------------------
// Top-level
// ---------------------------------------------------------------------------

#[test]
fn no_args_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_flag() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("train"))
        .stdout(predicate::str::contains("predict"));
}

#[test]
fn version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("regsel"));
}

// ---------------------------------------------------------------------------
// train
// ---------------------------------------------------------------------------

#[test]
fn train_no_config_prints_template() {
    cmd()
        .arg("train")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"quality_floor\""))
        .stdout(predicate::str::contains("\"Gradient Boosting\""))
        .stderr(predicate::str::contains("No config file provided"));
}

#[test]
fn train_nonexistent_config_errors() {
    cmd()
        .args(["train", "/nonexistent/config.json"])
        .assert()
        .failure();
}

#[test]
fn train_then_predict() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("line.csv");
    write_line_csv(&data, 50);
    let config = write_config(dir.path(), &data, LINEAR_ONLY);

    cmd()
        .arg("train")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Best Model selected: Linear Regression"))
        .stdout(predicate::str::contains("Test Dataset Metrics"));

    let artifact = dir.path().join("artifact");
    for file in ["raw.csv", "train.csv", "test.csv", "model.json", "metrics.json", "report.html"] {
        assert!(artifact.join(file).exists(), "missing {}", file);
    }

    let features = dir.path().join("features.csv");
    fs::write(&features, "x\n0\n10\n").unwrap();
    let output = cmd()
        .arg("predict")
        .arg("-m")
        .arg(artifact.join("model.json"))
        .arg("-d")
        .arg(&features)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let predictions: Vec<f64> = stdout.lines().map(|l| l.parse().unwrap()).collect();
    assert_eq!(predictions.len(), 2);
    assert!((predictions[0] - 1.0).abs() < 1e-8);
    assert!((predictions[1] - 21.0).abs() < 1e-8);
}

#[test]
fn data_override_and_no_report() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("line.csv");
    write_line_csv(&data, 40);
    let unused = dir.path().join("unused.csv");
    write_line_csv(&unused, 40);
    let config = write_config(dir.path(), &unused, LINEAR_ONLY);
    let model = dir.path().join("out").join("custom.json");

    cmd()
        .arg("train")
        .arg(&config)
        .arg("-d")
        .arg(&data)
        .arg("-o")
        .arg(&model)
        .arg("--no-report")
        .assert()
        .success();

    assert!(model.exists());
    assert!(dir.path().join("out").join("metrics.json").exists());
    assert!(!dir.path().join("artifact").join("report.html").exists());
}

#[test]
fn quality_floor_failure_exits_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("line.csv");
    write_line_csv(&data, 40);
    let config = write_config(dir.path(), &data, LINEAR_ONLY);

    // nothing can beat a floor above 1
    cmd()
        .arg("train")
        .arg(&config)
        .args(["--quality-floor", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No usable model produced"));

    assert!(!dir.path().join("artifact").join("model.json").exists());
}

#[test]
fn train_rejects_unknown_extension() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("line.dat");
    write_line_csv(&data, 20);
    cmd()
        .args(["train", "-d"])
        .arg(&data)
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// predict
// ---------------------------------------------------------------------------

#[test]
fn predict_requires_model_and_data() {
    cmd().arg("predict").assert().failure();
}

#[test]
fn predict_missing_model_errors() {
    let dir = tempfile::tempdir().unwrap();
    let features = dir.path().join("features.csv");
    fs::write(&features, "x\n1\n").unwrap();
    cmd()
        .args(["predict", "-m", "/nonexistent/model.json", "-d"])
        .arg(&features)
        .assert()
        .failure();
}
