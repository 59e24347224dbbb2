use assert_cmd::Command;
use image::{Rgb, RgbImage};
use predicates::prelude::*;
use tempfile::TempDir;

fn graybatch() -> Command {
    let mut cmd = Command::cargo_bin("graybatch").unwrap();
    cmd.env_remove("RUST_LOG").env_remove("GRAYBATCH_CONFIG");
    cmd
}

fn write_inputs(dir: &TempDir) {
    let img = RgbImage::from_fn(6, 4, |x, y| Rgb([(x * 40) as u8, (y * 60) as u8, 90]));
    img.save_with_format(dir.path().join("a.png"), image::ImageFormat::Png).unwrap();
    img.save_with_format(dir.path().join("b.jpg"), image::ImageFormat::Jpeg).unwrap();
}

#[test]
fn converts_batch_and_prints_marker_last() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_inputs(&input);

    let assert = graybatch()
        .current_dir(input.path())
        .args(["a.png", "b.jpg", "missing.png", "-Q", "-o"])
        .arg(output.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed file at a.png"))
        .stdout(predicate::str::contains("Processed file at b.jpg"))
        .stdout(predicate::str::contains("Error when processing missing.png: cannot open"));

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines.last(), Some(&"Processing complete."));

    assert!(output.path().join("a.png").exists());
    assert!(output.path().join("b.jpg").exists());
}

#[test]
fn fail_on_error_sets_exit_status() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_inputs(&input);

    graybatch()
        .current_dir(input.path())
        .args(["a.png", "missing.png", "--fail-on-error", "-Q", "-o"])
        .arg(output.path())
        .assert()
        .code(2)
        .stdout(predicate::str::ends_with("Processing complete.\n"));

    graybatch()
        .current_dir(input.path())
        .args(["a.png", "--fail-on-error", "-Q", "-o"])
        .arg(output.path())
        .assert()
        .success();
}

#[test]
fn json_output_is_one_object_per_line() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_inputs(&input);

    let assert = graybatch()
        .current_dir(input.path())
        .args(["a.png", "c.bmp", "--json", "-Q", "-w", "2", "-o"])
        .arg(output.path())
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let records: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert_eq!(records.len(), 3);
    assert_eq!(records[2]["event"], "complete");
    assert_eq!(records[2]["total"], 2);
    assert!(records[..2].iter().any(|r| r["status"] == "success"));
    assert!(records[..2].iter().any(|r| r["kind"] == "open"));
}

#[test]
fn zero_workers_is_rejected() {
    let output = TempDir::new().unwrap();

    graybatch()
        .args(["a.png", "-w", "0", "-o"])
        .arg(output.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Worker count must be greater than 0"));
}

#[test]
fn example_config_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("graybatch.toml");

    graybatch()
        .args(["example-config", "-o"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated example TOML configuration"));
    assert!(path.exists());

    graybatch()
        .arg("config")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file is valid"));
}

#[test]
fn info_lists_output_encodings() {
    graybatch()
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("Output: .png (lossless)"))
        .stdout(predicate::str::contains("Output: .jpg (lossy, default quality)"));
}
