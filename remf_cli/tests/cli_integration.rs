use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// A short heating program on the simulated rig, starting at ambient so the
// first tick already lands on a checkpoint.
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[sampling]
interval_ms = 200

[rate]
target_mv_per_s = 0.004
stability_mv_per_s = 0.0005
window_s = 2.0

[measurement]
resistance = true
thermo_emf = true

[simulation]
ambient_mv = 0.0
time_scale = 10.0

[[steps]]
kind = "heating"
from_mv = 0.0
to_mv = 0.5
step_mv = 0.1
point_range_mv = 0.01
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["convert", "--mv", "4.096"], 0, "°C", "stdout")]
#[case(&["convert", "--mv", "-1.0"], 0, "mV =", "stdout")]
#[case(&["check"], 0, "config ok: 1 steps", "stdout")]
#[case(&["run", "--max-ticks", "3"], 0, "run complete: 3 ticks", "stdout")]
#[case(&["convert"], 2, "required", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("remf").unwrap();
    cmd.arg("--config").arg(&cfg).arg("--log-level").arg("error");
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        _ => {
            assert.stderr(predicate::str::contains(needle));
        }
    }
}

#[test]
fn convert_json_is_close_to_reference() {
    let out = Command::cargo_bin("remf")
        .unwrap()
        .args(["--json", "convert", "--mv", "4.096"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let c = v["celsius"].as_f64().unwrap();
    let k = v["kelvin"].as_f64().unwrap();
    assert!((c - 100.0).abs() < 0.1, "got {c}");
    assert!((k - c - 273.15).abs() < 1e-9);
}

#[test]
fn run_writes_results_file() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let out = dir.path().join("results.tsv");

    Command::cargo_bin("remf")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["--log-level", "error", "run", "--max-ticks", "3", "--output"])
        .arg(&out)
        .assert()
        .success();

    let text = fs::read_to_string(&out).unwrap();
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("Time\tBottomTemperature(mV)"));
    // The start checkpoint at ambient is recorded on the first tick
    let first = lines.next().expect("one measurement line");
    assert_eq!(first.split('\t').count(), 6);
}

#[test]
fn json_run_emits_json_lines() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = Command::cargo_bin("remf")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["--json", "--log-level", "error", "run", "--max-ticks", "2", "--samples"])
        .output()
        .unwrap();
    assert!(out.status.success());

    let stdout = String::from_utf8(out.stdout).unwrap();
    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).expect("each stdout line is JSON"))
        .collect();
    let kinds: Vec<&str> = events.iter().filter_map(|e| e["event"].as_str()).collect();
    assert!(kinds.contains(&"step_changed"));
    assert_eq!(kinds.iter().filter(|k| **k == "sample").count(), 2);
    assert_eq!(kinds.last(), Some(&"summary"));
    let summary = events.last().unwrap();
    assert_eq!(summary["ticks"], 2);
    assert_eq!(summary["finished"], false);
}

#[test]
fn bad_steps_csv_header_is_explained() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let csv = dir.path().join("steps.csv");
    fs::write(&csv, "kind,start,end\nheating,0,1\n").unwrap();

    Command::cargo_bin("remf")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("--steps")
        .arg(&csv)
        .arg("check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid headers in steps CSV"));
}

#[test]
fn steps_csv_replaces_toml_program() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let csv = dir.path().join("steps.csv");
    fs::write(
        &csv,
        "kind,from_mv,to_mv,step_mv,point_range_mv\nheating,0.0,4.0,0.1,0.01\ncooling,4.0,0.0,0.2,0.02\n",
    )
    .unwrap();

    Command::cargo_bin("remf")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("--steps")
        .arg(&csv)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("config ok: 2 steps"))
        .stdout(predicate::str::contains("cooling"));
}

#[rstest]
#[case("[rate]\nwindow_s = 0.0\n", "rate.window_s")]
#[case("[supply]\ncurrent_step_a = 5.0\n", "supply.current_step_a")]
#[case("[[steps]]\nkind = \"cooling\"\nfrom_mv = 0.0\nto_mv = 1.0\n", "ramps down")]
fn invalid_config_fails_with_reason(#[case] toml: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, toml).unwrap();

    Command::cargo_bin("remf")
        .unwrap()
        .arg("--config")
        .arg(&path)
        .arg("check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(needle));
}

#[test]
fn missing_config_is_json_error() {
    let dir = tempdir().unwrap();
    let out = Command::cargo_bin("remf")
        .unwrap()
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .args(["--json", "check"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8(out.stderr).unwrap();
    let v: serde_json::Value = serde_json::from_str(stderr.trim()).unwrap();
    assert_eq!(v["reason"], "Error");
    assert!(v["message"].as_str().unwrap().contains("read config"));
}
