use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;

fn cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("healthbridge"));
    cmd.env_remove("RUST_LOG")
        .env_remove("HEALTHBRIDGE_DEFAULT_TYPE")
        .env_remove("HEALTHBRIDGE_LOG");
    cmd
}

fn repo_root() -> std::path::PathBuf {
    let manifest = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest
        .parent()
        .and_then(|p| p.parent())
        .expect("repo root")
        .to_path_buf()
}

fn sample_capture() -> std::path::PathBuf {
    repo_root().join("tests").join("fixtures").join("capture.jsonl")
}

fn clean_capture(temp: &TempDir) -> std::path::PathBuf {
    let capture = temp.path().join("clean.jsonl");
    cmd()
        .arg("simulate")
        .arg("--devices")
        .arg("3")
        .arg("--frames")
        .arg("5")
        .arg("-o")
        .arg(&capture)
        .assert()
        .success();
    capture
}

fn stdout_json(assert: &assert_cmd::assert::Assert) -> Value {
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    serde_json::from_str(&stdout).expect("valid json")
}

#[test]
fn help_lists_subcommands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("replay").and(contains("simulate")).and(contains("serve")));
    cmd().arg("replay").arg("--help").assert().success();
}

#[test]
fn missing_input_shows_error_and_hint() {
    let temp = TempDir::new().expect("tempdir");
    let missing = temp.path().join("missing.jsonl");
    let report = temp.path().join("report.json");

    cmd()
        .arg("replay")
        .arg(missing)
        .arg("-o")
        .arg(report)
        .assert()
        .failure()
        .code(2)
        .stderr(contains("error:").and(contains("hint:")));
}

#[test]
fn unsupported_extension_is_rejected() {
    let temp = TempDir::new().expect("tempdir");
    let input = temp.path().join("capture.pcap");
    std::fs::write(&input, b"").expect("write input");

    cmd()
        .arg("replay")
        .arg(input)
        .arg("--stdout")
        .assert()
        .failure()
        .stderr(contains("unsupported input format"));
}

#[test]
fn stdout_outputs_json_report() {
    let assert = cmd()
        .arg("replay")
        .arg(sample_capture())
        .arg("--stdout")
        .assert()
        .success();
    let report = stdout_json(&assert);

    assert_eq!(report["report_version"], 1);
    assert_eq!(report["frames_total"], 6);
    assert_eq!(report["devices"][0]["device_id"], "band-a");
    assert_eq!(report["devices"][1]["first_byte_mismatches"], 1);
    assert_eq!(report["registry"]["total_instances"], 2);
}

#[test]
fn stdout_and_report_conflict() {
    let temp = TempDir::new().expect("tempdir");
    let report = temp.path().join("report.json");

    cmd()
        .arg("replay")
        .arg(sample_capture())
        .arg("--stdout")
        .arg("-o")
        .arg(report)
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn pretty_and_compact_conflict() {
    let temp = TempDir::new().expect("tempdir");
    let report = temp.path().join("report.json");

    cmd()
        .arg("replay")
        .arg(sample_capture())
        .arg("-o")
        .arg(report)
        .arg("--pretty")
        .arg("--compact")
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn report_is_written_and_announced() {
    let temp = TempDir::new().expect("tempdir");
    let report = temp.path().join("out").join("report.json");

    cmd()
        .arg("replay")
        .arg(sample_capture())
        .arg("-o")
        .arg(&report)
        .arg("--pretty")
        .assert()
        .success()
        .stderr(contains("OK: report written"));

    let text = std::fs::read_to_string(&report).expect("report");
    assert!(text.contains("\n  \"report_version\""));
}

#[test]
fn quiet_suppresses_ok_message() {
    let temp = TempDir::new().expect("tempdir");
    let report = temp.path().join("report.json");

    cmd()
        .arg("replay")
        .arg(sample_capture())
        .arg("-o")
        .arg(report)
        .arg("--quiet")
        .assert()
        .success()
        .stderr(contains("OK:").not().and(contains("WARN").not()));
}

#[test]
fn strict_fails_when_frames_have_issues() {
    let temp = TempDir::new().expect("tempdir");
    let report = temp.path().join("report.json");

    cmd()
        .arg("replay")
        .arg(sample_capture())
        .arg("-o")
        .arg(&report)
        .arg("--strict")
        .arg("--quiet")
        .assert()
        .failure()
        .code(2)
        .stderr(contains("frame issues detected"));
    assert!(report.exists());
}

#[test]
fn strict_passes_on_clean_simulated_capture() {
    let temp = TempDir::new().expect("tempdir");
    let capture = clean_capture(&temp);

    let assert = cmd()
        .arg("replay")
        .arg(&capture)
        .arg("--stdout")
        .arg("--strict")
        .assert()
        .success();
    let report = stdout_json(&assert);
    assert_eq!(report["frames_total"], 15);
    assert_eq!(report["devices"].as_array().map(Vec::len), Some(3));
    assert_eq!(report["devices"][2]["decoded"], 5);
}

#[test]
fn corrupted_simulation_fails_strict_replay() {
    let temp = TempDir::new().expect("tempdir");
    let capture = temp.path().join("corrupt.jsonl");
    cmd()
        .arg("simulate")
        .arg("--devices")
        .arg("1")
        .arg("--frames")
        .arg("4")
        .arg("--corrupt-every")
        .arg("2")
        .arg("-o")
        .arg(&capture)
        .assert()
        .success();

    let assert = cmd()
        .arg("replay")
        .arg(&capture)
        .arg("--stdout")
        .arg("--strict")
        .assert()
        .failure();
    let report = stdout_json(&assert);
    assert_eq!(report["devices"][0]["checksum_mismatches"], 2);
}

#[test]
fn glob_pattern_resolves_single_match() {
    let temp = TempDir::new().expect("tempdir");
    clean_capture(&temp);
    let pattern = temp.path().join("*.jsonl");

    cmd()
        .arg("replay")
        .arg(pattern)
        .arg("--stdout")
        .assert()
        .success();
}

#[test]
fn glob_pattern_with_several_matches_fails() {
    let temp = TempDir::new().expect("tempdir");
    let capture = clean_capture(&temp);
    std::fs::copy(&capture, temp.path().join("copy.jsonl")).expect("copy capture");
    let pattern = temp.path().join("*.jsonl");

    cmd()
        .arg("replay")
        .arg(pattern)
        .arg("--stdout")
        .assert()
        .failure()
        .stderr(contains("multiple files match pattern").and(contains("hint:")));
}

#[test]
fn report_cannot_overwrite_input() {
    let temp = TempDir::new().expect("tempdir");
    let capture = clean_capture(&temp);

    cmd()
        .arg("replay")
        .arg(&capture)
        .arg("-o")
        .arg(&capture)
        .assert()
        .failure()
        .stderr(contains("report path must differ from input"));
}

#[test]
fn type_flag_sets_default_for_new_sessions() {
    let assert = cmd()
        .arg("replay")
        .arg(sample_capture())
        .arg("--stdout")
        .arg("--type")
        .arg("6")
        .assert()
        .success();
    let report = stdout_json(&assert);

    // band-a carries an explicit type in the capture; band-b does not.
    assert_eq!(report["devices"][0]["last_snapshot"]["type"], 3);
    assert_eq!(report["devices"][1]["last_snapshot"]["type"], 6);
}

#[test]
fn config_file_sets_default_type() {
    let temp = TempDir::new().expect("tempdir");
    let config = temp.path().join("bridge.toml");
    std::fs::write(&config, "default_type = 8\nlog_level = \"warn\"\n").expect("write config");

    let assert = cmd()
        .arg("replay")
        .arg(sample_capture())
        .arg("--stdout")
        .arg("--config")
        .arg(&config)
        .assert()
        .success();
    let report = stdout_json(&assert);
    assert_eq!(report["devices"][1]["last_snapshot"]["type"], 8);
}

#[test]
fn env_overrides_config_file() {
    let temp = TempDir::new().expect("tempdir");
    let config = temp.path().join("bridge.toml");
    std::fs::write(&config, "default_type = 8\n").expect("write config");

    let assert = cmd()
        .env("HEALTHBRIDGE_DEFAULT_TYPE", "9")
        .arg("replay")
        .arg(sample_capture())
        .arg("--stdout")
        .arg("--config")
        .arg(&config)
        .assert()
        .success();
    let report = stdout_json(&assert);
    assert_eq!(report["devices"][1]["last_snapshot"]["type"], 9);
}

#[test]
fn invalid_config_shows_error_and_hint() {
    let temp = TempDir::new().expect("tempdir");
    let config = temp.path().join("bridge.toml");
    std::fs::write(&config, "default_type = \"three\"\n").expect("write config");

    cmd()
        .arg("replay")
        .arg(sample_capture())
        .arg("--stdout")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .code(2)
        .stderr(contains("failed to parse config file").and(contains("hint:")));
}

#[test]
fn simulate_to_stdout_writes_capture_lines() {
    let assert = cmd()
        .arg("simulate")
        .arg("--devices")
        .arg("2")
        .arg("--frames")
        .arg("3")
        .arg("--type")
        .arg("5")
        .arg("--stdout")
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    let lines: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();

    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0]["device_id"], "band-1");
    assert_eq!(lines[1]["device_id"], "band-2");
    assert_eq!(lines[0]["type"], 5);
    assert!(lines[2].get("type").is_none());
}

#[test]
fn simulate_rejects_zero_devices() {
    cmd()
        .arg("simulate")
        .arg("--devices")
        .arg("0")
        .arg("--stdout")
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn serve_answers_one_reply_per_call() {
    // First frame of band-a in the fixture capture.
    let data: [u8; 21] = [
        0xFF, 0x11, 0xE8, 0x03, 0x00, 0x00, 0x3E, 0x0E, 0x42, 0x0E, 0x2D, 0x58, 0x01, 0xFE, 0x03,
        0x02, 0x0A, 0x14, 0x1E, 0x28, 0x84,
    ];
    let calls = [
        r#"{"method":"initialize","type":4}"#.to_string(),
        format!(r#"{{"method":"splitPackage","device_id":"A","data":{data:?}}}"#),
        String::new(),
        r#"{"method":"splitPackage","device_id":"A","data":[]}"#.to_string(),
        r#"{"method":"getStatus","device_id":"A"}"#.to_string(),
        r#"{"method":"reboot"}"#.to_string(),
        r#"{"method":"dispose"}"#.to_string(),
    ]
    .join("\n");

    let assert = cmd().arg("serve").write_stdin(calls).assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    let replies: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("json reply"))
        .collect();

    assert_eq!(replies.len(), 6);
    assert_eq!(replies[0]["result"], "Default type set to 4");
    assert_eq!(replies[1]["result"]["status_code"], -1);
    assert_eq!(replies[1]["result"]["type"], 4);
    assert_eq!(replies[1]["result"]["heart_rate"], 62);
    assert_eq!(replies[2]["error"]["code"], "EMPTY_DATA");
    assert_eq!(replies[3]["result"]["has_instance"], true);
    assert_eq!(replies[4]["error"]["code"], "NOT_IMPLEMENTED");
    assert_eq!(replies[5]["result"], "Disposed all 1 devices");
}
