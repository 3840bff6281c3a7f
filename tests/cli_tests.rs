// Integration tests for the screener binary: exit codes, output formats,
// config files and threshold overrides

use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn trial_json(action: &str, choice: i64, rt: i64, group: usize) -> String {
    format!(
        r#"{{"trial_type": "click-choice", "action_type": "{action}",
            "stims": [{{"id": "a", "file": "a.jpg", "width": 100, "height": 100}},
                      {{"id": "b", "file": "b.jpg", "width": 100, "height": 100}},
                      {{"id": "c", "file": "c.jpg", "width": 100, "height": 100}}],
            "choice_idx": {choice}, "rt": {rt}, "global_tup_idx": {group},
            "image_idx_map": [{g0}, {g1}, {g2}]}}"#,
        g0 = group * 10,
        g1 = group * 10 + 1,
        g2 = group * 10 + 2,
    )
}

fn write_log(entries: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[{}]", entries.join(",\n")).unwrap();
    file.flush().unwrap();
    file
}

/// Keep picks position g % 3, reject picks the next one: balanced and
/// contradiction-free
fn careful_log() -> NamedTempFile {
    let mut entries = vec![r#"{"trial_type": "instructions", "rt": 20000}"#.to_string()];
    for group in 0..12 {
        entries.push(trial_json("keep", (group % 3) as i64, 1200, group));
        entries.push(trial_json("reject", ((group + 1) % 3) as i64, 1000, group));
    }
    write_log(&entries)
}

fn speed_clicker_log() -> NamedTempFile {
    let entries: Vec<String> = (0..12)
        .flat_map(|group| {
            [
                trial_json("keep", (group % 3) as i64, 90, group),
                trial_json("reject", ((group + 1) % 3) as i64, 80, group),
            ]
        })
        .collect();
    write_log(&entries)
}

#[test]
fn test_careful_participant_exits_zero() {
    let log = careful_log();
    assert_cmd::cargo::cargo_bin_cmd!("screener")
        .arg(log.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("PASSED QUALITY CONTROL"))
        .stdout(predicate::str::contains("Trials evaluated: 24"));
}

#[test]
fn test_failing_participant_exits_one_with_reason() {
    let log = speed_clicker_log();
    assert_cmd::cargo::cargo_bin_cmd!("screener")
        .arg(log.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("FAILED QUALITY CONTROL"))
        .stdout(predicate::str::contains(
            "Reason: Your responses are too fast!",
        ));
}

#[test]
fn test_json_format_is_machine_readable() {
    let log = speed_clicker_log();
    let output = assert_cmd::cargo::cargo_bin_cmd!("screener")
        .arg("--format")
        .arg("json")
        .arg(log.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["all_passed"], false);
    assert_eq!(report["trial_count"], 24);
    assert_eq!(report["statistics"]["frac_too_fast"], 1.0);
    assert_eq!(report["verdicts"].as_array().unwrap().len(), 4);
    assert_eq!(report["verdicts"][2]["check"], "reaction_time");
    assert_eq!(report["verdicts"][2]["passed"], false);
}

#[test]
fn test_html_format_prints_debrief_markup() {
    let log = careful_log();
    assert_cmd::cargo::cargo_bin_cmd!("screener")
        .args(["--format", "html"])
        .arg(log.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("<br><br><hr><br>"))
        .stdout(predicate::str::contains("<font color=\"green\">"))
        .stdout(predicate::str::contains("never contradicted yourself"));
}

#[test]
fn test_threshold_override_changes_outcome() {
    let log = speed_clicker_log();
    assert_cmd::cargo::cargo_bin_cmd!("screener")
        .args(["--min-rt-ms", "50"])
        .arg(log.path())
        .assert()
        .success();
}

#[test]
fn test_config_file_is_applied() {
    let log = speed_clicker_log();
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, "max_frac_too_fast = 1.0").unwrap();
    writeln!(config, "attribute = \"memorable\"").unwrap();
    config.flush().unwrap();

    assert_cmd::cargo::cargo_bin_cmd!("screener")
        .arg("--config")
        .arg(config.path())
        .args(["--format", "html"])
        .arg(log.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("the least memorable"));
}

#[test]
fn test_invalid_config_file_is_an_error() {
    let log = careful_log();
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, "max_prob_random = 4.0").unwrap();
    config.flush().unwrap();

    assert_cmd::cargo::cargo_bin_cmd!("screener")
        .arg("--config")
        .arg(config.path())
        .arg(log.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_prob_random"));
}

#[test]
fn test_missing_log_is_an_error() {
    assert_cmd::cargo::cargo_bin_cmd!("screener")
        .arg("/nonexistent/practice.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read trial log"));
}

#[test]
fn test_malformed_trial_is_an_error() {
    let log = write_log(&[
        r#"{"trial_type": "click-choice", "action_type": "keep", "stims": [{"file": "a.jpg"}], "choice_idx": 3, "rt": 500}"#
            .to_string(),
    ]);
    assert_cmd::cargo::cargo_bin_cmd!("screener")
        .arg(log.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn test_debug_flag_logs_to_stderr() {
    let log = careful_log();
    assert_cmd::cargo::cargo_bin_cmd!("screener")
        .arg("--debug")
        .arg(log.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("quality gate evaluated"));
}
