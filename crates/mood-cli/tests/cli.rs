//! CLI command integration tests.
//! Each test uses a temp directory via MOOD_DATA_DIR for full isolation.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn mood_cmd(data_dir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("mood").unwrap();
    cmd.env("MOOD_DATA_DIR", data_dir.path());
    cmd.env_remove("MOOD_CLASSIFIER_URL");
    cmd
}

fn stat_value(stdout: &str, label: &str) -> String {
    stdout
        .lines()
        .find(|l| l.starts_with(label))
        .map(|l| l[label.len()..].trim().to_string())
        .unwrap_or_default()
}

#[test]
fn stats_fresh_db() {
    let dir = TempDir::new().unwrap();
    mood_cmd(&dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("readings:      0"))
        .stdout(predicate::str::contains("conversations: 0"))
        .stdout(predicate::str::contains("patterns:      0"))
        .stdout(predicate::str::contains("classifier:    disabled"));
}

#[test]
fn analyze_reports_refined_mood() {
    let dir = TempDir::new().unwrap();
    mood_cmd(&dir)
        .args(["analyze", "I am so happy today!!!"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^(happy|excited)\s+\d\.\d\d  dramatic").unwrap())
        .stdout(predicate::str::contains("I am so happy today!!!"))
        .stdout(predicate::str::contains("(fast)").not());
}

#[test]
fn analyze_json_follows_conversation() {
    let dir = TempDir::new().unwrap();
    let output = mood_cmd(&dir)
        .args(["analyze", "--json", "I am furious!!!", "How are you?"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).expect("each line is JSON"))
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["mood"], "angry");
    assert_eq!(lines[0]["sequence"], 0);
    assert_eq!(lines[1]["mood"], "neutral");
    assert_eq!(lines[1]["sequence"], 1);
    assert!(lines[1]["confidence"].as_f64().unwrap() <= 0.3);
}

#[test]
fn analyze_requires_text() {
    let dir = TempDir::new().unwrap();
    mood_cmd(&dir).arg("analyze").assert().failure();
}

#[test]
fn history_lists_recorded_readings() {
    let dir = TempDir::new().unwrap();
    mood_cmd(&dir)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("(no readings yet)"));

    mood_cmd(&dir)
        .args(["analyze", "I feel so lonely tonight", "How are you?"])
        .assert()
        .success();

    let output = mood_cmd(&dir).arg("history").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    // oldest first
    assert!(lines[0].ends_with("I feel so lonely tonight"));
    assert!(lines[1].contains("neutral"));

    mood_cmd(&dir)
        .args(["history", "--limit", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("How are you?"))
        .stdout(predicate::str::contains("lonely").not());
}

#[test]
fn separate_runs_are_separate_conversations() {
    let dir = TempDir::new().unwrap();
    mood_cmd(&dir).args(["analyze", "hello there"]).assert().success();
    mood_cmd(&dir).args(["analyze", "hello again"]).assert().success();

    let output = mood_cmd(&dir).arg("stats").output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stat_value(&stdout, "readings:"), "2");
    assert_eq!(stat_value(&stdout, "conversations:"), "2");
    assert!(stdout.contains("moods:"));
}

#[test]
fn learned_patterns_persist_and_forget() {
    let dir = TempDir::new().unwrap();
    mood_cmd(&dir)
        .args(["analyze", "wonderful amazing fantastic vibes"])
        .assert()
        .success();

    let output = mood_cmd(&dir).arg("stats").output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stat_value(&stdout, "patterns:"), "1");

    mood_cmd(&dir)
        .arg("forget")
        .assert()
        .success()
        .stdout(predicate::str::contains("forgot 1 pattern(s)"));

    mood_cmd(&dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("patterns:      0"));
}

#[test]
fn chat_reads_stdin() {
    let dir = TempDir::new().unwrap();
    mood_cmd(&dir)
        .arg("chat")
        .write_stdin("I am furious!!!\n\nHow are you?\n/reset\n/quit\nI am so happy\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("fast     angry"))
        .stdout(predicate::str::contains("refined  angry"))
        .stdout(predicate::str::contains("~ neutral -> angry"))
        .stdout(predicate::str::contains("fast     neutral"))
        .stdout(predicate::str::contains("(conversation reset)"))
        .stdout(predicate::str::contains("so happy").not());
}

#[test]
fn unreachable_classifier_is_not_fatal() {
    let dir = TempDir::new().unwrap();
    mood_cmd(&dir)
        .args([
            "analyze",
            "--classifier-url",
            "http://127.0.0.1:9",
            "I am so happy today!!!",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("happy").or(predicate::str::contains("excited")));
}

#[test]
fn classifier_url_from_env_shows_in_stats() {
    let dir = TempDir::new().unwrap();
    mood_cmd(&dir)
        .env("MOOD_CLASSIFIER_URL", "http://localhost:11434")
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("classifier:    http://localhost:11434"));
}

#[test]
fn config_file_is_applied() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[gateway]\nendpoint = \"http://localhost:11434\"\n",
    )
    .unwrap();
    mood_cmd(&dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("classifier:    http://localhost:11434"));
}

#[test]
fn invalid_config_is_reported() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "low_confidence_threshold = 0.9\nhigh_confidence_threshold = 0.2\n",
    )
    .unwrap();
    mood_cmd(&dir)
        .args(["analyze", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"))
        .stderr(predicate::str::contains("low_confidence_threshold"));
}
