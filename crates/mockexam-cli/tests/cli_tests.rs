//! CLI integration tests using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn mockexam() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("mockexam").unwrap()
}

/// A temp directory initialised with the sample banks and a config that
/// keeps all state inside it.
fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    mockexam()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .arg("init")
        .assert()
        .success();

    let data_dir = dir.path().join("data");
    std::fs::write(
        dir.path().join("mockexam.toml"),
        format!(
            "user_id = 'tester'\ndata_dir = '{}'\nsubmit_timeout_secs = 10\n\n\
             [remote]\ntype = 'local'\nbank_dir = 'question-banks'\n",
            data_dir.display()
        ),
    )
    .unwrap();
    dir
}

fn mockexam_in(dir: &TempDir) -> Command {
    let mut cmd = mockexam();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env_remove("MOCKEXAM_USER")
        .env_remove("MOCKEXAM_API_KEY");
    cmd
}

#[test]
fn help_output() {
    mockexam()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Timed, resumable mock exams"));
}

#[test]
fn version_output() {
    mockexam()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mockexam"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    mockexam()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created mockexam.toml"))
        .stdout(predicate::str::contains("Created question-banks/part_a.toml"));

    assert!(dir.path().join("mockexam.toml").exists());
    assert!(dir.path().join("question-banks/part_b.toml").exists());
}

#[test]
fn init_skips_existing() {
    let dir = workspace();

    mockexam_in(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn validate_sample_banks() {
    let dir = workspace();

    mockexam_in(&dir)
        .args(["validate", "--banks", "question-banks"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[part_a] (3 questions)"))
        .stdout(predicate::str::contains("[part_b] (2 questions)"))
        .stdout(predicate::str::contains("All question banks valid"));
}

#[test]
fn validate_nonexistent_file() {
    mockexam()
        .args(["validate", "--banks", "nonexistent.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = workspace();

    mockexam_in(&dir)
        .args(["--config", "nope.toml", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn history_starts_empty() {
    let dir = workspace();

    mockexam_in(&dir)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("No completed attempts."));
}

#[test]
fn history_rejects_unknown_format() {
    let dir = workspace();

    mockexam_in(&dir)
        .args(["history", "--format", "xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown format"));
}

#[test]
fn complete_attempt_offline() {
    let dir = workspace();

    // right, wrong, skipped
    mockexam_in(&dir)
        .args(["start", "--part", "part_a"])
        .write_stdin("2\nc\nn\n2\nc\nn\ns\nn\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Starting Part A"))
        .stdout(predicate::str::contains("Correct!"))
        .stdout(predicate::str::contains("Incorrect. The answer is 1) 1500 mg"))
        .stdout(predicate::str::contains("Score: 33% (1/3 correct, 2 answered)"))
        .stdout(predicate::str::contains("Result: FAIL"));

    mockexam_in(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No attempt in progress"));

    let output = mockexam_in(&dir)
        .args(["history", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let rows: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["score_percentage"], 33);
    assert_eq!(rows[0]["exam_part"], "part_a");

    let session_id = rows[0]["session_id"].as_str().unwrap().to_string();
    mockexam_in(&dir)
        .args(["review", &session_id[..8], "--incorrect-only"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1500 mg"))
        .stdout(predicate::str::contains("skipped"))
        .stdout(predicate::str::contains("tablets?").not());

    mockexam_in(&dir)
        .args(["history", "--part", "part_b"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No completed attempts."));
}

#[test]
fn quit_then_resume() {
    let dir = workspace();

    mockexam_in(&dir)
        .args(["start", "--part", "part_a"])
        .write_stdin("2\nc\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Resume with: mockexam start --part part_a"));

    mockexam_in(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("In progress"))
        .stdout(predicate::str::contains("part_a"))
        .stdout(predicate::str::contains("1 answered"));

    mockexam_in(&dir)
        .args(["start", "--part", "part_a"])
        .write_stdin("n\n2\nc\nn\ns\nn\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Resuming Part A at question 1"))
        .stdout(predicate::str::contains("Score: 33%"));
}

#[test]
fn closed_stdin_keeps_progress() {
    let dir = workspace();

    mockexam_in(&dir)
        .args(["start", "--part", "part_b"])
        .write_stdin("1\nc\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("progress saved"));

    mockexam_in(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("part_b"));
}

#[test]
fn conflicting_part_needs_discard() {
    let dir = workspace();

    mockexam_in(&dir)
        .args(["start", "--part", "part_a"])
        .write_stdin("q\n")
        .assert()
        .success();

    mockexam_in(&dir)
        .args(["start", "--part", "part_b"])
        .write_stdin("q\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("in progress"));

    mockexam_in(&dir)
        .arg("discard")
        .assert()
        .success()
        .stdout(predicate::str::contains("Discarded"));

    mockexam_in(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No attempt in progress"));

    mockexam_in(&dir)
        .args(["start", "--part", "part_b", "--discard-existing"])
        .write_stdin("q\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Starting Part B"));
}

#[test]
fn user_errors_do_not_end_the_attempt() {
    let dir = workspace();

    mockexam_in(&dir)
        .args(["start", "--part", "part_b"])
        .write_stdin("c\n9\nn\nxyz\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("no option selected"))
        .stdout(predicate::str::contains("does not belong to question"))
        .stdout(predicate::str::contains("not allowed while the current question is"))
        .stdout(predicate::str::contains("Unknown command `xyz`"));
}
