//! CLI surface tests for the non-hook subcommands

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn project_with_config(config: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join(".git")).unwrap();
    fs::write(dir.path().join("bumpers.yml"), config).unwrap();
    dir
}

fn bumpers(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("bumpers").unwrap();
    cmd.current_dir(dir.path())
        .env("CLAUDE_PROJECT_DIR", dir.path())
        .env("XDG_STATE_HOME", dir.path().join(".state"));
    cmd
}

#[test]
fn validate_accepts_well_formed_config() {
    let dir = project_with_config(
        "rules:\n  - match: \"^go test\"\n    send: \"Use just test\"\n",
    );
    bumpers(&dir)
        .arg("validate")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("ok"));
}

#[test]
fn validate_enumerates_every_problem() {
    let dir = project_with_config(
        r#"
rules:
  - match: "("
    send: "bad regex"
  - match: "fine"
    send: "ok"
    when: [sideways]
"#,
    );
    bumpers(&dir)
        .arg("validate")
        .assert()
        .code(1)
        .stdout(
            predicate::str::contains("rules[0].match")
                .and(predicate::str::contains("rules[1].when"))
                .and(predicate::str::contains("2 problems")),
        );
}

#[test]
fn validate_honors_explicit_config_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("elsewhere.yml");
    fs::write(&path, "commands:\n  - name: test\n    send: \"hi\"\n").unwrap();

    bumpers(&dir)
        .arg("validate")
        .arg("--config")
        .arg(&path)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("ok"));
}

#[test]
fn validate_reports_missing_config() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join(".git")).unwrap();
    bumpers(&dir)
        .arg("validate")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("not found"));
}

#[test]
fn status_reports_project_and_config() {
    let dir = project_with_config(
        "rules:\n  - match: \"x\"\n    send: \"y\"\ncommands:\n  - name: t\n    send: \"z\"\n",
    );
    bumpers(&dir)
        .arg("status")
        .assert()
        .code(0)
        .stdout(
            predicate::str::contains("project:")
                .and(predicate::str::contains("1 rules, 1 commands, 0 notes"))
                .and(predicate::str::contains("rules enabled")),
        );
}

#[test]
fn status_survives_missing_config() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join(".git")).unwrap();
    bumpers(&dir)
        .arg("status")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("missing"));
}
