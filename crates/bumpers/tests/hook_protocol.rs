//! End-to-end protocol tests
//!
//! Each test drives the built binary exactly the way Claude Code does: a
//! JSON payload on stdin, then byte-for-byte assertions on the exit code,
//! stdout, and stderr. Project state (store, logs) is redirected into a
//! per-test temp dir via XDG_STATE_HOME; project detection is pinned with
//! CLAUDE_PROJECT_DIR.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write;
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    /// Project tree with the given config; no config file when `None`.
    fn new(config: Option<&str>) -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("project/.git")).unwrap();
        fs::create_dir_all(dir.path().join("state")).unwrap();
        if let Some(config) = config {
            fs::write(dir.path().join("project/bumpers.yml"), config).unwrap();
        }
        Self { dir }
    }

    fn project(&self) -> std::path::PathBuf {
        self.dir.path().join("project")
    }

    fn hook(&self) -> Command {
        let mut cmd = Command::cargo_bin("bumpers").unwrap();
        cmd.arg("hook")
            .current_dir(self.project())
            .env("CLAUDE_PROJECT_DIR", self.project())
            .env("XDG_STATE_HOME", self.dir.path().join("state"))
            .env_remove("BUMPERS_LOG");
        cmd
    }
}

const BLOCK_CONFIG: &str = r#"
rules:
  - match: "^go test"
    tool: "^Bash$"
    send: "Use just test instead"
    generate: off
    when: [pre, input]
"#;

#[test]
fn blocks_matching_shell_command() {
    let fixture = Fixture::new(Some(BLOCK_CONFIG));
    fixture
        .hook()
        .write_stdin(r#"{"hook_event_name":"PreToolUse","tool_name":"Bash","tool_input":{"command":"go test ./..."}}"#)
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::eq("Use just test instead\n"));
}

#[test]
fn allows_non_matching_command() {
    let fixture = Fixture::new(Some(BLOCK_CONFIG));
    fixture
        .hook()
        .write_stdin(r#"{"hook_event_name":"PreToolUse","tool_name":"Bash","tool_input":{"command":"make build"}}"#)
        .assert()
        .code(0)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::is_empty());
}

#[test]
fn prompt_command_emits_informational_wrapper() {
    let fixture = Fixture::new(Some(
        "commands:\n  - name: test\n    send: \"Hello World\"\n    generate: off\n",
    ));
    fixture
        .hook()
        .write_stdin(r#"{"hook_event_name":"UserPromptSubmit","prompt":"%test"}"#)
        .assert()
        .code(0)
        .stdout(predicate::eq(
            "{\"hookSpecificOutput\":{\"hookEventName\":\"UserPromptSubmit\",\"additionalContext\":\"Hello World\"}}\n",
        ))
        .stderr(predicate::str::is_empty());
}

#[test]
fn unknown_prompt_command_passes_through() {
    let fixture = Fixture::new(Some(
        "commands:\n  - name: test\n    send: \"Hello World\"\n",
    ));
    fixture
        .hook()
        .write_stdin(r#"{"hook_event_name":"UserPromptSubmit","prompt":"%unknown"}"#)
        .assert()
        .code(0)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::is_empty());
}

#[test]
fn intent_rule_matches_transcript_on_post_tool_use() {
    let fixture = Fixture::new(Some(
        "rules:\n  - match: \"not related to my changes\"\n    when: [intent]\n    send: \"Verify the claim\"\n",
    ));

    let transcript = fixture.project().join("transcript.jsonl");
    let mut file = fs::File::create(&transcript).unwrap();
    writeln!(
        file,
        r#"{{"type":"assistant","uuid":"aaa","message":{{"role":"assistant","content":[{{"type":"text","text":"These failures are not related to my changes"}}]}}}}"#
    )
    .unwrap();
    writeln!(
        file,
        r#"{{"type":"assistant","uuid":"bbb","parentUuid":"aaa","message":{{"role":"assistant","content":[{{"type":"tool_use","id":"X","name":"Bash","input":{{"command":"go test"}}}}]}}}}"#
    )
    .unwrap();
    drop(file);

    let payload = format!(
        r#"{{"hook_event_name":"PostToolUse","tool_use_id":"X","tool_name":"Bash","tool_input":{{"command":"go test"}},"tool_output":{{"stdout":"FAIL"}},"transcript_path":"{}"}}"#,
        transcript.display()
    );

    fixture
        .hook()
        .write_stdin(payload)
        .assert()
        .code(0)
        .stdout(predicate::eq(
            "{\"hookSpecificOutput\":{\"hookEventName\":\"PostToolUse\",\"additionalContext\":\"Verify the claim\"}}\n",
        ))
        .stderr(predicate::str::is_empty());
}

#[test]
fn missing_tool_name_is_a_safe_allow() {
    let fixture = Fixture::new(Some(BLOCK_CONFIG));
    fixture
        .hook()
        .write_stdin(r#"{"tool_input":{"command":"go test"}}"#)
        .assert()
        .code(0)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::is_empty());
}

#[test]
fn missing_config_allows_pre_tool_use() {
    let fixture = Fixture::new(None);
    fixture
        .hook()
        .write_stdin(r#"{"hook_event_name":"PreToolUse","tool_name":"Bash","tool_input":{"command":"go test"}}"#)
        .assert()
        .code(0)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::is_empty());
}

#[test]
fn broken_config_exits_one_with_stderr() {
    let fixture = Fixture::new(Some("rules: [\n"));
    fixture
        .hook()
        .write_stdin(r#"{"hook_event_name":"PreToolUse","tool_name":"Bash","tool_input":{"command":"go test"}}"#)
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::is_empty().not());
}

#[test]
fn garbage_stdin_is_a_soft_allow() {
    let fixture = Fixture::new(Some(BLOCK_CONFIG));
    fixture
        .hook()
        .write_stdin("this is not json")
        .assert()
        .code(0)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::is_empty());
}

#[test]
fn session_start_emits_filtered_notes() {
    let fixture = Fixture::new(Some(
        "notes:\n  - send: \"Fresh session\"\n    when: [startup]\n  - send: \"Cleared\"\n    when: [clear]\n",
    ));
    fixture
        .hook()
        .write_stdin(r#"{"hook_event_name":"SessionStart","source":"startup","session_id":"s1"}"#)
        .assert()
        .code(0)
        .stdout(predicate::eq(
            "{\"hookSpecificOutput\":{\"hookEventName\":\"SessionStart\",\"additionalContext\":\"Fresh session\"}}\n",
        ))
        .stderr(predicate::str::is_empty());
}

#[test]
fn post_tool_use_output_rule_is_informational() {
    let fixture = Fixture::new(Some(
        "rules:\n  - match: \"FAIL\"\n    when: [post]\n    send: \"Command failed — review the output\"\n",
    ));
    fixture
        .hook()
        .write_stdin(r#"{"hook_event_name":"PostToolUse","tool_name":"Bash","tool_input":{"command":"go test"},"tool_output":{"stdout":"FAIL: TestX"}}"#)
        .assert()
        .code(0)
        .stdout(predicate::eq(
            "{\"hookSpecificOutput\":{\"hookEventName\":\"PostToolUse\",\"additionalContext\":\"Command failed — review the output\"}}\n",
        ))
        .stderr(predicate::str::is_empty());
}

#[test]
fn rules_disabled_skips_evaluation() {
    let fixture = Fixture::new(Some(BLOCK_CONFIG));

    // First hook run creates the store; then flip the flag directly.
    fixture
        .hook()
        .write_stdin(r#"{"hook_event_name":"PreToolUse","tool_name":"Bash","tool_input":{"command":"make build"}}"#)
        .assert()
        .code(0);

    let state_dir = fixture.dir.path().join("state/bumpers");
    let db = fs::read_dir(&state_dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .find(|path| path.extension().is_some_and(|ext| ext == "db"))
        .expect("store database created");
    let project_id = db.file_stem().unwrap().to_string_lossy().into_owned();

    let store = bumpers_core::Store::open(&db, &project_id).unwrap();
    store.set_rules_enabled(false).unwrap();
    drop(store);

    fixture
        .hook()
        .write_stdin(r#"{"hook_event_name":"PreToolUse","tool_name":"Bash","tool_input":{"command":"go test ./..."}}"#)
        .assert()
        .code(0)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::is_empty());
}

#[test]
fn skip_next_flag_suppresses_exactly_one_evaluation() {
    let fixture = Fixture::new(Some(BLOCK_CONFIG));
    let blocked_payload =
        r#"{"hook_event_name":"PreToolUse","tool_name":"Bash","tool_input":{"command":"go test ./..."}}"#;

    // Bootstrap the store, then arm the flag.
    fixture
        .hook()
        .write_stdin(r#"{"hook_event_name":"PreToolUse","tool_name":"Bash","tool_input":{"command":"make build"}}"#)
        .assert()
        .code(0);

    let state_dir = fixture.dir.path().join("state/bumpers");
    let db = fs::read_dir(&state_dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .find(|path| path.extension().is_some_and(|ext| ext == "db"))
        .expect("store database created");
    let project_id = db.file_stem().unwrap().to_string_lossy().into_owned();

    {
        let store = bumpers_core::Store::open(&db, &project_id).unwrap();
        store.set_skip_next(true).unwrap();
    }

    // First evaluation consumes the flag and allows.
    fixture
        .hook()
        .write_stdin(blocked_payload)
        .assert()
        .code(0)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::is_empty());

    // Second evaluation blocks again.
    fixture
        .hook()
        .write_stdin(blocked_payload)
        .assert()
        .code(2)
        .stderr(predicate::eq("Use just test instead\n"));
}
