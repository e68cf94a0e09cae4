//! Configuration loading and validation
//!
//! The config file (`bumpers.yml` at the project root) declares rules,
//! `%name` commands, and session-start notes. Loading is total: the first
//! invalid entry rejects the whole config, so a hook never runs against a
//! half-understood policy. The `validate` CLI path uses [`validate_all`]
//! instead, which keeps going and reports every problem at once.
//!
//! Configs are read fresh by every invocation; there is no hot reload.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::constants::MAX_SEND_BYTES;
use crate::error::{ConfigError, ConfigResult};
use crate::generate::GenerateMode;
use crate::rules::{Rule, WhenSet, compile_tool_filter};

/// Session sources a note's `when` filter may name.
const NOTE_SOURCES: &[&str] = &["startup", "resume", "clear", "compact"];

fn default_tool_pattern() -> String {
    crate::rules::DEFAULT_TOOL_PATTERN.to_string()
}

/// Raw YAML shape of one rule.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleSpec {
    /// Regex applied to the selected content text
    #[serde(rename = "match")]
    pub pattern: String,
    /// Tool-name regex; empty means any tool
    #[serde(default = "default_tool_pattern")]
    pub tool: String,
    /// Message template sent to the agent
    pub send: String,
    #[serde(default)]
    pub generate: GenerateMode,
    #[serde(default)]
    pub when: Vec<String>,
}

/// Raw YAML shape of one `%name` command.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandSpec {
    pub name: String,
    pub send: String,
    #[serde(default)]
    pub generate: GenerateMode,
}

/// Raw YAML shape of one session-start note.
#[derive(Debug, Clone, Deserialize)]
pub struct NoteSpec {
    pub send: String,
    #[serde(default)]
    pub when: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    rules: Vec<RuleSpec>,
    #[serde(default)]
    commands: Vec<CommandSpec>,
    #[serde(default)]
    notes: Vec<NoteSpec>,
    #[serde(default)]
    claude_binary: Option<PathBuf>,
}

/// A compiled `%name` command.
#[derive(Debug, Clone)]
pub struct Command {
    pub name: String,
    pub send: String,
    pub generate: GenerateMode,
}

/// A compiled session-start note.
#[derive(Debug, Clone)]
pub struct Note {
    pub send: String,
    pub when: Vec<String>,
}

impl Note {
    /// Whether this note fires for the given session source. An empty
    /// filter matches every source.
    pub fn matches_source(&self, source: &str) -> bool {
        self.when.is_empty() || self.when.iter().any(|w| w == source)
    }
}

/// Fully compiled configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub rules: Vec<Rule>,
    pub commands: Vec<Command>,
    pub notes: Vec<Note>,
    pub claude_binary: Option<PathBuf>,
}

impl Config {
    /// Load and compile the config at `path`. The first error rejects the
    /// whole file.
    pub fn load(path: &Path) -> ConfigResult<Config> {
        let text = read_config(path)?;
        Self::from_str(&text)
    }

    /// Compile a config from YAML text.
    pub fn from_str(text: &str) -> ConfigResult<Config> {
        let file: ConfigFile = serde_yaml::from_str(text)?;

        let mut rules = Vec::with_capacity(file.rules.len());
        for (idx, spec) in file.rules.iter().enumerate() {
            rules.push(compile_rule(idx, spec)?);
        }

        let mut commands: Vec<Command> = Vec::with_capacity(file.commands.len());
        for (idx, spec) in file.commands.iter().enumerate() {
            let command = compile_command(idx, spec)?;
            if commands.iter().any(|c| c.name == command.name) {
                return Err(ConfigError::DuplicateCommand { name: command.name });
            }
            commands.push(command);
        }

        let mut notes = Vec::with_capacity(file.notes.len());
        for (idx, spec) in file.notes.iter().enumerate() {
            notes.push(compile_note(idx, spec)?);
        }

        Ok(Config {
            rules,
            commands,
            notes,
            claude_binary: file.claude_binary,
        })
    }

    /// Look up a `%name` command.
    pub fn find_command(&self, name: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.name == name)
    }
}

/// Enumerate every problem in the config at `path` instead of stopping at
/// the first. Used by the `validate` subcommand.
pub fn validate_all(path: &Path) -> Vec<ConfigError> {
    let text = match read_config(path) {
        Ok(text) => text,
        Err(err) => return vec![err],
    };
    let file: ConfigFile = match serde_yaml::from_str(&text) {
        Ok(file) => file,
        Err(err) => return vec![err.into()],
    };

    let mut errors = Vec::new();
    for (idx, spec) in file.rules.iter().enumerate() {
        if let Err(err) = compile_rule(idx, spec) {
            errors.push(err);
        }
    }
    let mut seen: Vec<&str> = Vec::new();
    for (idx, spec) in file.commands.iter().enumerate() {
        match compile_command(idx, spec) {
            Ok(_) if seen.contains(&spec.name.as_str()) => {
                errors.push(ConfigError::DuplicateCommand {
                    name: spec.name.clone(),
                });
            }
            Ok(_) => seen.push(spec.name.as_str()),
            Err(err) => errors.push(err),
        }
    }
    for (idx, spec) in file.notes.iter().enumerate() {
        if let Err(err) = compile_note(idx, spec) {
            errors.push(err);
        }
    }
    errors
}

fn read_config(path: &Path) -> ConfigResult<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            })
        }
        Err(err) => Err(ConfigError::Read {
            path: path.display().to_string(),
            source: err,
        }),
    }
}

fn check_send(field: &str, send: &str) -> ConfigResult<()> {
    if send.len() > MAX_SEND_BYTES {
        return Err(ConfigError::SendTooLarge {
            field: field.to_string(),
            bytes: send.len(),
            max: MAX_SEND_BYTES,
        });
    }
    Ok(())
}

fn compile_rule(idx: usize, spec: &RuleSpec) -> ConfigResult<Rule> {
    let field = |name: &str| format!("rules[{idx}].{name}");

    check_send(&field("send"), &spec.send)?;

    let pattern = regex::Regex::new(&spec.pattern).map_err(|err| ConfigError::InvalidRegex {
        field: field("match"),
        pattern: spec.pattern.clone(),
        reason: err.to_string(),
    })?;

    let tool = compile_tool_filter(&spec.tool).map_err(|err| ConfigError::InvalidRegex {
        field: field("tool"),
        pattern: spec.tool.clone(),
        reason: err.to_string(),
    })?;

    let when = WhenSet::normalize(&spec.when).map_err(|err| ConfigError::InvalidValue {
        field: field("when"),
        value: err.0.clone(),
        reason: "expected pre, post, input, output, intent, or prompt (optionally !-prefixed)"
            .to_string(),
    })?;

    Ok(Rule {
        pattern,
        tool,
        send: spec.send.clone(),
        generate: spec.generate,
        when,
    })
}

fn compile_command(idx: usize, spec: &CommandSpec) -> ConfigResult<Command> {
    let field = |name: &str| format!("commands[{idx}].{name}");

    if spec.name.is_empty() || spec.name.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidValue {
            field: field("name"),
            value: spec.name.clone(),
            reason: "command names must be non-empty and contain no whitespace".to_string(),
        });
    }
    check_send(&field("send"), &spec.send)?;

    Ok(Command {
        name: spec.name.clone(),
        send: spec.send.clone(),
        generate: spec.generate,
    })
}

fn compile_note(idx: usize, spec: &NoteSpec) -> ConfigResult<Note> {
    let field = |name: &str| format!("notes[{idx}].{name}");

    check_send(&field("send"), &spec.send)?;
    for entry in &spec.when {
        if !NOTE_SOURCES.contains(&entry.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: field("when"),
                value: entry.clone(),
                reason: format!("expected one of: {}", NOTE_SOURCES.join(", ")),
            });
        }
    }

    Ok(Note {
        send: spec.send.clone(),
        when: spec.when.clone(),
    })
}
