//! AI message generation with per-rule modes and cache scoping
//!
//! A rule can ask for its rendered message to be rewritten by an external
//! generator (the Claude binary). Modes: `off` passes the rendered text
//! through untouched, `once` generates a single time per (project,
//! fingerprint), `session` regenerates when the session changes, `always`
//! regenerates on every hit and never stores. Generator trouble of any kind
//! degrades to the rendered template; an AI outage must never block the
//! host or change a hook's decision.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::GENERATOR_TIMEOUT_SECS;
use crate::error::GeneratorError;
use crate::store::Store;

/// How a rule's rendered message is post-processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerateMode {
    /// Use the rendered template as-is; the cache is bypassed entirely
    #[default]
    Off,
    /// Generate once per (project, fingerprint), then reuse forever
    Once,
    /// Like `once`, but the fingerprint includes the session id
    Session,
    /// Generate on every hit; never store
    Always,
}

impl GenerateMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            GenerateMode::Off => "off",
            GenerateMode::Once => "once",
            GenerateMode::Session => "session",
            GenerateMode::Always => "always",
        }
    }
}

/// Stable cache fingerprint for a (rule, mode, session?) tuple.
///
/// The matched command text is deliberately excluded: keying on it would
/// turn `once` into `always`.
pub fn fingerprint(rule_body: &str, mode: GenerateMode, session_id: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(rule_body.as_bytes());
    hasher.update([0]);
    hasher.update(mode.as_str().as_bytes());
    if let Some(session_id) = session_id {
        hasher.update([0]);
        hasher.update(session_id.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Seam for the external generator, injectable for tests.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GeneratorError>;
}

/// The external Claude binary, discovered at first use.
#[derive(Debug)]
pub struct ClaudeGenerator {
    binary: PathBuf,
    timeout: Duration,
}

impl ClaudeGenerator {
    /// Locate the generator binary: an explicit config path first, then
    /// `$PATH`, then a fixed set of common install locations. Every
    /// candidate must be a regular executable file.
    pub fn discover(config_binary: Option<&Path>) -> Result<Self, GeneratorError> {
        if let Some(path) = config_binary {
            if is_executable(path) {
                return Ok(Self::with_binary(path.to_path_buf()));
            }
            return Err(GeneratorError::NotFound);
        }

        if let Some(path) = search_path("claude") {
            return Ok(Self::with_binary(path));
        }

        for candidate in install_candidates() {
            if is_executable(&candidate) {
                return Ok(Self::with_binary(candidate));
            }
        }

        Err(GeneratorError::NotFound)
    }

    pub fn with_binary(binary: PathBuf) -> Self {
        Self {
            binary,
            timeout: Duration::from_secs(GENERATOR_TIMEOUT_SECS),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl Generator for ClaudeGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
        let output = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new(&self.binary)
                .arg("-p")
                .arg(prompt)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| GeneratorError::Timeout {
            seconds: self.timeout.as_secs(),
        })??;

        if !output.status.success() {
            return Err(GeneratorError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

fn search_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

fn install_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".claude/local/claude"));
        candidates.push(home.join(".local/bin/claude"));
    }
    candidates.push(PathBuf::from("/usr/local/bin/claude"));
    candidates.push(PathBuf::from("/opt/homebrew/bin/claude"));
    candidates
}

/// Prompt handed to the generator around a rendered rule message.
fn generation_prompt(rendered: &str) -> String {
    format!(
        "Rewrite the following guidance for an AI coding agent in one or two \
         concise sentences. Keep the meaning and any concrete commands or \
         paths exactly as given. Respond with the rewritten text only.\n\n{rendered}"
    )
}

/// Produce the final message for a rule hit.
///
/// `rule_body` is the raw `send` template (the fingerprint input);
/// `rendered` is its expanded form. A missing store degrades `once` and
/// `session` to `always`; a missing or failing generator degrades to the
/// rendered text.
pub async fn generate_message(
    rendered: &str,
    mode: GenerateMode,
    rule_body: &str,
    session_id: &str,
    store: Option<&Store>,
    generator: Option<&dyn Generator>,
) -> String {
    if mode == GenerateMode::Off {
        return rendered.to_string();
    }

    let session = (mode == GenerateMode::Session).then_some(session_id);
    let key = fingerprint(rule_body, mode, session);

    if matches!(mode, GenerateMode::Once | GenerateMode::Session)
        && let Some(store) = store
    {
        match store.cache_get(&key) {
            Ok(Some(cached)) => return String::from_utf8_lossy(&cached).into_owned(),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = %err, "cache read failed; regenerating");
            }
        }
    }

    let Some(generator) = generator else {
        return rendered.to_string();
    };

    let generated = match generator.generate(&generation_prompt(rendered)).await {
        Ok(text) if !text.is_empty() => text,
        Ok(_) => {
            tracing::warn!("generator returned empty output; using rendered template");
            return rendered.to_string();
        }
        Err(err) => {
            tracing::warn!(error = %err, "generation failed; using rendered template");
            return rendered.to_string();
        }
    };

    if matches!(mode, GenerateMode::Once | GenerateMode::Session)
        && let Some(store) = store
        && let Err(err) = store.cache_put(&key, generated.as_bytes(), None)
    {
        tracing::warn!(error = %err, "cache write failed");
    }

    generated
}
