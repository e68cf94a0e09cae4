//! Hook payload parsing and classification
//!
//! The raw stdin payload is a bag of optional fields ([`HookInput`]);
//! classification turns it into the [`HookEvent`] sum type the dispatcher
//! works with. Classification is fail-safe: anything unrecognizable maps to
//! `None`, which the dispatcher answers with a soft allow: a malformed
//! payload must never lock the agent out of a tool call.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

use crate::hook_events::HookEventKind;

/// Hook input message from Claude Code
///
/// Represents the JSON payload sent to hooks via stdin. All fields are
/// optional at this layer; classification decides what the payload means.
///
/// # Example
///
/// ```
/// use bumpers_core::event::HookInput;
/// use serde_json::json;
///
/// let json = json!({
///     "hook_event_name": "PreToolUse",
///     "session_id": "sess_123",
///     "tool_name": "Bash",
///     "tool_input": {"command": "ls"}
/// });
///
/// let input: HookInput = serde_json::from_value(json).unwrap();
/// let event = input.classify().unwrap();
/// assert!(event.kind().is_tool_hook());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookInput {
    /// Unique session identifier from Claude Code
    #[serde(default)]
    pub session_id: String,

    /// Path to the conversation transcript file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_path: Option<PathBuf>,

    /// Current working directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,

    /// Hook event type (PascalCase: PreToolUse, PostToolUse, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_event_name: Option<String>,

    /// Name of the tool being called
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,

    /// Tool input parameters (tool-specific JSON)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<Value>,

    /// Tool execution result (PostToolUse only; Claude Code has shipped both
    /// field names)
    #[serde(
        default,
        alias = "tool_response",
        skip_serializing_if = "Option::is_none"
    )]
    pub tool_output: Option<Value>,

    /// User's prompt text (UserPromptSubmit)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    /// Session source (SessionStart: "startup", "resume", "clear", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Identifier correlating a tool call with its transcript entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use_id: Option<String>,
}

/// Fields shared by every classified event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventMeta {
    pub session_id: String,
    pub transcript_path: Option<PathBuf>,
    pub cwd: Option<PathBuf>,
}

/// A tool call about to run
#[derive(Debug, Clone, PartialEq)]
pub struct ToolUseEvent {
    pub meta: EventMeta,
    pub tool_name: String,
    pub tool_input: Value,
    pub tool_use_id: Option<String>,
}

/// A tool call that has finished running
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResultEvent {
    pub meta: EventMeta,
    pub tool_name: String,
    pub tool_input: Value,
    pub tool_output: Value,
    pub tool_use_id: Option<String>,
}

/// A prompt the user just submitted
#[derive(Debug, Clone, PartialEq)]
pub struct PromptEvent {
    pub meta: EventMeta,
    pub prompt: String,
}

/// A session starting up
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStartEvent {
    pub meta: EventMeta,
    pub source: String,
}

/// Classified hook event
///
/// The four event kinds are a sum type: each variant carries exactly the
/// fields that event provides, so downstream code never probes optional
/// fields that cannot be present.
#[derive(Debug, Clone, PartialEq)]
pub enum HookEvent {
    PreToolUse(ToolUseEvent),
    PostToolUse(ToolResultEvent),
    UserPromptSubmit(PromptEvent),
    SessionStart(SessionStartEvent),
}

impl HookEvent {
    /// The event kind of this variant
    pub fn kind(&self) -> HookEventKind {
        match self {
            HookEvent::PreToolUse(_) => HookEventKind::PreToolUse,
            HookEvent::PostToolUse(_) => HookEventKind::PostToolUse,
            HookEvent::UserPromptSubmit(_) => HookEventKind::UserPromptSubmit,
            HookEvent::SessionStart(_) => HookEventKind::SessionStart,
        }
    }

    /// Shared metadata fields
    pub fn meta(&self) -> &EventMeta {
        match self {
            HookEvent::PreToolUse(e) => &e.meta,
            HookEvent::PostToolUse(e) => &e.meta,
            HookEvent::UserPromptSubmit(e) => &e.meta,
            HookEvent::SessionStart(e) => &e.meta,
        }
    }
}

impl HookInput {
    /// Classify this payload into a [`HookEvent`].
    ///
    /// An explicit `hook_event_name` wins when present; otherwise the kind
    /// is inferred from field presence: `prompt` means UserPromptSubmit,
    /// `source` means SessionStart, `tool_output` alongside `tool_input`
    /// means PostToolUse, and `tool_input` alone means PreToolUse.
    ///
    /// Returns `None` (soft allow) for unknown event names, unrecognizable
    /// shapes, and a would-be PreToolUse with no `tool_name`.
    pub fn classify(self) -> Option<HookEvent> {
        let kind = match &self.hook_event_name {
            Some(name) => HookEventKind::try_from_str(name)?,
            None => self.infer_kind()?,
        };
        self.into_event(kind)
    }

    fn infer_kind(&self) -> Option<HookEventKind> {
        if self.prompt.is_some() {
            Some(HookEventKind::UserPromptSubmit)
        } else if self.source.is_some() {
            Some(HookEventKind::SessionStart)
        } else if self.tool_output.is_some() && self.tool_input.is_some() {
            Some(HookEventKind::PostToolUse)
        } else if self.tool_input.is_some() {
            Some(HookEventKind::PreToolUse)
        } else {
            None
        }
    }

    fn into_event(self, kind: HookEventKind) -> Option<HookEvent> {
        let meta = EventMeta {
            session_id: self.session_id,
            transcript_path: self.transcript_path,
            cwd: self.cwd,
        };

        match kind {
            HookEventKind::PreToolUse => Some(HookEvent::PreToolUse(ToolUseEvent {
                meta,
                tool_name: self.tool_name?,
                tool_input: self.tool_input?,
                tool_use_id: self.tool_use_id,
            })),
            HookEventKind::PostToolUse => Some(HookEvent::PostToolUse(ToolResultEvent {
                meta,
                tool_name: self.tool_name?,
                tool_input: self.tool_input?,
                tool_output: self.tool_output?,
                tool_use_id: self.tool_use_id,
            })),
            HookEventKind::UserPromptSubmit => Some(HookEvent::UserPromptSubmit(PromptEvent {
                meta,
                prompt: self.prompt?,
            })),
            HookEventKind::SessionStart => Some(HookEvent::SessionStart(SessionStartEvent {
                meta,
                // Claude Code always sends a source; default to startup if a
                // caller omitted it rather than dropping the whole event.
                source: self.source.unwrap_or_else(|| "startup".to_string()),
            })),
        }
    }
}

/// Canonical text form of a JSON value for rule matching.
///
/// A string value is used verbatim; every other value is rendered once with
/// compact JSON so the matcher sees a single deterministic serialization.
pub fn canonical_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Matchable text for a tool's input.
///
/// Shell-like tools carry their command under `tool_input.command`; for
/// everything else the whole input object is matched in canonical form.
pub fn command_text(tool_input: &Value) -> String {
    match tool_input.get("command").and_then(Value::as_str) {
        Some(command) => command.to_string(),
        None => canonical_text(tool_input),
    }
}
