//! Claude Code hook event names and matching vocabularies
//!
//! Single source of truth for the event-name strings Claude Code sends in
//! the `hook_event_name` field, plus the tag vocabularies rules are matched
//! against. The wire names are PascalCase and must match Claude Code's
//! implementation exactly.

use std::fmt::{self, Display};

/// Claude Code hook event name constants
pub mod event_constants {
    /// Pre-tool execution hook event
    pub const PRE_TOOL_USE: &str = "PreToolUse";

    /// Post-tool execution hook event
    pub const POST_TOOL_USE: &str = "PostToolUse";

    /// User prompt submission hook event
    pub const USER_PROMPT_SUBMIT: &str = "UserPromptSubmit";

    /// Session start hook event
    pub const SESSION_START: &str = "SessionStart";

    /// All hook event names Bumpers evaluates
    pub const ALL_EVENTS: &[&str] = &[
        PRE_TOOL_USE,
        POST_TOOL_USE,
        USER_PROMPT_SUBMIT,
        SESSION_START,
    ];
}

/// Strongly-typed enum for the hook events Bumpers evaluates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum HookEventKind {
    /// Pre-tool execution hook
    PreToolUse,
    /// Post-tool execution hook
    PostToolUse,
    /// User prompt submission hook
    UserPromptSubmit,
    /// Session start hook
    SessionStart,
}

impl HookEventKind {
    /// Get all hook event kinds
    pub const fn all() -> &'static [HookEventKind] {
        &[
            HookEventKind::PreToolUse,
            HookEventKind::PostToolUse,
            HookEventKind::UserPromptSubmit,
            HookEventKind::SessionStart,
        ]
    }

    /// Parse a hook event kind from its wire name (fallible)
    pub fn try_from_str(s: &str) -> Option<Self> {
        match s {
            event_constants::PRE_TOOL_USE => Some(HookEventKind::PreToolUse),
            event_constants::POST_TOOL_USE => Some(HookEventKind::PostToolUse),
            event_constants::USER_PROMPT_SUBMIT => Some(HookEventKind::UserPromptSubmit),
            event_constants::SESSION_START => Some(HookEventKind::SessionStart),
            _ => None,
        }
    }

    /// Get the wire name
    pub const fn as_str(&self) -> &'static str {
        match self {
            HookEventKind::PreToolUse => event_constants::PRE_TOOL_USE,
            HookEventKind::PostToolUse => event_constants::POST_TOOL_USE,
            HookEventKind::UserPromptSubmit => event_constants::USER_PROMPT_SUBMIT,
            HookEventKind::SessionStart => event_constants::SESSION_START,
        }
    }

    /// Check if this is a tool-related hook
    pub const fn is_tool_hook(&self) -> bool {
        matches!(
            self,
            HookEventKind::PreToolUse | HookEventKind::PostToolUse
        )
    }
}

impl Display for HookEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for HookEventKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        HookEventKind::try_from_str(s).ok_or_else(|| format!("Invalid hook event: {s}"))
    }
}

/// Event-side tags a rule's `when` set is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTag {
    /// Before the tool runs
    Pre,
    /// After the tool ran
    Post,
}

impl EventTag {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventTag::Pre => "pre",
            EventTag::Post => "post",
        }
    }
}

/// Content sources rules can draw their evidence from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceTag {
    /// Tool input (e.g. the shell command about to run)
    Input,
    /// Tool output after execution
    Output,
    /// The agent's own prior text, recovered from the transcript
    Intent,
    /// The user's submitted prompt
    Prompt,
}

impl SourceTag {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SourceTag::Input => "input",
            SourceTag::Output => "output",
            SourceTag::Intent => "intent",
            SourceTag::Prompt => "prompt",
        }
    }
}

impl Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
