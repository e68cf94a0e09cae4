//! Hook protocol responses
//!
//! The host agent reads Bumpers' verdict from the exit code and the two
//! output streams, bit-exactly:
//!
//! - exit 0, both streams empty: allow;
//! - exit 0, stdout carrying the `hookSpecificOutput` JSON wrapper plus one
//!   trailing newline: informational context the agent shows and proceeds;
//! - exit 2, plain message plus one trailing newline on stderr: block the
//!   pending tool call.
//!
//! Responses are composed fully and written in one shot; nothing else in
//! the process may write to either stream during `hook`.

use bumpers_core::{ExitCode, HookEventKind};
use serde::Serialize;
use std::io::Write;

/// Verdict of one hook evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum HookResponse {
    /// Let the action proceed with no output
    Allow,
    /// Exit 0 with additional context for the agent
    Context {
        event: HookEventKind,
        message: String,
    },
    /// Exit 2 with a message the agent must show
    Block { message: String },
}

#[derive(Serialize)]
struct HookSpecificOutput<'a> {
    #[serde(rename = "hookEventName")]
    hook_event_name: &'a str,
    #[serde(rename = "additionalContext")]
    additional_context: &'a str,
}

#[derive(Serialize)]
struct HookOutput<'a> {
    #[serde(rename = "hookSpecificOutput")]
    hook_specific_output: HookSpecificOutput<'a>,
}

impl HookResponse {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            HookResponse::Allow | HookResponse::Context { .. } => ExitCode::Success,
            HookResponse::Block { .. } => ExitCode::Block,
        }
    }

    /// Stdout payload: the informational JSON wrapper, newline-terminated.
    pub fn stdout(&self) -> Option<String> {
        match self {
            HookResponse::Context { event, message } => {
                let wrapper = HookOutput {
                    hook_specific_output: HookSpecificOutput {
                        hook_event_name: event.as_str(),
                        additional_context: message,
                    },
                };
                // Serialization of two string fields cannot fail.
                let json = serde_json::to_string(&wrapper).unwrap_or_default();
                Some(format!("{json}\n"))
            }
            _ => None,
        }
    }

    /// Stderr payload: the block message followed by exactly one newline.
    pub fn stderr(&self) -> Option<String> {
        match self {
            HookResponse::Block { message } => {
                Some(format!("{}\n", message.trim_end_matches('\n')))
            }
            _ => None,
        }
    }

    /// Write the composed response in one shot.
    pub fn write_to(
        &self,
        stdout: &mut impl Write,
        stderr: &mut impl Write,
    ) -> std::io::Result<()> {
        if let Some(out) = self.stdout() {
            stdout.write_all(out.as_bytes())?;
            stdout.flush()?;
        }
        if let Some(err) = self.stderr() {
            stderr.write_all(err.as_bytes())?;
            stderr.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_is_silent_success() {
        let response = HookResponse::Allow;
        assert_eq!(response.exit_code(), ExitCode::Success);
        assert_eq!(response.stdout(), None);
        assert_eq!(response.stderr(), None);
    }

    #[test]
    fn test_context_wrapper_is_bit_exact() {
        let response = HookResponse::Context {
            event: HookEventKind::PostToolUse,
            message: "Command failed — review the output".to_string(),
        };
        assert_eq!(response.exit_code(), ExitCode::Success);
        assert_eq!(
            response.stdout().unwrap(),
            "{\"hookSpecificOutput\":{\"hookEventName\":\"PostToolUse\",\"additionalContext\":\"Command failed — review the output\"}}\n"
        );
        assert_eq!(response.stderr(), None);
    }

    #[test]
    fn test_block_message_gets_exactly_one_newline() {
        let response = HookResponse::Block {
            message: "Use just test instead".to_string(),
        };
        assert_eq!(response.exit_code(), ExitCode::Block);
        assert_eq!(response.stdout(), None);
        assert_eq!(response.stderr().unwrap(), "Use just test instead\n");

        let trailing = HookResponse::Block {
            message: "already terminated\n\n".to_string(),
        };
        assert_eq!(trailing.stderr().unwrap(), "already terminated\n");
    }

    #[test]
    fn test_write_to_routes_streams() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        HookResponse::Block {
            message: "no".to_string(),
        }
        .write_to(&mut out, &mut err)
        .unwrap();
        assert!(out.is_empty());
        assert_eq!(err, b"no\n");

        let mut out = Vec::new();
        let mut err = Vec::new();
        HookResponse::Context {
            event: HookEventKind::UserPromptSubmit,
            message: "Hello World".to_string(),
        }
        .write_to(&mut out, &mut err)
        .unwrap();
        assert!(err.is_empty());
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\"hookSpecificOutput\":{\"hookEventName\":\"UserPromptSubmit\",\"additionalContext\":\"Hello World\"}}\n"
        );
    }
}
