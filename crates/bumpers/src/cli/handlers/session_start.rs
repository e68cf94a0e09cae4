//! Handler for SessionStart hook events
//!
//! Emits the configured notes whose `when` filter matches the session
//! source, concatenated into one informational response.

use crate::cli::dispatcher::HookContext;
use crate::cli::handler::HookHandler;
use crate::io::HookResponse;
use async_trait::async_trait;
use bumpers_core::{
    BumpersError, HookEvent, HookEventKind, Result, TemplateContext, event_constants,
};

pub struct SessionStartHandler;

#[async_trait]
impl HookHandler for SessionStartHandler {
    async fn execute(&self, event: HookEvent, ctx: &HookContext) -> Result<HookResponse> {
        let HookEvent::SessionStart(event) = event else {
            return Err(BumpersError::InvalidInput {
                message: format!("expected SessionStart event, got {}", event.kind()),
            });
        };

        let mut messages = Vec::new();
        for (idx, note) in ctx.config.notes.iter().enumerate() {
            if !note.matches_source(&event.source) {
                continue;
            }
            if let Some(rendered) =
                ctx.render(&note.send, &TemplateContext::new(), || format!("notes[{idx}]"))
            {
                messages.push(rendered);
            }
        }

        if messages.is_empty() {
            return Ok(HookResponse::Allow);
        }

        tracing::info!(count = messages.len(), source = %event.source, "session notes emitted");
        Ok(HookResponse::Context {
            event: HookEventKind::SessionStart,
            message: messages.join("\n"),
        })
    }

    fn name(&self) -> &'static str {
        event_constants::SESSION_START
    }
}
