//! Handler for PostToolUse hook events
//!
//! Runs after the tool finished. Each rule tagged `post` is tried against
//! its sources in order: the stringified tool output first, then the
//! agent's intent text recovered from the transcript. The first rule that
//! matches wins, and the response is informational; the tool already ran,
//! so there is nothing left to block.
//!
//! The transcript is read at most once per invocation, and only when some
//! rule actually carries the `intent` tag. Transcript trouble of any kind
//! degrades the intent source to empty text.

use crate::cli::dispatcher::HookContext;
use crate::cli::handler::HookHandler;
use crate::io::HookResponse;
use async_trait::async_trait;
use bumpers_core::event::canonical_text;
use bumpers_core::{
    BumpersError, EventTag, HookEvent, HookEventKind, Result, SourceTag, TailReader,
    event_constants,
};

pub struct PostToolUseHandler;

#[async_trait]
impl HookHandler for PostToolUseHandler {
    async fn execute(&self, event: HookEvent, ctx: &HookContext) -> Result<HookResponse> {
        let HookEvent::PostToolUse(event) = event else {
            return Err(BumpersError::InvalidInput {
                message: format!("expected PostToolUse event, got {}", event.kind()),
            });
        };

        let output_text = canonical_text(&event.tool_output);
        let tool_name = event.tool_name.as_str();

        // Lazily fetched intent, shared by every intent-tagged rule.
        let mut intent: Option<String> = None;
        let reader = TailReader::default();
        let fetch_intent = |intent: &mut Option<String>| -> String {
            intent
                .get_or_insert_with(|| {
                    let Some(path) = event.meta.transcript_path.as_deref() else {
                        return String::new();
                    };
                    match event.tool_use_id.as_deref() {
                        Some(id) => reader.intent_by_tool_use_id(path, id),
                        // No id in the payload: fall back to the most
                        // recent tool_use in the tail window.
                        None => reader.recent_intent(path),
                    }
                })
                .clone()
        };

        for (idx, rule) in ctx.config.rules.iter().enumerate() {
            let on_output =
                rule.applies_to(Some(EventTag::Post), SourceTag::Output, Some(tool_name));
            let on_intent =
                rule.applies_to(Some(EventTag::Post), SourceTag::Intent, Some(tool_name));

            let matched = if on_output && rule.is_match(&output_text) {
                output_text.clone()
            } else if on_intent {
                let text = fetch_intent(&mut intent);
                if !rule.is_match(&text) {
                    continue;
                }
                text
            } else {
                continue;
            };

            let Some(rendered) = ctx.render_rule(idx, rule, &matched) else {
                continue;
            };
            let message = ctx
                .finalize_message(rendered, rule.generate, &rule.send)
                .await;
            tracing::info!(rule = idx, tool = %tool_name, "post-tool context emitted");
            return Ok(HookResponse::Context {
                event: HookEventKind::PostToolUse,
                message,
            });
        }

        Ok(HookResponse::Allow)
    }

    fn name(&self) -> &'static str {
        event_constants::POST_TOOL_USE
    }
}
