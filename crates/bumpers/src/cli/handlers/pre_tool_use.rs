//! Handler for PreToolUse hook events
//!
//! Runs before the tool executes. A rule hit here is the only blocking
//! response Bumpers produces: exit 2 with the rendered message on stderr,
//! which the host agent shows instead of running the tool.

use crate::cli::dispatcher::HookContext;
use crate::cli::handler::HookHandler;
use crate::io::HookResponse;
use async_trait::async_trait;
use bumpers_core::event::command_text;
use bumpers_core::rules::applicable_rules;
use bumpers_core::{BumpersError, EventTag, HookEvent, Result, SourceTag, event_constants};

pub struct PreToolUseHandler;

#[async_trait]
impl HookHandler for PreToolUseHandler {
    async fn execute(&self, event: HookEvent, ctx: &HookContext) -> Result<HookResponse> {
        let HookEvent::PreToolUse(event) = event else {
            return Err(BumpersError::InvalidInput {
                message: format!("expected PreToolUse event, got {}", event.kind()),
            });
        };

        let content = command_text(&event.tool_input);
        let candidates = applicable_rules(
            &ctx.config.rules,
            Some(EventTag::Pre),
            SourceTag::Input,
            Some(event.tool_name.as_str()),
        );

        for (idx, rule) in candidates {
            if !rule.is_match(&content) {
                continue;
            }
            // A broken template skips its rule; later rules still get
            // their chance.
            let Some(rendered) = ctx.render_rule(idx, rule, &content) else {
                continue;
            };
            let message = ctx
                .finalize_message(rendered, rule.generate, &rule.send)
                .await;
            tracing::info!(rule = idx, tool = %event.tool_name, "blocking tool call");
            return Ok(HookResponse::Block { message });
        }

        Ok(HookResponse::Allow)
    }

    fn name(&self) -> &'static str {
        event_constants::PRE_TOOL_USE
    }
}
