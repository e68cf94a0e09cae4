//! Handler for UserPromptSubmit hook events
//!
//! A prompt starting with `%` is a command invocation: the first token
//! names a configured command, the remainder becomes its arguments. An
//! unknown command name is not an error; the prompt simply passes through
//! untouched. Prompts without the prefix are evaluated against
//! prompt-tagged rules. Either way the response is informational: prompt
//! handling adds context, it never blocks.

use crate::cli::dispatcher::HookContext;
use crate::cli::handler::HookHandler;
use crate::io::HookResponse;
use async_trait::async_trait;
use bumpers_core::rules::applicable_rules;
use bumpers_core::{
    BumpersError, HookEvent, HookEventKind, Result, SourceTag, TemplateContext, event_constants,
};

pub struct UserPromptSubmitHandler;

#[async_trait]
impl HookHandler for UserPromptSubmitHandler {
    async fn execute(&self, event: HookEvent, ctx: &HookContext) -> Result<HookResponse> {
        let HookEvent::UserPromptSubmit(event) = event else {
            return Err(BumpersError::InvalidInput {
                message: format!("expected UserPromptSubmit event, got {}", event.kind()),
            });
        };

        if let Some(invocation) = event.prompt.strip_prefix('%') {
            return Ok(self.run_command(invocation, ctx).await);
        }

        let candidates = applicable_rules(&ctx.config.rules, None, SourceTag::Prompt, None);
        for (idx, rule) in candidates {
            if !rule.is_match(&event.prompt) {
                continue;
            }
            let Some(rendered) = ctx.render_rule(idx, rule, &event.prompt) else {
                continue;
            };
            let message = ctx
                .finalize_message(rendered, rule.generate, &rule.send)
                .await;
            tracing::info!(rule = idx, "prompt rule matched");
            return Ok(HookResponse::Context {
                event: HookEventKind::UserPromptSubmit,
                message,
            });
        }

        Ok(HookResponse::Allow)
    }

    fn name(&self) -> &'static str {
        event_constants::USER_PROMPT_SUBMIT
    }
}

impl UserPromptSubmitHandler {
    async fn run_command(&self, invocation: &str, ctx: &HookContext) -> HookResponse {
        let mut parts = invocation.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or("");
        let args = parts.next().unwrap_or("").trim_start();

        let Some(command) = ctx.config.find_command(name) else {
            tracing::debug!(command = %name, "unknown prompt command; passing through");
            return HookResponse::Allow;
        };

        let template_ctx = TemplateContext::for_command(name, args);
        let Some(rendered) = ctx.render(&command.send, &template_ctx, || {
            format!("commands[{name}]")
        }) else {
            return HookResponse::Allow;
        };

        let message = ctx
            .finalize_message(rendered, command.generate, &command.send)
            .await;
        tracing::info!(command = %name, "prompt command executed");
        HookResponse::Context {
            event: HookEventKind::UserPromptSubmit,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::handlers::testing::context;
    use bumpers_core::HookInput;
    use serde_json::json;
    use tempfile::TempDir;

    fn prompt_event(prompt: &str) -> HookEvent {
        serde_json::from_value::<HookInput>(json!({
            "hook_event_name": "UserPromptSubmit",
            "prompt": prompt
        }))
        .unwrap()
        .classify()
        .unwrap()
    }

    const CONFIG: &str = r#"
commands:
  - name: test
    send: "Hello World"
"#;

    #[tokio::test]
    async fn test_known_command_emits_context() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, CONFIG);

        let response = UserPromptSubmitHandler
            .execute(prompt_event("%test"), &ctx)
            .await
            .unwrap();
        assert_eq!(
            response,
            HookResponse::Context {
                event: HookEventKind::UserPromptSubmit,
                message: "Hello World".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_command_passes_through() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, CONFIG);

        let response = UserPromptSubmitHandler
            .execute(prompt_event("%unknown"), &ctx)
            .await
            .unwrap();
        assert_eq!(response, HookResponse::Allow);
    }

    #[tokio::test]
    async fn test_command_arguments_reach_template() {
        let dir = TempDir::new().unwrap();
        let ctx = context(
            &dir,
            r#"
commands:
  - name: deploy
    send: "{{.Name}} -> {{argv 0}} ({{argc}} args)"
"#,
        );

        let response = UserPromptSubmitHandler
            .execute(prompt_event("%deploy staging --fast"), &ctx)
            .await
            .unwrap();
        assert_eq!(
            response,
            HookResponse::Context {
                event: HookEventKind::UserPromptSubmit,
                message: "deploy -> staging (2 args)".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_prompt_rule_matches_free_text() {
        let dir = TempDir::new().unwrap();
        let ctx = context(
            &dir,
            r#"
rules:
  - match: "(?i)delete production"
    when: [prompt]
    send: "Production changes need a ticket"
"#,
        );

        let response = UserPromptSubmitHandler
            .execute(prompt_event("please delete production data"), &ctx)
            .await
            .unwrap();
        assert_eq!(
            response,
            HookResponse::Context {
                event: HookEventKind::UserPromptSubmit,
                message: "Production changes need a ticket".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_default_when_rules_ignore_prompts() {
        let dir = TempDir::new().unwrap();
        let ctx = context(
            &dir,
            r#"
rules:
  - match: ".*"
    tool: ""
    send: "pre/input only"
"#,
        );

        let response = UserPromptSubmitHandler
            .execute(prompt_event("anything at all"), &ctx)
            .await
            .unwrap();
        assert_eq!(response, HookResponse::Allow);
    }

    #[tokio::test]
    async fn test_bare_percent_passes_through() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, CONFIG);

        let response = UserPromptSubmitHandler
            .execute(prompt_event("%"), &ctx)
            .await
            .unwrap();
        assert_eq!(response, HookResponse::Allow);
    }
}
