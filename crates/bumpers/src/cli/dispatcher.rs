//! Hook dispatcher: orchestration for one invocation
//!
//! One hook process evaluates exactly one event. The dispatcher reads the
//! payload, classifies it, locates the project, loads config, opens the
//! store, applies the global gates (`rules_enabled`, the consume-once skip
//! flag), and routes the event to its handler with a timeout.
//!
//! Failure policy (in classification order): an unreadable or
//! unclassifiable payload soft-allows, an absent config soft-allows, a
//! broken config is fatal (exit 1), a broken store disables caching and
//! continues. Nothing in this path may write to stdout or stderr; the
//! composed response is written once by the caller.

use crate::cli::registry::HandlerRegistry;
use crate::io::{HookResponse, StdinProcessor};
use async_trait::async_trait;
use bumpers_core::constants::HANDLER_TIMEOUT_MS;
use bumpers_core::generate::{ClaudeGenerator, GenerateMode, Generator, generate_message};
use bumpers_core::{
    BumpersError, Config, ConfigError, HookEventKind, HookInput, ProjectContext, Renderer, Result,
    Rule, Store, TemplateContext, logging,
};
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::sync::Mutex;

/// Shared state handed to handlers for one evaluation.
pub struct HookContext {
    pub config: Config,
    pub project: ProjectContext,
    pub store: Option<Store>,
    pub session_id: String,
    pub renderer: Renderer,
    generator: OnceLock<Option<ClaudeGenerator>>,
}

impl HookContext {
    pub fn new(
        config: Config,
        project: ProjectContext,
        store: Option<Store>,
        session_id: String,
    ) -> Self {
        let renderer = Renderer::new(&project.root);
        Self {
            config,
            project,
            store,
            session_id,
            renderer,
            generator: OnceLock::new(),
        }
    }

    /// The external generator, discovered on first use. Discovery failure
    /// is remembered as "absent" so a rule hit never pays the search twice.
    fn generator(&self) -> Option<&dyn Generator> {
        self.generator
            .get_or_init(
                || match ClaudeGenerator::discover(self.config.claude_binary.as_deref()) {
                    Ok(generator) => Some(generator),
                    Err(err) => {
                        tracing::warn!(error = %err, "generator unavailable");
                        None
                    }
                },
            )
            .as_ref()
            .map(|g| g as &dyn Generator)
    }

    /// Render a rule's template against the matched content. Returns `None`
    /// when the template fails or renders empty; either way the rule is
    /// skipped, not fatal.
    pub fn render_rule(&self, idx: usize, rule: &Rule, matched: &str) -> Option<String> {
        self.render(&rule.send, &TemplateContext::for_rule(matched), || {
            format!("rules[{idx}]")
        })
    }

    /// Render an arbitrary template with the same skip-on-failure policy.
    pub fn render(
        &self,
        template: &str,
        ctx: &TemplateContext,
        label: impl Fn() -> String,
    ) -> Option<String> {
        match self.renderer.render(template, ctx) {
            Ok(message) if !message.trim().is_empty() => Some(message),
            Ok(_) => {
                tracing::debug!(source = %label(), "rendered message is empty; skipping");
                None
            }
            Err(err) => {
                tracing::warn!(source = %label(), error = %err, "template failed; skipping");
                None
            }
        }
    }

    /// Apply the rule's generate mode to a rendered message.
    pub async fn finalize_message(
        &self,
        rendered: String,
        mode: GenerateMode,
        rule_body: &str,
    ) -> String {
        if mode == GenerateMode::Off {
            return rendered;
        }
        generate_message(
            &rendered,
            mode,
            rule_body,
            &self.session_id,
            self.store.as_ref(),
            self.generator(),
        )
        .await
    }
}

/// Abstracts input reading so tests can inject payloads.
#[async_trait]
pub trait InputProvider: Send + Sync {
    async fn read_hook_input(&mut self) -> Result<HookInput>;
}

#[async_trait]
impl InputProvider for StdinProcessor {
    async fn read_hook_input(&mut self) -> Result<HookInput> {
        self.read_hook_input().await
    }
}

/// Hook dispatcher routing classified events to handlers.
pub struct HookDispatcher {
    registry: HandlerRegistry,
    input_provider: Mutex<Box<dyn InputProvider>>,
}

impl HookDispatcher {
    /// Dispatcher reading from the process stdin.
    pub fn new() -> Self {
        Self::with_input_provider(Box::new(StdinProcessor::new()))
    }

    /// Dispatcher with an injected input source.
    pub fn with_input_provider(input_provider: Box<dyn InputProvider>) -> Self {
        Self {
            registry: HandlerRegistry::build(),
            input_provider: Mutex::new(input_provider),
        }
    }

    /// Evaluate one hook invocation end to end.
    pub async fn dispatch(&self) -> Result<HookResponse> {
        let input = match self.read_input().await {
            Ok(input) => input,
            Err(err) => {
                // Taxonomy: classification error. The host must not be
                // locked out by a payload we cannot read.
                tracing::warn!(error = %err, "unreadable hook payload; allowing");
                return Ok(HookResponse::Allow);
            }
        };

        let Some(event) = input.classify() else {
            tracing::debug!("unclassifiable payload; allowing");
            return Ok(HookResponse::Allow);
        };

        let cwd = event
            .meta()
            .cwd
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let project = ProjectContext::discover(&cwd);
        logging::init_logging(&project.log_path());

        let config = match Config::load(&project.config_path()) {
            Ok(config) => config,
            Err(ConfigError::FileNotFound { .. }) => {
                // No config means no rules can match; identical outcome,
                // cheaper path.
                return Ok(HookResponse::Allow);
            }
            Err(err) => return Err(err.into()),
        };

        let store = match Store::open(&project.db_path(), &project.id) {
            Ok(store) => Some(store),
            Err(err) => {
                tracing::warn!(error = %err, "store unavailable; caching disabled");
                None
            }
        };

        if let Some(store) = &store {
            if !store.rules_enabled() {
                tracing::debug!("rules disabled for project; allowing");
                return Ok(HookResponse::Allow);
            }
            if event.kind() == HookEventKind::PreToolUse
                && store.consume_skip_next().unwrap_or(false)
            {
                tracing::info!("skip_next flag consumed; allowing without evaluation");
                return Ok(HookResponse::Allow);
            }
        }

        let kind = event.kind();
        let session_id = event.meta().session_id.clone();
        let ctx = HookContext::new(config, project, store, session_id);

        let handler = self.registry.get_handler(kind)?;
        let timeout = Duration::from_millis(HANDLER_TIMEOUT_MS);
        let response = match tokio::time::timeout(timeout, handler.execute(event, &ctx)).await {
            Ok(result) => result?,
            Err(_timeout) => {
                return Err(BumpersError::Timeout {
                    operation: handler.name().to_string(),
                    timeout_ms: HANDLER_TIMEOUT_MS,
                });
            }
        };

        let outcome = match &response {
            HookResponse::Allow => "allow",
            HookResponse::Context { .. } => "context",
            HookResponse::Block { .. } => "block",
        };
        tracing::info!(event = %kind, outcome, "hook evaluated");
        Ok(response)
    }

    async fn read_input(&self) -> Result<HookInput> {
        let mut guard = self.input_provider.lock().await;
        guard.read_hook_input().await
    }
}

impl Default for HookDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
