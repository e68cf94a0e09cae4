//! Hook handler trait

use crate::cli::dispatcher::HookContext;
use crate::io::HookResponse;
use async_trait::async_trait;
use bumpers_core::{HookEvent, Result};

/// Trait for per-event hook handlers with async execution.
///
/// A handler receives the classified event and the evaluation context and
/// produces the protocol response. Handlers localize failures: template and
/// transcript trouble skips the affected rule, generator trouble falls back
/// to the rendered text. Only genuinely internal errors propagate.
#[async_trait]
pub trait HookHandler: Send + Sync {
    /// Evaluate one hook event
    async fn execute(&self, event: HookEvent, ctx: &HookContext) -> Result<HookResponse>;

    /// Event name for logging and registry lookup
    fn name(&self) -> &'static str;
}
