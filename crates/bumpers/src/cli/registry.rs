//! Handler registry mapping event kinds to handlers

use crate::cli::handler::HookHandler;
use crate::cli::handlers::{
    PostToolUseHandler, PreToolUseHandler, SessionStartHandler, UserPromptSubmitHandler,
};
use bumpers_core::{BumpersError, HookEventKind, Result};
use dashmap::DashMap;

/// Type alias for thread-safe handler storage
type HandlerMap = DashMap<String, Box<dyn HookHandler>>;

/// Type alias for a handler reference to reduce type complexity
type HandlerRef<'a> = dashmap::mapref::one::Ref<'a, String, Box<dyn HookHandler>>;

/// Registry of the four event handlers, safe for concurrent access.
pub struct HandlerRegistry {
    handlers: HandlerMap,
}

impl HandlerRegistry {
    /// Build the registry with every handler registered.
    pub fn build() -> Self {
        let handlers = DashMap::new();

        handlers.insert(
            HookEventKind::PreToolUse.as_str().to_string(),
            Box::new(PreToolUseHandler) as Box<dyn HookHandler>,
        );
        handlers.insert(
            HookEventKind::PostToolUse.as_str().to_string(),
            Box::new(PostToolUseHandler) as Box<dyn HookHandler>,
        );
        handlers.insert(
            HookEventKind::UserPromptSubmit.as_str().to_string(),
            Box::new(UserPromptSubmitHandler) as Box<dyn HookHandler>,
        );
        handlers.insert(
            HookEventKind::SessionStart.as_str().to_string(),
            Box::new(SessionStartHandler) as Box<dyn HookHandler>,
        );

        Self { handlers }
    }

    /// Handler for the given event kind.
    pub fn get_handler(&self, kind: HookEventKind) -> Result<HandlerRef<'_>> {
        self.handlers
            .get(kind.as_str())
            .ok_or_else(|| BumpersError::InvalidInput {
                message: format!("No handler registered for event: {kind}"),
            })
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_event_kind_has_a_handler() {
        let registry = HandlerRegistry::build();
        for kind in HookEventKind::all() {
            let handler = registry.get_handler(*kind).unwrap();
            assert_eq!(handler.name(), kind.as_str());
        }
    }
}
