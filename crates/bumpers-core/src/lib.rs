//! Core library for Bumpers, a policy-enforcement hook for Claude Code
//!
//! Bumpers runs as a short-lived subprocess at agent lifecycle events,
//! reads one JSON event from stdin, evaluates user-authored rules, and
//! answers through a strict exit-code protocol. This crate holds the
//! engine pieces: event classification, config loading, rule matching,
//! transcript intent extraction, template rendering, message generation,
//! the cache/state store, project identity, and logging. The binary crate
//! wires them into the hook dispatcher.

pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod generate;
pub mod hook_events;
pub mod logging;
pub mod project;
pub mod rules;
pub mod store;
pub mod template;
pub mod transcript;

pub use config::{Command, Config, Note};
pub use error::{
    BumpersError, ConfigError, ExitCode, GeneratorError, Result, StoreError, TemplateError,
};
pub use event::{HookEvent, HookInput};
pub use generate::GenerateMode;
pub use hook_events::{EventTag, HookEventKind, SourceTag, event_constants};
pub use project::ProjectContext;
pub use rules::Rule;
pub use store::Store;
pub use template::{Renderer, TemplateContext};
pub use transcript::TailReader;
