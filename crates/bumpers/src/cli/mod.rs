//! Command-line interface for Bumpers
//!
//! Command parsing, the hook dispatcher, and the per-event handlers.

mod commands;
pub mod context;
pub mod dispatcher;
pub mod handler;
pub mod handlers;
pub mod registry;

pub use commands::{Cli, Commands};
pub use context::CliContext;
pub use dispatcher::{HookContext, HookDispatcher};
pub use handler::HookHandler;
pub use registry::HandlerRegistry;
