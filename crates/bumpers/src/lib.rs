//! Bumpers: policy-enforcement hook for Claude Code
//!
//! The binary crate wires the engine from `bumpers-core` into the hook
//! protocol: stdin JSON in, exit code plus one-shot stdout/stderr out.

/// Command-line interface module
pub mod cli;

/// JSON input/output for the hook protocol
pub mod io;

pub use cli::{Cli, Commands};
