//! Command-line parser and command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Policy-enforcement hook for Claude Code
#[derive(Parser, Debug)]
#[command(name = "bumpers")]
#[command(about = "Policy-enforcement hook for Claude Code")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Evaluate one hook event from stdin (invoked by Claude Code)
    Hook,

    /// Check the config file and report every problem
    Validate {
        /// Config file to check (defaults to bumpers.yml at the project root)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show project identity, config counts, and store state
    Status,
}

impl Commands {
    /// Returns true if this command expects JSON input on stdin
    pub fn expects_stdin(&self) -> bool {
        matches!(self, Commands::Hook)
    }
}

impl std::fmt::Display for Commands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Commands::Hook => write!(f, "hook"),
            Commands::Validate { .. } => write!(f, "validate"),
            Commands::Status => write!(f, "status"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_hook_reads_stdin() {
        assert!(Commands::Hook.expects_stdin());
        assert!(!Commands::Validate { config: None }.expects_stdin());
        assert!(!Commands::Status.expects_stdin());
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["bumpers", "hook"]).unwrap();
        assert!(matches!(cli.command, Commands::Hook));

        let cli = Cli::try_parse_from(["bumpers", "validate", "--config", "x.yml"]).unwrap();
        match cli.command {
            Commands::Validate { config } => {
                assert_eq!(config.as_deref(), Some(std::path::Path::new("x.yml")));
            }
            other => panic!("expected validate, got {other:?}"),
        }
    }
}
