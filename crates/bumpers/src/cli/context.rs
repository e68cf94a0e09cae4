//! CLI entry point: command execution and exit-code surfacing
//!
//! `hook` output is protocol-bound and bit-exact; `validate` and `status`
//! are human commands and print freely. In both cases the exit code is the
//! single source of truth for the caller.

use crate::cli::Commands;
use crate::cli::dispatcher::HookDispatcher;
use bumpers_core::config::validate_all;
use bumpers_core::{Config, ConfigError, ExitCode, ProjectContext};
use std::path::PathBuf;

/// Executes parsed commands and maps outcomes to exit codes.
#[derive(Default)]
pub struct CliContext;

impl CliContext {
    pub fn new() -> Self {
        Self
    }

    /// Execute a command and return the process exit code.
    pub async fn execute(self, command: Commands) -> ExitCode {
        match command {
            Commands::Hook => self.run_hook().await,
            Commands::Validate { config } => self.run_validate(config),
            Commands::Status => self.run_status(),
        }
    }

    async fn run_hook(&self) -> ExitCode {
        let dispatcher = HookDispatcher::new();
        match dispatcher.dispatch().await {
            Ok(response) => {
                let mut stdout = std::io::stdout().lock();
                let mut stderr = std::io::stderr().lock();
                if response.write_to(&mut stdout, &mut stderr).is_err() {
                    // Nothing sane left to report on a broken pipe.
                    return ExitCode::GeneralError;
                }
                response.exit_code()
            }
            Err(err) => {
                tracing::error!(error = %err, "hook evaluation failed");
                eprintln!("bumpers: {err}");
                ExitCode::from(&err)
            }
        }
    }

    fn run_validate(&self, config: Option<PathBuf>) -> ExitCode {
        let path = config.unwrap_or_else(|| Self::project().config_path());
        let errors = validate_all(&path);
        if errors.is_empty() {
            println!("{}: ok", path.display());
            return ExitCode::Success;
        }
        for error in &errors {
            println!("error: {error}");
        }
        println!(
            "{}: {} problem{}",
            path.display(),
            errors.len(),
            if errors.len() == 1 { "" } else { "s" }
        );
        ExitCode::GeneralError
    }

    fn run_status(&self) -> ExitCode {
        let project = Self::project();
        println!("project: {} ({})", project.name, project.id);
        println!("root:    {}", project.root.display());

        match Config::load(&project.config_path()) {
            Ok(config) => println!(
                "config:  {} ({} rules, {} commands, {} notes)",
                project.config_path().display(),
                config.rules.len(),
                config.commands.len(),
                config.notes.len()
            ),
            Err(ConfigError::FileNotFound { .. }) => {
                println!("config:  {} (missing)", project.config_path().display());
            }
            Err(err) => println!("config:  invalid - {err}"),
        }

        match bumpers_core::Store::open(&project.db_path(), &project.id) {
            Ok(store) => println!(
                "store:   {} (rules {})",
                project.db_path().display(),
                if store.rules_enabled() {
                    "enabled"
                } else {
                    "disabled"
                }
            ),
            Err(err) => println!("store:   unavailable - {err}"),
        }

        ExitCode::Success
    }

    fn project() -> ProjectContext {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        ProjectContext::discover(&cwd)
    }
}
