//! Error handling for Bumpers
//!
//! This module provides the error types used across both crates, built on
//! thiserror, together with the exit-code mapping required by the hook
//! protocol: 0 allows, 1 reports an internal failure, 2 blocks.

use thiserror::Error;

/// Convenient result alias for Bumpers operations.
///
/// This is the primary `Result` used across Bumpers crates.
pub type Result<T> = std::result::Result<T, BumpersError>;
/// Result specialized for configuration loading and validation.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
/// Result specialized for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Root error type for all Bumpers operations.
///
/// Variants cover configuration, the cache/state store, template rendering,
/// message generation, JSON/IO processing, input validation, timeouts, and
/// contextual wrapping. Note that blocking a tool call is *not* an error:
/// blocks are ordinary responses and never travel through this type.
#[derive(Error, Debug)]
pub enum BumpersError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Generator error: {0}")]
    Generator(#[from] GeneratorError),

    #[error("JSON processing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Operation timeout: {operation} took longer than {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("{message}: {source}")]
    Context {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Wraps arbitrary errors from external libraries
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Process exit codes of the hook protocol.
///
/// The host agent interprets these bit-exactly: `Success` allows the action
/// (optionally with informational JSON on stdout), `Block` refuses the
/// pending tool call with a message on stderr, and `GeneralError` marks an
/// internal Bumpers failure the agent treats as an allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    Block = 2,
}

impl ExitCode {
    /// Raw process exit code
    pub const fn as_i32(self) -> i32 {
        self as i32
    }
}

impl From<&BumpersError> for ExitCode {
    fn from(_error: &BumpersError) -> Self {
        // Every error is an internal failure. Blocks never pass through
        // BumpersError, so there is nothing to map to ExitCode::Block here.
        ExitCode::GeneralError
    }
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid configuration format: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid regex for {field}: {pattern} - {reason}")]
    InvalidRegex {
        field: String,
        pattern: String,
        reason: String,
    },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Duplicate command name: {name}")]
    DuplicateCommand { name: String },

    #[error("Template for {field} is {bytes} bytes (maximum {max})")]
    SendTooLarge {
        field: String,
        bytes: usize,
        max: usize,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Cache/state store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to open store at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Migration to schema version {version} failed: {reason}")]
    Migration { version: i32, reason: String },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Template parse and render errors
///
/// These are per-rule failures: a broken template skips its rule instead of
/// blocking the host on an authoring mistake.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template is {bytes} bytes (maximum {max})")]
    TooLarge { bytes: usize, max: usize },

    #[error("Template parse error: {reason}")]
    Parse { reason: String },

    #[error("Unknown template function: {name}")]
    UnknownFunction { name: String },

    #[error("Unknown template key: .{name}")]
    UnknownKey { name: String },

    #[error("Bad argument for {function}: {reason}")]
    BadArgument { function: String, reason: String },
}

/// External generator errors
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Generator binary not found (searched config, PATH, and known install locations)")]
    NotFound,

    #[error("Generator exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Generator timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error context extension trait to attach additional context during
/// propagation.
pub trait ErrorContext<T> {
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| BumpersError::Context {
            message: f(),
            source: Box::new(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::GeneralError.as_i32(), 1);
        assert_eq!(ExitCode::Block.as_i32(), 2);
    }

    #[test]
    fn test_errors_map_to_general_error() {
        let err = BumpersError::InvalidInput {
            message: "bad".into(),
        };
        assert_eq!(ExitCode::from(&err), ExitCode::GeneralError);

        let err = BumpersError::Config(ConfigError::FileNotFound {
            path: "bumpers.yml".into(),
        });
        assert_eq!(ExitCode::from(&err), ExitCode::GeneralError);
    }

    #[test]
    fn test_context_preserves_message() {
        fn parse() -> Result<()> {
            Err(BumpersError::InvalidInput {
                message: "bad".into(),
            })
            .with_context(|| "while parsing input".to_string())
        }

        let err = parse().unwrap_err();
        let s = format!("{err}");
        assert!(s.contains("while parsing input"));
    }
}
