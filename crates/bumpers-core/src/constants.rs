//! Size and limit constants shared across the crate
//!
//! Centralizes timeout values, size caps, and protocol limits so the same
//! numbers are not scattered through the codebase.

/// Number of bytes in a kilobyte
pub const BYTES_PER_KB: usize = 1024;

/// Number of bytes in a megabyte
pub const BYTES_PER_MB: usize = 1024 * 1024;

/// Maximum size of a rule's `send` template body
pub const MAX_SEND_BYTES: usize = 64 * BYTES_PER_KB;

/// Maximum template source the renderer will accept
///
/// Aligned with [`MAX_SEND_BYTES`] so a config-valid rule body can never be
/// rejected at render time.
pub const MAX_TEMPLATE_BYTES: usize = MAX_SEND_BYTES;

/// Maximum hook payload accepted on stdin (bytes)
pub const MAX_INPUT_SIZE: usize = 10 * BYTES_PER_MB;

/// Per-read stdin timeout in milliseconds
pub const STDIN_READ_TIMEOUT_MS: u64 = 2000;

/// Total stdin processing timeout in milliseconds
pub const STDIN_PROCESSING_TIMEOUT_MS: u64 = 10_000;

/// Maximum JSON nesting depth accepted on stdin
pub const JSON_DEPTH_MAX: u32 = 64;

/// Upper bound on one hook evaluation, including generation
pub const HANDLER_TIMEOUT_MS: u64 = 60_000;

/// Chunk size for reverse transcript reads
pub const TRANSCRIPT_CHUNK_BYTES: usize = 32 * BYTES_PER_KB;

/// Total byte budget for one transcript extraction
pub const TRANSCRIPT_READ_BUDGET: u64 = 256 * BYTES_PER_KB as u64;

/// Timeout for one external generator invocation
pub const GENERATOR_TIMEOUT_SECS: u64 = 30;

/// SQLite busy timeout applied on open (milliseconds)
pub const STORE_BUSY_TIMEOUT_MS: u64 = 5000;

/// Maximum size of one log file before rotation
pub const MAX_LOG_FILE_SIZE: usize = 10 * BYTES_PER_MB;

/// Number of rotated log files kept
pub const MAX_LOG_BACKUPS: usize = 3;

/// Rotated log files older than this are pruned
pub const LOG_RETENTION_DAYS: u64 = 30;

/// Config file name looked up at the project root
pub const DEFAULT_CONFIG_FILE: &str = "bumpers.yml";
