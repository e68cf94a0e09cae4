//! Logging infrastructure
//!
//! A thin wrapper around the `tracing` ecosystem. Operator detail goes to a
//! size-rotated JSON log file under the XDG state directory, one per
//! project; stdout and stderr carry the hook protocol and are never touched
//! by the subscriber. If the log file cannot be opened, logging is dropped
//! rather than redirected; a broken log path must not corrupt protocol
//! output.
//!
//! The filter is taken from `BUMPERS_LOG` (standard `tracing_subscriber`
//! `EnvFilter` syntax), defaulting to `info`.

mod rolling;

pub use rolling::{RollingLogConfig, RollingLogger, SharedLogger};

use std::path::Path;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable controlling the log filter.
pub const LOG_FILTER_ENV: &str = "BUMPERS_LOG";

/// Initialize the global subscriber writing to the rotating log at `path`.
///
/// Safe to call when a subscriber is already installed (later calls are
/// no-ops) and when the log file cannot be created (logging is silently
/// disabled for this invocation).
pub fn init_logging(path: &Path) {
    let Ok(logger) = RollingLogger::new(path.to_path_buf(), RollingLogConfig::default()) else {
        return;
    };

    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(logger.into_shared()),
        )
        .try_init();
}
