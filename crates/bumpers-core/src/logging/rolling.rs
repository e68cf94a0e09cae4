//! Size-rotated log files with bounded backups
//!
//! One log file per project, rotated when it reaches the size limit:
//! `name.log` becomes `name.log.1` (optionally gzipped), existing backups
//! shift up, and anything beyond the backup count or the retention window is
//! removed. Writes are buffered and flushed per entry; a thread-safe handle
//! is provided for use as a tracing writer.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use flate2::Compression;
use flate2::write::GzEncoder;
use parking_lot::Mutex;

use crate::constants::{LOG_RETENTION_DAYS, MAX_LOG_BACKUPS, MAX_LOG_FILE_SIZE};

/// Rotation policy for one log file.
#[derive(Debug, Clone)]
pub struct RollingLogConfig {
    /// Rotate once the active file would exceed this many bytes
    pub max_file_size_bytes: usize,
    /// Number of rotated files kept (`.1` .. `.N`)
    pub max_backups: usize,
    /// Rotated files older than this many days are pruned
    pub retention_days: u64,
    /// Gzip rotated files
    pub compress_on_roll: bool,
}

impl Default for RollingLogConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: MAX_LOG_FILE_SIZE,
            max_backups: MAX_LOG_BACKUPS,
            retention_days: LOG_RETENTION_DAYS,
            compress_on_roll: false,
        }
    }
}

/// Log file writer with size-based rotation.
pub struct RollingLogger {
    path: PathBuf,
    config: RollingLogConfig,
    current_file: Option<BufWriter<File>>,
    current_file_size: usize,
}

impl RollingLogger {
    /// Open (or create) the log file at `path`, creating parent
    /// directories as needed.
    pub fn new(path: PathBuf, config: RollingLogConfig) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut logger = Self {
            path,
            config,
            current_file: None,
            current_file_size: 0,
        };
        logger.open_current_file()?;
        Ok(logger)
    }

    /// Append raw bytes, rotating first if the entry would push the file
    /// over the size limit.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.current_file_size + bytes.len() > self.config.max_file_size_bytes {
            self.rotate()?;
        }
        if let Some(file) = &mut self.current_file {
            file.write_all(bytes)?;
            self.current_file_size += bytes.len();
        }
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = &mut self.current_file {
            file.flush()?;
        }
        Ok(())
    }

    /// Wrap in a shareable handle usable as a tracing writer.
    pub fn into_shared(self) -> SharedLogger {
        SharedLogger {
            inner: Arc::new(Mutex::new(self)),
        }
    }

    fn open_current_file(&mut self) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.current_file_size = file.metadata()?.len() as usize;
        self.current_file = Some(BufWriter::new(file));
        Ok(())
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let suffix = if self.config.compress_on_roll {
            format!("{index}.gz")
        } else {
            index.to_string()
        };
        PathBuf::from(format!("{}.{suffix}", self.path.display()))
    }

    fn rotate(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.current_file.take() {
            file.flush()?;
        }

        // Shift name.log.2 -> name.log.3 and so on; the oldest falls off.
        for index in (1..self.config.max_backups).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                fs::rename(&from, self.backup_path(index + 1))?;
            }
        }

        if self.config.max_backups > 0 {
            let rotated = self.backup_path(1);
            if self.config.compress_on_roll {
                self.compress_to(&rotated)?;
                fs::remove_file(&self.path)?;
            } else {
                fs::rename(&self.path, &rotated)?;
            }
        } else {
            fs::remove_file(&self.path)?;
        }

        self.prune_old_backups();
        self.current_file_size = 0;
        self.open_current_file()
    }

    fn compress_to(&self, target: &PathBuf) -> io::Result<()> {
        let mut source = File::open(&self.path)?;
        let mut encoder = GzEncoder::new(File::create(target)?, Compression::default());
        io::copy(&mut source, &mut encoder)?;
        encoder.finish()?;
        Ok(())
    }

    /// Remove rotated files past the retention window. Count limits are
    /// enforced by the shift; this handles stale leftovers.
    fn prune_old_backups(&self) {
        let cutoff = Duration::from_secs(self.config.retention_days * 24 * 60 * 60);
        for index in 1..=self.config.max_backups {
            let path = self.backup_path(index);
            let Ok(metadata) = fs::metadata(&path) else {
                continue;
            };
            let expired = metadata
                .modified()
                .ok()
                .and_then(|modified| SystemTime::now().duration_since(modified).ok())
                .is_some_and(|age| age > cutoff);
            if expired {
                let _ = fs::remove_file(&path);
            }
        }
    }
}

/// Thread-safe logger handle; clones share one file.
#[derive(Clone)]
pub struct SharedLogger {
    inner: Arc<Mutex<RollingLogger>>,
}

impl io::Write for SharedLogger {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().write_bytes(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedLogger {
    type Writer = SharedLogger;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
