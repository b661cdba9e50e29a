//! Per-run logging: console plus a transient log file in the target directory.

use std::path::{Path, PathBuf};
use tracing::{Level, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{HardsubError, Result};

/// Owns the file sink for one run.
///
/// Dropping the session flushes the file writer and removes the log file
/// unless it was asked to keep it, on every exit path of `main`.
pub struct LogSession {
    log_path: Option<PathBuf>,
    keep_log: bool,
    guard: Option<WorkerGuard>,
}

impl LogSession {
    /// Install the global subscriber. Without a `log_dir` only the console sink is used.
    pub fn init(log_dir: Option<&Path>, verbose: bool, keep_log: bool) -> Result<Self> {
        let console_level = if verbose { Level::DEBUG } else { Level::INFO };

        let console_layer = fmt::layer()
            .with_target(false)
            .with_filter(LevelFilter::from_level(console_level));

        let (file_layer, guard, log_path) = match log_dir {
            Some(dir) => {
                let file_name = log_file_name();
                let (writer, guard) = non_blocking(rolling::never(dir, &file_name));
                let layer = fmt::layer()
                    .with_writer(writer)
                    .with_target(false)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(false) // No ANSI colors in file
                    .with_filter(LevelFilter::DEBUG);
                (Some(layer), Some(guard), Some(dir.join(file_name)))
            }
            None => (None, None, None),
        };

        tracing_subscriber::registry()
            .with(EnvFilter::from_default_env().add_directive(Level::DEBUG.into()))
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .map_err(|e| HardsubError::Config(format!("Failed to initialize logging: {}", e)))?;

        if let Some(path) = &log_path {
            info!("Logging initialized - console: {}, file: {}", console_level, path.display());
        }

        Ok(Self {
            log_path,
            keep_log,
            guard,
        })
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }
}

impl Drop for LogSession {
    fn drop(&mut self) {
        info!("Processing finished");
        // Flushes and closes the file writer
        drop(self.guard.take());

        if self.keep_log {
            return;
        }
        if let Some(path) = self.log_path.take() {
            if let Err(e) = remove_log_file(&path) {
                warn!("{}", e);
            }
        }
    }
}

/// `hardsub_YYYYmmdd_HHMMSS.log`
pub fn log_file_name() -> String {
    format!("hardsub_{}.log", chrono::Local::now().format("%Y%m%d_%H%M%S"))
}

/// Best-effort removal; a file that is already gone is not an error.
pub fn remove_log_file(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(HardsubError::Cleanup {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}
