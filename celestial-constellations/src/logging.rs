//! Build log sink.
//!
//! Logging is injected per build rather than registered once for the
//! process: [`LogSink::install`] makes a subscriber the default for the
//! current thread and returns a guard. Dropping the guard restores the
//! previous subscriber and flushes any file output.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::subscriber::DefaultGuard;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

use crate::error::{CatalogError, CatalogResult};

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Where build events are written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogDestination {
    /// Standard error.
    #[default]
    Console,
    File(PathBuf),
    Both(PathBuf),
}

impl LogDestination {
    fn console(&self) -> bool {
        matches!(self, LogDestination::Console | LogDestination::Both(_))
    }

    fn file(&self) -> Option<&Path> {
        match self {
            LogDestination::Console => None,
            LogDestination::File(path) | LogDestination::Both(path) => Some(path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub destination: LogDestination,
    /// An `EnvFilter` directive such as `info` or `celestial_constellations=debug`.
    /// `RUST_LOG`, when set, takes precedence.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            destination: LogDestination::Console,
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl LogConfig {
    /// Also write to `path`, keeping console output if it was enabled.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.destination = if self.destination.console() {
            LogDestination::Both(path)
        } else {
            LogDestination::File(path)
        };
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }
}

/// Active log sink; events go to it until dropped.
#[must_use = "the sink is uninstalled as soon as it is dropped"]
pub struct LogSink {
    // Field order matters: the subscriber is released before the file worker
    // flushes.
    _default: DefaultGuard,
    _worker: Option<WorkerGuard>,
}

impl LogSink {
    /// Install a sink for `config` on the current thread.
    ///
    /// # Errors
    /// [`CatalogError::InvalidOptions`] if the level directive does not parse
    /// or the log file cannot be created.
    pub fn install(config: &LogConfig) -> CatalogResult<Self> {
        let configured = EnvFilter::try_new(&config.level).map_err(|e| {
            CatalogError::InvalidOptions(format!("log level '{}': {}", config.level, e))
        })?;
        let filter = EnvFilter::try_from_default_env().unwrap_or(configured);

        let (file_layer, worker) = match config.destination.file() {
            Some(path) => {
                let (writer, worker) = tracing_appender::non_blocking(file_appender(path)?);
                let layer = tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(writer);
                (Some(layer), Some(worker))
            }
            None => (None, None),
        };

        let console_layer = config.destination.console().then(|| {
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
        });

        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .with(file_layer);

        Ok(Self {
            _default: tracing::subscriber::set_default(subscriber),
            _worker: worker,
        })
    }
}

fn file_appender(path: &Path) -> CatalogResult<RollingFileAppender> {
    let invalid = |reason: String| {
        CatalogError::InvalidOptions(format!("log file {:?}: {}", path, reason))
    };
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| invalid("no file name".to_string()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| invalid(e.to_string()))?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(&dir)
        .map_err(|e| invalid(e.to_string()))
}
