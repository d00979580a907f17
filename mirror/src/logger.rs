//! Operation logging to a durable append-only file and the live console

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{Result, SyncError};

/// Operation kinds recorded in the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    Create,
    Update,
    Delete,
    Error,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Create => write!(f, "Create"),
            OperationKind::Update => write!(f, "Update"),
            OperationKind::Delete => write!(f, "Delete"),
            OperationKind::Error => write!(f, "Error"),
        }
    }
}

/// One log line: timestamp, operation, path, optional error detail
///
/// Records are appended and never mutated or removed; the log file keeps
/// its history across process restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub operation: OperationKind,
    /// Path relative to the replica root; directories carry a trailing `/`
    pub path: String,
    pub detail: Option<String>,
}

impl LogRecord {
    /// Record a successfully applied mutation
    pub fn operation(operation: OperationKind, relative_path: &Path, is_dir: bool) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            path: display_path(relative_path, is_dir),
            detail: None,
        }
    }

    /// Record a failed operation with its error detail
    pub fn failed(relative_path: &Path, is_dir: bool, detail: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            operation: OperationKind::Error,
            path: display_path(relative_path, is_dir),
            detail: Some(detail.into()),
        }
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.operation,
            self.path
        )?;
        if let Some(detail) = &self.detail {
            write!(f, " [error: {}]", detail)?;
        }
        Ok(())
    }
}

/// Render a relative path for logging, marking directories with `/`
fn display_path(relative_path: &Path, is_dir: bool) -> String {
    let mut rendered = relative_path.display().to_string();
    if is_dir && !rendered.ends_with('/') {
        rendered.push('/');
    }
    rendered
}

/// Appends log records to a durable file and mirrors them on the console
///
/// A failed append degrades that record to console-only and is counted;
/// the sync itself never fails because of the log.
#[derive(Debug)]
pub struct SyncLogger {
    sink: Option<File>,
    path: Option<PathBuf>,
    fallbacks: usize,
}

impl SyncLogger {
    /// Open (or create) an append-only log file at `path`
    ///
    /// Reopening an existing log never truncates prior history.
    pub fn with_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                SyncError::LogSink(format!(
                    "Failed to open log file '{}': {}",
                    path.display(),
                    e
                ))
            })?;

        Ok(Self {
            sink: Some(file),
            path: Some(path.to_path_buf()),
            fallbacks: 0,
        })
    }

    /// A logger with no durable sink; records go to the console only
    pub fn console_only() -> Self {
        Self {
            sink: None,
            path: None,
            fallbacks: 0,
        }
    }

    /// Emit one record to the console stream and the durable sink
    pub fn log(&mut self, record: &LogRecord) {
        match record.operation {
            OperationKind::Error => error!("{}", record),
            _ => info!("{}", record),
        }

        if let Some(file) = self.sink.as_mut() {
            if let Err(e) = writeln!(file, "{}", record) {
                warn!(
                    "Log sink unavailable, record kept on console only: {}",
                    e
                );
                self.fallbacks += 1;
            }
        }
    }

    /// How many records were degraded to console-only
    pub fn fallback_count(&self) -> usize {
        self.fallbacks
    }

    /// Path of the durable sink, if one is configured
    pub fn log_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
