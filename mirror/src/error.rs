//! Error types for the mirror engine library

use std::path::PathBuf;

/// Result type alias for mirror operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Error type covering every failure class of a sync pass
///
/// `SourceUnavailable` is fatal and is returned to the caller before any
/// mutation takes place. The per-entry variants (`FileRead`, `FileWrite`,
/// `DirectoryCreate`, `FileDelete`, `DirectoryDelete`) are recorded in the
/// [`SyncReport`](crate::report::SyncReport) and never abort a pass.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Source root missing or unreadable; the pass performs no mutation
    #[error("Source tree unavailable at '{path}': {message}")]
    SourceUnavailable { path: PathBuf, message: String },

    /// A file could not be opened or read
    #[error("Read error at '{path}': {message}")]
    FileRead { path: PathBuf, message: String },

    /// A file could not be copied or written
    #[error("Write error at '{path}': {message}")]
    FileWrite { path: PathBuf, message: String },

    /// A directory could not be created
    #[error("Directory create error at '{path}': {message}")]
    DirectoryCreate { path: PathBuf, message: String },

    /// A file could not be deleted
    #[error("File delete error at '{path}': {message}")]
    FileDelete { path: PathBuf, message: String },

    /// A directory could not be deleted
    #[error("Directory delete error at '{path}': {message}")]
    DirectoryDelete { path: PathBuf, message: String },

    /// The durable log sink rejected a record
    #[error("Log sink error: {0}")]
    LogSink(String),

    /// IO errors without a more specific classification
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("Error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl SyncError {
    /// Create a new fatal source-unavailable error
    pub fn source_unavailable(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new file read error
    pub fn read_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::FileRead {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new file write error
    pub fn write_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::FileWrite {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new directory create error
    pub fn dir_create_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::DirectoryCreate {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new file delete error
    pub fn file_delete_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::FileDelete {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new directory delete error
    pub fn dir_delete_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::DirectoryDelete {
            path: path.into(),
            message: message.into(),
        }
    }
}
