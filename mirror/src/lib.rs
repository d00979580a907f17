//! Mirror Engine Library
//!
//! A one-way directory synchronization library providing:
//! - Deterministic, restartable directory enumeration
//! - Content-digest change detection with a swappable hash algorithm
//! - Minimal create/update/delete planning via an ordered merge-join
//! - Fault-tolerant plan application (one bad entry never aborts a pass)
//! - Durable, append-only operation logging with a live console stream
//!
//! After a successful pass, the replica's file set, contents and directory
//! structure exactly equal the source's. A pass is idempotent: repeating
//! it with an unchanged source performs zero mutations.

pub mod applier;
pub mod diff;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod logger;
pub mod report;
pub mod walker;

// Re-export main types and functions
pub use applier::SyncApplier;
pub use diff::{CopyItem, CopyReason, DeleteItem, DiffEngine, DiffPlan, DirCreate};
pub use engine::{SyncEngine, SyncOptions};
pub use error::{Result, SyncError};
pub use hasher::{
    fingerprint, Blake3Hasher, ContentHasher, FileFingerprint, HashAlgorithm, Sha256Hasher,
};
pub use logger::{LogRecord, OperationKind, SyncLogger};
pub use report::{IssueKind, SyncIssue, SyncReport};
pub use walker::{EntryKind, PathEntry, TreeWalker, WalkedTree};

/// Synchronize `replica` to exactly mirror `source` with default options
pub async fn sync_trees(
    source: impl AsRef<std::path::Path>,
    replica: impl AsRef<std::path::Path>,
    logger: &mut SyncLogger,
) -> Result<SyncReport> {
    let engine = SyncEngine::new(SyncOptions::default());
    engine.sync(source, replica, logger).await
}

// Test modules
#[cfg(test)]
mod integration_tests;
