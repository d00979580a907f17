//! Sync engine orchestrating one full pass: walk, diff, apply

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use crate::applier::SyncApplier;
use crate::diff::DiffEngine;
use crate::error::{Result, SyncError};
use crate::hasher::HashAlgorithm;
use crate::logger::{LogRecord, SyncLogger};
use crate::report::{IssueKind, SyncReport};
use crate::walker::{TreeWalker, WalkedTree};

/// Options for sync passes
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Digest algorithm used for content-equality detection
    pub hash_algorithm: HashAlgorithm,
}

/// Composes the walker, diff engine and applier behind a single entry point
///
/// A pass is sequential and idempotent: running it twice with no
/// intervening source changes performs zero mutations the second time. The
/// engine holds no timer state; periodic invocation is the caller's
/// concern, and passes for the same source/replica pair must never
/// overlap.
pub struct SyncEngine {
    walker: TreeWalker,
    differ: DiffEngine,
    applier: SyncApplier,
}

impl SyncEngine {
    /// Create a new sync engine with options
    pub fn new(options: SyncOptions) -> Self {
        Self {
            walker: TreeWalker::new(),
            differ: DiffEngine::new(options.hash_algorithm),
            applier: SyncApplier::new(),
        }
    }

    /// Run one synchronization pass from `source` to `replica`
    ///
    /// Returns the pass report, or an error only when the source root
    /// cannot be enumerated at all (in which case the replica is left
    /// untouched). Per-entry failures are inside the report.
    pub async fn sync<P1: AsRef<Path>, P2: AsRef<Path>>(
        &self,
        source: P1,
        replica: P2,
        logger: &mut SyncLogger,
    ) -> Result<SyncReport> {
        let source_root = source.as_ref();
        let replica_root = replica.as_ref();

        info!(
            "Starting sync pass from '{}' to '{}'",
            source_root.display(),
            replica_root.display()
        );

        let mut report = SyncReport::new();
        let fallbacks_before = logger.fallback_count();

        // Fatal when the source cannot be enumerated; nothing is mutated.
        let source_tree = self.walker.walk(source_root)?;

        let replica_tree = if replica_root.exists() {
            if !replica_root.is_dir() {
                return Err(SyncError::Generic(anyhow::anyhow!(
                    "Replica root '{}' exists but is not a directory",
                    replica_root.display()
                )));
            }
            self.walker.walk_or_empty(replica_root)?
        } else {
            info!(
                "Replica root '{}' does not exist, creating it",
                replica_root.display()
            );
            fs::create_dir_all(replica_root).await.map_err(|e| {
                SyncError::dir_create_error(
                    replica_root,
                    format!("Failed to create replica root: {}", e),
                )
            })?;
            WalkedTree::default()
        };

        record_walk_issues(&source_tree, logger, &mut report);
        record_walk_issues(&replica_tree, logger, &mut report);

        let plan = self
            .differ
            .diff(
                source_root,
                replica_root,
                &source_tree.entries,
                &replica_tree.entries,
            )
            .await?;

        debug!(
            dirs = plan.create_dirs.len(),
            copies = plan.copy.len(),
            deletes = plan.delete.len(),
            "Diff plan computed"
        );

        self.applier
            .apply(&plan, source_root, replica_root, logger, &mut report)
            .await;

        report.log_fallbacks = logger.fallback_count() - fallbacks_before;
        report.finish();

        info!("{}", report.summary());
        Ok(report)
    }
}

fn record_walk_issues(tree: &WalkedTree, logger: &mut SyncLogger, report: &mut SyncReport) {
    for issue in &tree.issues {
        logger.log(&LogRecord::failed(&issue.path, false, issue.detail.clone()));
        report.record_issue(IssueKind::Walk, issue.path.clone(), issue.detail.clone());
    }
}
