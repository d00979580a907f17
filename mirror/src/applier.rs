//! Plan execution against the replica tree

use std::path::Path;

use tokio::fs;

use crate::diff::{CopyItem, CopyReason, DeleteItem, DiffPlan, DirCreate};
use crate::logger::{LogRecord, OperationKind, SyncLogger};
use crate::report::{IssueKind, SyncReport};
use crate::walker::EntryKind;

/// Applies a [`DiffPlan`] to the replica tree
///
/// Directories are created parents-first, then files copied, then stale
/// entries removed children-first, so the replica is a valid tree at every
/// step. Every operation is logged at the moment it happens. A failure on
/// one entry is logged, counted in the report, and the pass continues with
/// the next entry.
///
/// Copies write to the final path; a failed copy is reported and never
/// recorded as complete, but the write itself is best-effort, not an
/// atomic rename.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncApplier;

impl SyncApplier {
    /// Create a new applier
    pub fn new() -> Self {
        Self
    }

    /// Execute the plan, filling `report` with outcomes
    pub async fn apply(
        &self,
        plan: &DiffPlan,
        source_root: &Path,
        replica_root: &Path,
        logger: &mut SyncLogger,
        report: &mut SyncReport,
    ) {
        for item in &plan.create_dirs {
            self.create_dir(item, replica_root, logger, report).await;
        }

        for item in &plan.copy {
            self.copy_file(item, source_root, replica_root, logger, report)
                .await;
        }

        for item in &plan.delete {
            self.delete_entry(item, replica_root, logger, report).await;
        }
    }

    async fn create_dir(
        &self,
        item: &DirCreate,
        replica_root: &Path,
        logger: &mut SyncLogger,
        report: &mut SyncReport,
    ) {
        let target = replica_root.join(&item.relative_path);

        if item.replaces_file {
            // A file holds this path in the replica; the kind change
            // removes it before the directory can exist.
            match fs::remove_file(&target).await {
                Ok(()) => {
                    logger.log(&LogRecord::operation(
                        OperationKind::Delete,
                        &item.relative_path,
                        false,
                    ));
                    report.record_deleted();
                }
                Err(e) => {
                    note_failure(
                        logger,
                        report,
                        IssueKind::FileDelete,
                        &item.relative_path,
                        false,
                        format!("Failed to delete file: {}", e),
                    );
                    return;
                }
            }
        }

        // Non-recursive on purpose: parents come earlier in the plan, and
        // a failed parent must surface one error per affected child.
        match fs::create_dir(&target).await {
            Ok(()) => {
                logger.log(&LogRecord::operation(
                    OperationKind::Create,
                    &item.relative_path,
                    true,
                ));
                report.record_dir_created();
            }
            Err(e) => {
                note_failure(
                    logger,
                    report,
                    IssueKind::DirectoryCreate,
                    &item.relative_path,
                    true,
                    format!("Failed to create directory: {}", e),
                );
            }
        }
    }

    async fn copy_file(
        &self,
        item: &CopyItem,
        source_root: &Path,
        replica_root: &Path,
        logger: &mut SyncLogger,
        report: &mut SyncReport,
    ) {
        let source_path = source_root.join(&item.relative_path);
        let target = replica_root.join(&item.relative_path);

        if item.replaces_dir {
            // A directory holds this path in the replica; the kind change
            // removes the whole subtree before the file can exist.
            match fs::remove_dir_all(&target).await {
                Ok(()) => {
                    logger.log(&LogRecord::operation(
                        OperationKind::Delete,
                        &item.relative_path,
                        true,
                    ));
                    report.record_deleted();
                }
                Err(e) => {
                    note_failure(
                        logger,
                        report,
                        IssueKind::DirectoryDelete,
                        &item.relative_path,
                        true,
                        format!("Failed to delete directory: {}", e),
                    );
                    return;
                }
            }
        }

        match fs::copy(&source_path, &target).await {
            Ok(_) => match item.reason {
                CopyReason::New => {
                    logger.log(&LogRecord::operation(
                        OperationKind::Create,
                        &item.relative_path,
                        false,
                    ));
                    report.record_file_created();
                }
                CopyReason::Changed => {
                    logger.log(&LogRecord::operation(
                        OperationKind::Update,
                        &item.relative_path,
                        false,
                    ));
                    report.record_file_updated();
                }
            },
            Err(e) => {
                note_failure(
                    logger,
                    report,
                    IssueKind::FileWrite,
                    &item.relative_path,
                    false,
                    format!("Failed to copy file: {}", e),
                );
            }
        }
    }

    async fn delete_entry(
        &self,
        item: &DeleteItem,
        replica_root: &Path,
        logger: &mut SyncLogger,
        report: &mut SyncReport,
    ) {
        let target = replica_root.join(&item.relative_path);

        let result = match item.kind {
            EntryKind::File => fs::remove_file(&target).await,
            // Expected empty: everything beneath it was deleted earlier in
            // this pass or a prior one.
            EntryKind::Directory => fs::remove_dir(&target).await,
        };

        match result {
            Ok(()) => {
                logger.log(&LogRecord::operation(
                    OperationKind::Delete,
                    &item.relative_path,
                    item.kind == EntryKind::Directory,
                ));
                report.record_deleted();
            }
            Err(e) => {
                let (kind, is_dir) = match item.kind {
                    EntryKind::File => (IssueKind::FileDelete, false),
                    EntryKind::Directory => (IssueKind::DirectoryDelete, true),
                };
                note_failure(
                    logger,
                    report,
                    kind,
                    &item.relative_path,
                    is_dir,
                    format!("Failed to delete: {}", e),
                );
            }
        }
    }
}

fn note_failure(
    logger: &mut SyncLogger,
    report: &mut SyncReport,
    kind: IssueKind,
    relative_path: &Path,
    is_dir: bool,
    detail: String,
) {
    logger.log(&LogRecord::failed(relative_path, is_dir, detail.clone()));
    report.record_issue(kind, relative_path, detail);
}
