//! Per-pass outcome reporting

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Classification of a recorded per-entry failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueKind {
    /// A file could not be copied into the replica
    FileWrite,
    /// A replica directory could not be created
    DirectoryCreate,
    /// A stale replica file could not be removed
    FileDelete,
    /// A stale replica directory could not be removed
    DirectoryDelete,
    /// An entry could not be enumerated during the walk
    Walk,
}

/// One per-entry failure encountered during a pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncIssue {
    pub path: PathBuf,
    pub kind: IssueKind,
    pub detail: String,
}

/// Summary of one sync pass
///
/// Created fresh per pass and immutable once returned by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    /// Unique pass identifier
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Directories created in the replica
    pub dirs_created: usize,
    /// Files copied that did not previously exist
    pub files_created: usize,
    /// Files overwritten because content differed
    pub files_updated: usize,
    /// Stale files and directories removed
    pub entries_deleted: usize,
    /// Per-entry failures; the pass continued past each of them
    pub errors: Vec<SyncIssue>,
    /// Records the durable log sink failed to persist this pass
    pub log_fallbacks: usize,
}

impl Default for SyncReport {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncReport {
    /// Create a report for a pass starting now
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            dirs_created: 0,
            files_created: 0,
            files_updated: 0,
            entries_deleted: 0,
            errors: Vec::new(),
            log_fallbacks: 0,
        }
    }

    pub(crate) fn record_dir_created(&mut self) {
        self.dirs_created += 1;
    }

    pub(crate) fn record_file_created(&mut self) {
        self.files_created += 1;
    }

    pub(crate) fn record_file_updated(&mut self) {
        self.files_updated += 1;
    }

    pub(crate) fn record_deleted(&mut self) {
        self.entries_deleted += 1;
    }

    pub(crate) fn record_issue(
        &mut self,
        kind: IssueKind,
        path: impl Into<PathBuf>,
        detail: impl Into<String>,
    ) {
        self.errors.push(SyncIssue {
            path: path.into(),
            kind,
            detail: detail.into(),
        });
    }

    pub(crate) fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Total mutations applied to the replica this pass
    pub fn mutation_count(&self) -> usize {
        self.dirs_created + self.files_created + self.files_updated + self.entries_deleted
    }

    /// Whether the pass completed without errors or degraded logging
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.log_fallbacks == 0
    }

    /// Wall-clock duration of the pass in seconds
    pub fn duration_secs(&self) -> f64 {
        let end = self.finished_at.unwrap_or(self.started_at);
        (end - self.started_at)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Get a one-line summary string
    pub fn summary(&self) -> String {
        format!(
            "Pass {} finished in {:.2}s: {} dirs created, {} files created, {} updated, {} deleted, {} errors",
            self.session_id,
            self.duration_secs(),
            self.dirs_created,
            self.files_created,
            self.files_updated,
            self.entries_deleted,
            self.errors.len()
        )
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
