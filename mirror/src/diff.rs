//! Diff computation: a merge-join over two ordered tree enumerations

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::hasher::{fingerprint, ContentHasher, HashAlgorithm};
use crate::walker::{EntryKind, PathEntry};

/// Why a file is scheduled for copying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CopyReason {
    /// The path does not exist in the replica
    New,
    /// The path exists in both trees but content differs
    Changed,
}

/// A directory to create in the replica
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirCreate {
    pub relative_path: PathBuf,
    /// A file currently occupies this path in the replica; it is removed
    /// immediately before the directory is created
    pub replaces_file: bool,
}

/// A file to copy from source to replica
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyItem {
    pub relative_path: PathBuf,
    pub size: u64,
    pub reason: CopyReason,
    /// A directory currently occupies this path in the replica; it is
    /// removed recursively immediately before the copy
    pub replaces_dir: bool,
}

/// A stale replica entry to remove
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteItem {
    pub relative_path: PathBuf,
    pub kind: EntryKind,
}

/// The set of operations converging replica to source for one pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffPlan {
    /// Directories to create, shallowest first (parents before children)
    pub create_dirs: Vec<DirCreate>,
    /// Files to copy or overwrite, in enumeration order
    pub copy: Vec<CopyItem>,
    /// Stale entries to remove, deepest first (children before parents)
    pub delete: Vec<DeleteItem>,
}

impl DiffPlan {
    /// Whether the plan contains no operations
    pub fn is_empty(&self) -> bool {
        self.create_dirs.is_empty() && self.copy.is_empty() && self.delete.is_empty()
    }

    /// Total number of planned operations
    pub fn len(&self) -> usize {
        self.create_dirs.len() + self.copy.len() + self.delete.len()
    }
}

/// Computes a [`DiffPlan`] from two ordered tree enumerations
///
/// The digest algorithm is injected as a [`ContentHasher`], so it can be
/// swapped without touching the join or the applier.
pub struct DiffEngine {
    hasher: Box<dyn ContentHasher>,
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new(HashAlgorithm::default())
    }
}

impl DiffEngine {
    /// Create a diff engine using the given digest algorithm
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            hasher: algorithm.hasher(),
        }
    }

    /// Create a diff engine with a custom hasher implementation
    pub fn with_hasher(hasher: Box<dyn ContentHasher>) -> Self {
        Self { hasher }
    }

    /// Merge-join the two enumerations into a plan
    ///
    /// Both inputs must be ordered by relative path as produced by
    /// [`TreeWalker`](crate::walker::TreeWalker); the join is a single
    /// linear pass over both. Fingerprints are computed only for same-path
    /// file pairs whose sizes match, so unmatched entries never pay the
    /// hashing cost.
    pub async fn diff(
        &self,
        source_root: &Path,
        replica_root: &Path,
        source: &[PathEntry],
        replica: &[PathEntry],
    ) -> Result<DiffPlan> {
        let mut plan = DiffPlan::default();
        // Replica subtrees scheduled for recursive removal by a kind
        // change; their children must not be scheduled individually.
        let mut replaced_dirs: Vec<PathBuf> = Vec::new();

        let mut i = 0;
        let mut j = 0;

        while i < source.len() && j < replica.len() {
            let src = &source[i];
            let rep = &replica[j];

            match src.relative_path.cmp(&rep.relative_path) {
                Ordering::Less => {
                    schedule_create(&mut plan, src);
                    i += 1;
                }
                Ordering::Greater => {
                    schedule_delete(&mut plan, rep, &replaced_dirs);
                    j += 1;
                }
                Ordering::Equal => {
                    match (src.kind, rep.kind) {
                        (EntryKind::Directory, EntryKind::Directory) => {}
                        (EntryKind::File, EntryKind::File) => {
                            if self.files_differ(source_root, replica_root, src, rep).await {
                                plan.copy.push(CopyItem {
                                    relative_path: src.relative_path.clone(),
                                    size: src.size,
                                    reason: CopyReason::Changed,
                                    replaces_dir: false,
                                });
                            }
                        }
                        // Kind changes are never merged in place: the
                        // replica entry goes, the source entry is created.
                        (EntryKind::Directory, EntryKind::File) => {
                            plan.create_dirs.push(DirCreate {
                                relative_path: src.relative_path.clone(),
                                replaces_file: true,
                            });
                        }
                        (EntryKind::File, EntryKind::Directory) => {
                            plan.copy.push(CopyItem {
                                relative_path: src.relative_path.clone(),
                                size: src.size,
                                reason: CopyReason::New,
                                replaces_dir: true,
                            });
                            replaced_dirs.push(rep.relative_path.clone());
                        }
                    }
                    i += 1;
                    j += 1;
                }
            }
        }

        while i < source.len() {
            schedule_create(&mut plan, &source[i]);
            i += 1;
        }

        while j < replica.len() {
            schedule_delete(&mut plan, &replica[j], &replaced_dirs);
            j += 1;
        }

        sort_create_dirs(&mut plan.create_dirs);
        sort_deletes(&mut plan.delete);

        Ok(plan)
    }

    /// Decide whether a same-path file pair needs a copy
    ///
    /// Size first as the cheap inequality check; digests only when sizes
    /// match. An unreadable side schedules the copy conservatively — the
    /// apply step reports the definitive error if the condition persists.
    async fn files_differ(
        &self,
        source_root: &Path,
        replica_root: &Path,
        src: &PathEntry,
        rep: &PathEntry,
    ) -> bool {
        if src.size != rep.size {
            return true;
        }

        let src_path = source_root.join(&src.relative_path);
        let rep_path = replica_root.join(&rep.relative_path);

        let src_fp = fingerprint(&src_path, self.hasher.as_ref()).await;
        let rep_fp = fingerprint(&rep_path, self.hasher.as_ref()).await;

        match (src_fp, rep_fp) {
            (Ok(src_fp), Ok(rep_fp)) => src_fp != rep_fp,
            (Err(e), _) | (_, Err(e)) => {
                warn!(
                    "Fingerprint failed for '{}', scheduling copy: {}",
                    src.relative_path.display(),
                    e
                );
                true
            }
        }
    }
}

fn schedule_create(plan: &mut DiffPlan, entry: &PathEntry) {
    match entry.kind {
        EntryKind::Directory => plan.create_dirs.push(DirCreate {
            relative_path: entry.relative_path.clone(),
            replaces_file: false,
        }),
        EntryKind::File => plan.copy.push(CopyItem {
            relative_path: entry.relative_path.clone(),
            size: entry.size,
            reason: CopyReason::New,
            replaces_dir: false,
        }),
    }
}

fn schedule_delete(plan: &mut DiffPlan, entry: &PathEntry, replaced_dirs: &[PathBuf]) {
    // Covered by a scheduled recursive removal
    if replaced_dirs
        .iter()
        .any(|prefix| entry.relative_path.starts_with(prefix))
    {
        return;
    }

    plan.delete.push(DeleteItem {
        relative_path: entry.relative_path.clone(),
        kind: entry.kind,
    });
}

fn depth(path: &Path) -> usize {
    path.components().count()
}

/// Order directory creations shallowest-first so parents exist before
/// their children are created
pub(crate) fn sort_create_dirs(dirs: &mut [DirCreate]) {
    dirs.sort_by(|a, b| {
        depth(&a.relative_path)
            .cmp(&depth(&b.relative_path))
            .then_with(|| a.relative_path.cmp(&b.relative_path))
    });
}

/// Order deletions deepest-first (then reverse lexicographic) so a
/// directory is removed only after everything beneath it
pub(crate) fn sort_deletes(items: &mut [DeleteItem]) {
    items.sort_by(|a, b| {
        depth(&b.relative_path)
            .cmp(&depth(&a.relative_path))
            .then_with(|| b.relative_path.cmp(&a.relative_path))
    });
}
