//! Deterministic directory tree enumeration using walkdir

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;
use walkdir::WalkDir;

use crate::error::{Result, SyncError};

/// Kind tag for an enumerated filesystem object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    File,
    Directory,
}

/// A relative path under a walked root plus its kind
///
/// Entries are compared by relative path, component-wise — never by raw OS
/// strings, so ordering is identical across platforms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathEntry {
    /// Path relative to the walked root
    pub relative_path: PathBuf,
    /// Whether this is a file or a directory
    pub kind: EntryKind,
    /// File size in bytes (0 for directories)
    pub size: u64,
}

impl PathEntry {
    /// Whether this entry is a directory
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Number of path components
    pub fn depth(&self) -> usize {
        self.relative_path.components().count()
    }
}

/// A non-fatal problem encountered while enumerating a tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkIssue {
    pub path: PathBuf,
    pub detail: String,
}

/// The outcome of walking one root
#[derive(Debug, Clone, Default)]
pub struct WalkedTree {
    /// Entries ordered by relative path, depth-first, directories first
    pub entries: Vec<PathEntry>,
    /// Entries that could not be enumerated; the walk continued past them
    pub issues: Vec<WalkIssue>,
}

/// Enumerates files and directories under a root in a deterministic order
///
/// Siblings are visited sorted by file name, depth-first, with each
/// directory yielded before its contents, so the produced sequence is
/// totally ordered by relative-path components — the order the diff
/// engine's merge-join relies on. A walk can be repeated on every pass; it
/// is not a live watch.
///
/// Symbolic links are neither files nor directories for engine purposes:
/// they are skipped with a console warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeWalker;

impl TreeWalker {
    /// Create a new tree walker
    pub fn new() -> Self {
        Self
    }

    /// Walk `root`, failing if it does not exist or is not a directory
    ///
    /// Used for the source tree, where an unreadable root aborts the whole
    /// pass before any mutation.
    pub fn walk(&self, root: &Path) -> Result<WalkedTree> {
        if !root.exists() {
            return Err(SyncError::source_unavailable(
                root,
                "Directory does not exist",
            ));
        }

        if !root.is_dir() {
            return Err(SyncError::source_unavailable(
                root,
                "Path is not a directory",
            ));
        }

        Ok(self.walk_entries(root))
    }

    /// Walk `root`, treating a missing root as an empty tree
    ///
    /// Used for the replica tree: on the first pass the replica may not
    /// exist yet, which is not an error.
    pub fn walk_or_empty(&self, root: &Path) -> Result<WalkedTree> {
        if !root.exists() {
            return Ok(WalkedTree::default());
        }

        if !root.is_dir() {
            return Err(SyncError::source_unavailable(
                root,
                "Path is not a directory",
            ));
        }

        Ok(self.walk_entries(root))
    }

    fn walk_entries(&self, root: &Path) -> WalkedTree {
        let mut tree = WalkedTree::default();

        let walk = WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        for result in walk {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    warn!("Failed to enumerate '{}': {}", path.display(), e);
                    tree.issues.push(WalkIssue {
                        path,
                        detail: e.to_string(),
                    });
                    continue;
                }
            };

            let file_type = entry.file_type();

            if file_type.is_symlink() {
                warn!(
                    "Skipping symbolic link '{}': links are not mirrored",
                    entry.path().display()
                );
                continue;
            }

            let relative_path = match entry.path().strip_prefix(root) {
                Ok(rel) => rel.to_path_buf(),
                Err(e) => {
                    tree.issues.push(WalkIssue {
                        path: entry.path().to_path_buf(),
                        detail: format!("Failed to relativize path: {}", e),
                    });
                    continue;
                }
            };

            if file_type.is_dir() {
                tree.entries.push(PathEntry {
                    relative_path,
                    kind: EntryKind::Directory,
                    size: 0,
                });
            } else if file_type.is_file() {
                let size = match entry.metadata() {
                    Ok(metadata) => metadata.len(),
                    Err(e) => {
                        warn!(
                            "Failed to read metadata for '{}': {}",
                            entry.path().display(),
                            e
                        );
                        tree.issues.push(WalkIssue {
                            path: entry.path().to_path_buf(),
                            detail: format!("Failed to read metadata: {}", e),
                        });
                        continue;
                    }
                };

                tree.entries.push(PathEntry {
                    relative_path,
                    kind: EntryKind::File,
                    size,
                });
            } else {
                // Sockets, fifos, devices
                warn!(
                    "Skipping special file '{}': neither file nor directory",
                    entry.path().display()
                );
            }
        }

        tree
    }
}
