//! End-to-end passes over real temporary trees

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::fs;

use crate::engine::{SyncEngine, SyncOptions};
use crate::logger::SyncLogger;
use crate::sync_trees;

/// Snapshot a tree as relative path -> file content (None for directories)
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Option<Vec<u8>>> {
    let mut map = BTreeMap::new();
    for entry in walkdir::WalkDir::new(root).min_depth(1) {
        let entry = entry.unwrap();
        let rel = entry.path().strip_prefix(root).unwrap().to_path_buf();
        if entry.file_type().is_dir() {
            map.insert(rel, None);
        } else {
            map.insert(rel, Some(std::fs::read(entry.path()).unwrap()));
        }
    }
    map
}

fn log_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(String::from)
        .collect()
}

fn line_index(lines: &[String], needle: &str) -> usize {
    lines
        .iter()
        .position(|l| l.contains(needle))
        .unwrap_or_else(|| panic!("no log line containing '{}' in {:?}", needle, lines))
}

/// Like [`line_index`], but anchored to the end of the line so a record for
/// `sub/` is not confused with one for `sub/b.txt`
fn line_index_ending(lines: &[String], suffix: &str) -> usize {
    lines
        .iter()
        .position(|l| l.ends_with(suffix))
        .unwrap_or_else(|| panic!("no log line ending with '{}' in {:?}", suffix, lines))
}

#[tokio::test]
async fn test_mixed_update_create_delete_scenario() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    let replica = temp_dir.path().join("replica");
    let log_path = temp_dir.path().join("sync.log");

    fs::create_dir_all(source.join("sub")).await.unwrap();
    fs::write(source.join("a.txt"), b"hi").await.unwrap();
    fs::write(source.join("sub").join("b.txt"), b"yo").await.unwrap();

    fs::create_dir_all(&replica).await.unwrap();
    fs::write(replica.join("a.txt"), b"bye").await.unwrap();
    fs::write(replica.join("c.txt"), b"old").await.unwrap();

    let mut logger = SyncLogger::with_file(&log_path).unwrap();
    let report = sync_trees(&source, &replica, &mut logger).await.unwrap();

    assert_eq!(snapshot(&source), snapshot(&replica));
    assert_eq!(report.files_updated, 1);
    assert_eq!(report.files_created, 1);
    assert_eq!(report.dirs_created, 1);
    assert_eq!(report.entries_deleted, 1);
    assert!(report.errors.is_empty());

    let lines = log_lines(&log_path);
    assert_eq!(lines.len(), 4);
    let update_a = line_index(&lines, "Update a.txt");
    let create_sub = line_index_ending(&lines, "Create sub/");
    let create_b = line_index(&lines, "Create sub/b.txt");
    let delete_c = line_index(&lines, "Delete c.txt");

    // Parent directory before the file inside it, deletions last
    assert!(create_sub < create_b);
    assert!(delete_c > update_a);
    assert!(delete_c > create_b);
}

#[tokio::test]
async fn test_empty_source_empties_replica() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    let replica = temp_dir.path().join("replica");
    let log_path = temp_dir.path().join("sync.log");

    fs::create_dir_all(&source).await.unwrap();
    fs::create_dir_all(replica.join("y")).await.unwrap();
    fs::write(replica.join("x.txt"), b"x").await.unwrap();
    fs::write(replica.join("y").join("z.txt"), b"z").await.unwrap();

    let mut logger = SyncLogger::with_file(&log_path).unwrap();
    let report = sync_trees(&source, &replica, &mut logger).await.unwrap();

    assert!(snapshot(&replica).is_empty());
    assert_eq!(report.entries_deleted, 3);
    assert!(report.errors.is_empty());

    // Contents go before their containing directory
    let lines = log_lines(&log_path);
    assert!(line_index(&lines, "Delete y/z.txt") < line_index_ending(&lines, "Delete y/"));
}

#[tokio::test]
async fn test_identical_trees_perform_zero_operations() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    let replica = temp_dir.path().join("replica");
    let log_path = temp_dir.path().join("sync.log");

    for root in [&source, &replica] {
        fs::create_dir_all(root.join("sub")).await.unwrap();
        fs::write(root.join("a.txt"), b"same").await.unwrap();
        fs::write(root.join("sub").join("b.txt"), b"also same")
            .await
            .unwrap();
    }

    let mut logger = SyncLogger::with_file(&log_path).unwrap();
    let report = sync_trees(&source, &replica, &mut logger).await.unwrap();

    assert_eq!(report.mutation_count(), 0);
    assert!(report.is_clean());
    assert!(log_lines(&log_path).is_empty());
}

#[tokio::test]
async fn test_second_pass_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    let replica = temp_dir.path().join("replica");

    fs::create_dir_all(source.join("deep").join("deeper"))
        .await
        .unwrap();
    fs::write(source.join("root.txt"), b"root").await.unwrap();
    fs::write(source.join("deep").join("mid.txt"), b"mid")
        .await
        .unwrap();
    fs::write(source.join("deep").join("deeper").join("leaf.bin"), vec![7u8; 4096])
        .await
        .unwrap();

    let mut logger = SyncLogger::console_only();
    let first = sync_trees(&source, &replica, &mut logger).await.unwrap();
    assert!(first.mutation_count() > 0);

    let second = sync_trees(&source, &replica, &mut logger).await.unwrap();
    assert_eq!(second.mutation_count(), 0);
    assert!(second.is_clean());
}

#[tokio::test]
async fn test_convergence_on_nested_trees() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    let replica = temp_dir.path().join("replica");

    fs::create_dir_all(source.join("a").join("b")).await.unwrap();
    fs::create_dir_all(source.join("empty")).await.unwrap();
    fs::write(source.join("top.txt"), b"top").await.unwrap();
    fs::write(source.join("a").join("one.txt"), b"one").await.unwrap();
    fs::write(source.join("a").join("b").join("two.bin"), vec![0xffu8; 100])
        .await
        .unwrap();

    // Replica starts with unrelated content
    fs::create_dir_all(replica.join("stale").join("inner"))
        .await
        .unwrap();
    fs::write(replica.join("stale").join("inner").join("junk.txt"), b"junk")
        .await
        .unwrap();
    fs::write(replica.join("top.txt"), b"outdated").await.unwrap();

    let mut logger = SyncLogger::console_only();
    let report = sync_trees(&source, &replica, &mut logger).await.unwrap();

    assert_eq!(snapshot(&source), snapshot(&replica));
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn test_missing_replica_root_is_created() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    let replica = temp_dir.path().join("not").join("yet").join("there");

    fs::create_dir_all(&source).await.unwrap();
    fs::write(source.join("a.txt"), b"a").await.unwrap();

    let mut logger = SyncLogger::console_only();
    let report = sync_trees(&source, &replica, &mut logger).await.unwrap();

    assert!(replica.join("a.txt").is_file());
    assert_eq!(report.files_created, 1);
}

#[tokio::test]
async fn test_missing_source_root_is_fatal_and_mutates_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("gone");
    let replica = temp_dir.path().join("replica");

    fs::create_dir_all(&replica).await.unwrap();
    fs::write(replica.join("keep.txt"), b"keep").await.unwrap();

    let mut logger = SyncLogger::console_only();
    let err = sync_trees(&source, &replica, &mut logger).await.unwrap_err();

    assert!(matches!(err, crate::SyncError::SourceUnavailable { .. }));
    assert!(replica.join("keep.txt").is_file());
}

#[tokio::test]
async fn test_kind_change_converges_both_directions() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    let replica = temp_dir.path().join("replica");

    // file_to_dir: file in replica, directory in source
    // dir_to_file: directory in replica, file in source
    fs::create_dir_all(source.join("file_to_dir")).await.unwrap();
    fs::write(source.join("file_to_dir").join("inner.txt"), b"inner")
        .await
        .unwrap();
    fs::write(source.join("dir_to_file"), b"now a file").await.unwrap();

    fs::create_dir_all(replica.join("dir_to_file").join("nested"))
        .await
        .unwrap();
    fs::write(replica.join("dir_to_file").join("nested").join("x.txt"), b"x")
        .await
        .unwrap();
    fs::write(replica.join("file_to_dir"), b"was a file").await.unwrap();

    let mut logger = SyncLogger::console_only();
    let report = sync_trees(&source, &replica, &mut logger).await.unwrap();

    assert!(replica.join("file_to_dir").is_dir());
    assert!(replica.join("file_to_dir").join("inner.txt").is_file());
    assert!(replica.join("dir_to_file").is_file());
    assert_eq!(snapshot(&source), snapshot(&replica));
    assert!(report.errors.is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_partial_failure_isolation() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    let replica = temp_dir.path().join("replica");

    fs::create_dir_all(source.join("sub")).await.unwrap();
    fs::write(source.join("a.txt"), b"locked").await.unwrap();
    fs::write(source.join("b.txt"), b"fine").await.unwrap();
    fs::write(source.join("sub").join("c.txt"), b"also fine")
        .await
        .unwrap();

    let locked = source.join("a.txt");
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
    if std::fs::File::open(&locked).is_ok() {
        // Privileged user, the failure cannot be provoked
        return;
    }

    let mut logger = SyncLogger::console_only();
    let report = sync_trees(&source, &replica, &mut logger).await.unwrap();

    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].path.to_string_lossy().contains("a.txt"));

    // Every independent entry was still processed
    assert!(replica.join("b.txt").is_file());
    assert!(replica.join("sub").join("c.txt").is_file());
    assert!(!replica.join("a.txt").exists());
}

#[tokio::test]
async fn test_log_history_survives_multiple_passes() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    let replica = temp_dir.path().join("replica");
    let log_path = temp_dir.path().join("sync.log");

    fs::create_dir_all(&source).await.unwrap();
    fs::write(source.join("a.txt"), b"v1").await.unwrap();

    {
        let mut logger = SyncLogger::with_file(&log_path).unwrap();
        sync_trees(&source, &replica, &mut logger).await.unwrap();
    }

    fs::write(source.join("a.txt"), b"v2").await.unwrap();

    {
        // Reopening the log must not truncate history
        let mut logger = SyncLogger::with_file(&log_path).unwrap();
        sync_trees(&source, &replica, &mut logger).await.unwrap();
    }

    let lines = log_lines(&log_path);
    assert!(line_index(&lines, "Create a.txt") < line_index(&lines, "Update a.txt"));
}

#[tokio::test]
async fn test_configured_sha256_converges() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    let replica = temp_dir.path().join("replica");

    fs::create_dir_all(&source).await.unwrap();
    fs::create_dir_all(&replica).await.unwrap();
    // Same size, different content, so the digest must decide
    fs::write(source.join("a.txt"), b"abcde").await.unwrap();
    fs::write(replica.join("a.txt"), b"vwxyz").await.unwrap();

    let engine = SyncEngine::new(SyncOptions {
        hash_algorithm: crate::HashAlgorithm::Sha256,
    });
    let mut logger = SyncLogger::console_only();
    let report = engine.sync(&source, &replica, &mut logger).await.unwrap();

    assert_eq!(report.files_updated, 1);
    assert_eq!(
        std::fs::read(replica.join("a.txt")).unwrap(),
        b"abcde".to_vec()
    );
}

#[tokio::test]
async fn test_report_timestamps_are_ordered() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    let replica = temp_dir.path().join("replica");
    fs::create_dir_all(&source).await.unwrap();
    fs::write(source.join("a.txt"), b"a").await.unwrap();

    let mut logger = SyncLogger::console_only();
    let report = sync_trees(&source, &replica, &mut logger).await.unwrap();

    let finished = report.finished_at.expect("report must be finalized");
    assert!(finished >= report.started_at);
}
