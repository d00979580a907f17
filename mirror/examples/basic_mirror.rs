//! Basic example demonstrating the mirror engine library

use std::error::Error;

use mirror::{sync_trees, SyncLogger};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("Basic Mirror Engine Example");
    println!("===========================");

    // Create temporary directories for testing
    let temp_dir = tempfile::TempDir::new()?;
    let source_dir = temp_dir.path().join("source");
    let replica_dir = temp_dir.path().join("replica");
    let log_path = temp_dir.path().join("mirror.log");

    // Setup source directory with some test files
    tokio::fs::create_dir_all(&source_dir).await?;
    tokio::fs::write(source_dir.join("file1.txt"), b"This is file 1 content").await?;
    tokio::fs::create_dir(source_dir.join("subdir")).await?;
    tokio::fs::write(source_dir.join("subdir").join("file2.txt"), b"This is file 2 content")
        .await?;

    // Seed the replica with content that must not survive the pass
    tokio::fs::create_dir_all(&replica_dir).await?;
    tokio::fs::write(replica_dir.join("stale.txt"), b"left over from before").await?;

    println!("Source directory:  {}", source_dir.display());
    println!("Replica directory: {}", replica_dir.display());
    println!();

    // First pass: replica converges to source
    let mut logger = SyncLogger::with_file(&log_path)?;
    let report = sync_trees(&source_dir, &replica_dir, &mut logger).await?;

    println!("{}", report.summary());
    assert!(replica_dir.join("file1.txt").exists());
    assert!(replica_dir.join("subdir").join("file2.txt").exists());
    assert!(!replica_dir.join("stale.txt").exists());

    // Second pass: nothing left to do
    let report = sync_trees(&source_dir, &replica_dir, &mut logger).await?;
    println!("{}", report.summary());
    assert_eq!(report.mutation_count(), 0);

    println!();
    println!("Operation log at {}:", log_path.display());
    print!("{}", std::fs::read_to_string(&log_path)?);

    Ok(())
}
