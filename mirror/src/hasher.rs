//! Content fingerprinting used to decide whether two same-named files differ

use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncReadExt;

use crate::error::{Result, SyncError};

/// Read buffer for streaming digests; files are never loaded whole
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Digest algorithms supported for fingerprinting
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// Blake3 hash (faster)
    #[default]
    Blake3,
    /// SHA-256 hash
    Sha256,
}

impl HashAlgorithm {
    /// Instantiate the hasher for this algorithm
    pub fn hasher(&self) -> Box<dyn ContentHasher> {
        match self {
            HashAlgorithm::Blake3 => Box::new(Blake3Hasher),
            HashAlgorithm::Sha256 => Box::new(Sha256Hasher),
        }
    }
}

/// Incremental digest computation over one file's bytes
pub trait DigestState: Send {
    /// Feed the next chunk of file bytes
    fn update(&mut self, bytes: &[u8]);
    /// Consume the state and produce the hex digest
    fn finalize(self: Box<Self>) -> String;
}

/// A swappable content digest algorithm
///
/// The diff engine only ever talks to this trait, so the algorithm can be
/// exchanged without touching diff or apply logic.
pub trait ContentHasher: Send + Sync {
    /// Short algorithm name, e.g. `"blake3"`
    fn name(&self) -> &'static str;
    /// Start a fresh digest for one file
    fn begin(&self) -> Box<dyn DigestState>;
}

/// Blake3 content hasher
pub struct Blake3Hasher;

impl ContentHasher for Blake3Hasher {
    fn name(&self) -> &'static str {
        "blake3"
    }

    fn begin(&self) -> Box<dyn DigestState> {
        Box::new(blake3::Hasher::new())
    }
}

impl DigestState for blake3::Hasher {
    fn update(&mut self, bytes: &[u8]) {
        blake3::Hasher::update(self, bytes);
    }

    fn finalize(self: Box<Self>) -> String {
        blake3::Hasher::finalize(&self).to_hex().to_string()
    }
}

/// SHA-256 content hasher
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn name(&self) -> &'static str {
        "sha256"
    }

    fn begin(&self) -> Box<dyn DigestState> {
        Box::new(Sha256::new())
    }
}

impl DigestState for Sha256 {
    fn update(&mut self, bytes: &[u8]) {
        Digest::update(self, bytes);
    }

    fn finalize(self: Box<Self>) -> String {
        format!("{:x}", Digest::finalize(*self))
    }
}

/// Size plus content digest for one file
///
/// Two files are equal iff both fields match; size is the cheap pre-filter,
/// the digest is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFingerprint {
    /// File size in bytes
    pub size: u64,
    /// Hex content digest
    pub digest: String,
}

/// Fingerprint a file by streaming its contents through `hasher`
///
/// Fails with a `FileRead` error if the file is unreadable or vanishes
/// mid-read; callers treat that as a per-entry condition, not a fatal one.
pub async fn fingerprint(path: &Path, hasher: &dyn ContentHasher) -> Result<FileFingerprint> {
    let mut file = fs::File::open(path)
        .await
        .map_err(|e| SyncError::read_error(path, format!("Failed to open file: {}", e)))?;

    let size = file
        .metadata()
        .await
        .map_err(|e| SyncError::read_error(path, format!("Failed to read metadata: {}", e)))?
        .len();

    let mut state = hasher.begin();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .await
            .map_err(|e| SyncError::read_error(path, format!("Failed to read file: {}", e)))?;

        if bytes_read == 0 {
            break;
        }

        state.update(&buffer[..bytes_read]);
    }

    Ok(FileFingerprint {
        size,
        digest: state.finalize(),
    })
}
