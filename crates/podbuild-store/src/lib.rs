//! Download cache for pod sources.
//!
//! This crate provides the fetch side of podbuild: `CacheLayout` for the
//! on-disk cache structure, `PodCache` for downloading, verifying and
//! extracting source archives exactly once per URL, `CacheLock` for
//! serializing writers, and `export` for copying a cached tree into a
//! workspace.

pub mod cache;
pub mod download;
pub mod extract;
pub mod layout;
pub mod lock;

pub use cache::{cache_key, CacheEntry, FetchRequest, PodCache};
pub use download::Downloader;
pub use extract::{extract_archive, ArchiveKind};
pub use layout::{default_cache_root, CacheLayout, CACHE_DIR_ENV, CACHE_FORMAT_VERSION};
pub use lock::{install_signal_handler, CacheLock};

use std::path::Path;
use thiserror::Error;

/// Fsync a directory so that a preceding `rename()` is durable.
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("download failed: {0}")]
    Http(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("checksum mismatch for '{url}': expected {expected}, got {actual}")]
    IntegrityFailure {
        url: String,
        expected: String,
        actual: String,
    },
    #[error("unsupported archive format: {0}")]
    UnsupportedArchive(String),
    #[error("invalid archive: {0}")]
    Archive(String),
    #[error("offline mode: '{0}' is not cached")]
    Offline(String),
    #[error("interrupted")]
    Interrupted,
    #[error("lock acquisition failed: {0}")]
    LockFailed(String),
    #[error("cache format version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("cache entry not found: {0}")]
    EntryNotFound(String),
    #[error("invalid sub directory '{0}'")]
    InvalidSubDir(String),
}
