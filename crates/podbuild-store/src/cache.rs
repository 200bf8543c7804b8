use crate::download::Downloader;
use crate::extract::{content_root, extract_archive, ArchiveKind};
use crate::layout::CacheLayout;
use crate::lock::{checkpoint, CacheLock};
use crate::{fsync_dir, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Record of one fetched archive, stored at `entries/<key>.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub url: String,
    /// blake3 of the downloaded archive.
    pub checksum: String,
    pub archive: String,
    pub bytes: u64,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct FetchRequest {
    pub url: String,
    /// Expected blake3 of the archive, hex encoded.
    pub checksum: Option<String>,
    /// Never touch the network; fail unless the archive is cached.
    pub offline: bool,
}

impl FetchRequest {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_owned(),
            ..Self::default()
        }
    }

    fn accepts(&self, entry: &CacheEntry) -> bool {
        match self.checksum.as_deref() {
            Some(want) => want.eq_ignore_ascii_case(&entry.checksum),
            None => true,
        }
    }
}

/// Cache key of a source URL.
pub fn cache_key(url: &str) -> String {
    blake3::hash(url.trim().as_bytes()).to_hex().to_string()
}

/// Downloads each source archive once and keeps the extracted tree.
pub struct PodCache {
    layout: CacheLayout,
    downloader: Downloader,
}

impl PodCache {
    /// Open (creating if needed) the cache rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let layout = CacheLayout::new(root);
        layout.initialize()?;
        Ok(Self {
            layout,
            downloader: Downloader::new(),
        })
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    /// The fetch record for `key`, if the archive and its tree are present.
    pub fn entry(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        let path = self.layout.entry_path(key);
        if !path.is_file() || !self.layout.extracted_path(key).is_dir() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Make `request.url` available in the cache, downloading and extracting
    /// it if needed.
    pub fn fetch(
        &self,
        request: &FetchRequest,
        progress: &dyn Fn(&str),
    ) -> Result<CacheEntry, StoreError> {
        let key = cache_key(&request.url);

        if let Some(entry) = self.cached(request, &key)? {
            progress(&format!("using cached {}", request.url));
            return Ok(entry);
        }
        if request.offline {
            return Err(StoreError::Offline(request.url.clone()));
        }

        let _lock = CacheLock::acquire(&self.layout.lock_file())?;
        // Another process may have finished the same fetch while we waited.
        if let Some(entry) = self.cached(request, &key)? {
            progress(&format!("using cached {}", request.url));
            return Ok(entry);
        }

        progress(&format!("downloading {}...", request.url));
        let downloaded = self
            .downloader
            .download(&request.url, &self.layout.staging_dir())?;
        if let Some(expected) = &request.checksum {
            if !expected.eq_ignore_ascii_case(&downloaded.checksum) {
                return Err(StoreError::IntegrityFailure {
                    url: request.url.clone(),
                    expected: expected.clone(),
                    actual: downloaded.checksum,
                });
            }
        }
        checkpoint()?;

        let kind = match ArchiveKind::from_name(&request.url) {
            Some(kind) => kind,
            None => ArchiveKind::sniff(downloaded.file.path())?
                .ok_or_else(|| StoreError::UnsupportedArchive(request.url.clone()))?,
        };

        progress("extracting...");
        let staging = tempfile::Builder::new()
            .prefix("extract-")
            .tempdir_in(self.layout.staging_dir())?;
        extract_archive(downloaded.file.path(), kind, staging.path())?;
        checkpoint()?;

        let dest = self.layout.extracted_path(&key);
        if dest.exists() {
            fs::remove_dir_all(&dest)?;
        }
        fs::rename(staging.path(), &dest)?;
        fsync_dir(&self.layout.extracted_dir())?;

        downloaded
            .file
            .persist(self.layout.download_path(&key))
            .map_err(|e| StoreError::Io(e.error))?;

        let entry = CacheEntry {
            key: key.clone(),
            url: request.url.clone(),
            checksum: downloaded.checksum,
            archive: kind.as_str().to_owned(),
            bytes: downloaded.bytes,
            fetched_at: Utc::now(),
        };
        self.write_entry(&entry)?;
        info!("cached {} as {key} ({} bytes)", request.url, entry.bytes);
        progress(&format!("cached {}", request.url));
        Ok(entry)
    }

    fn cached(&self, request: &FetchRequest, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        match self.entry(key)? {
            Some(entry) if request.accepts(&entry) => Ok(Some(entry)),
            Some(entry) => {
                warn!(
                    "cached {} has checksum {}, which does not match the expected one",
                    entry.url, entry.checksum
                );
                if request.offline {
                    return Err(StoreError::IntegrityFailure {
                        url: entry.url,
                        expected: request.checksum.clone().unwrap_or_default(),
                        actual: entry.checksum,
                    });
                }
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn write_entry(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        let dir = self.layout.entries_dir();
        let content = serde_json::to_string_pretty(entry)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.layout.entry_path(&entry.key))
            .map_err(|e| StoreError::Io(e.error))?;
        fsync_dir(&dir)?;
        Ok(())
    }

    /// Copy the extracted tree for `key` (or `sub_dir` inside it) to `into`,
    /// replacing whatever is there. The copy is assembled next to `into` and
    /// renamed into place.
    pub fn export(&self, key: &str, sub_dir: Option<&str>, into: &Path) -> Result<PathBuf, StoreError> {
        if self.entry(key)?.is_none() {
            return Err(StoreError::EntryNotFound(key.to_owned()));
        }
        let mut src = content_root(&self.layout.extracted_path(key))?;
        if let Some(sub) = sub_dir.filter(|s| !s.is_empty()) {
            let rel = Path::new(sub);
            if rel
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
            {
                return Err(StoreError::InvalidSubDir(sub.to_owned()));
            }
            src = src.join(rel);
            if !src.is_dir() {
                return Err(StoreError::InvalidSubDir(sub.to_owned()));
            }
        }

        let parent = match into.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;
        let staging = tempfile::Builder::new()
            .prefix(".podbuild-export-")
            .tempdir_in(&parent)?;
        let copied = copy_tree(&src, staging.path())?;
        checkpoint()?;

        if into.exists() {
            fs::remove_dir_all(into)?;
        }
        fs::rename(staging.path(), into)?;
        fsync_dir(&parent)?;
        debug!("exported {copied} files from {key} to {}", into.display());
        Ok(into.to_path_buf())
    }
}

/// Recursive copy that keeps symlinks as links. Returns the number of files
/// and links copied.
fn copy_tree(src: &Path, dst: &Path) -> Result<usize, StoreError> {
    fs::create_dir_all(dst)?;
    let mut count = 0;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            count += copy_tree(&from, &to)?;
        } else if file_type.is_symlink() {
            copy_link(&from, &to)?;
            count += 1;
        } else {
            fs::copy(&from, &to)?;
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(unix)]
fn copy_link(from: &Path, to: &Path) -> Result<(), StoreError> {
    std::os::unix::fs::symlink(fs::read_link(from)?, to)?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_link(from: &Path, to: &Path) -> Result<(), StoreError> {
    fs::copy(from, to)?;
    Ok(())
}
