use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Current cache format version. Incremented on incompatible layout changes.
pub const CACHE_FORMAT_VERSION: u32 = 1;
/// Environment variable overriding the cache root.
pub const CACHE_DIR_ENV: &str = "PODBUILD_CACHE_DIR";
const VERSION_FILE: &str = "version";

/// Directory layout of the download cache.
///
/// ```text
/// <root>/version
/// <root>/.lock
/// <root>/downloads/<key>        raw archives
/// <root>/extracted/<key>/       unpacked trees
/// <root>/entries/<key>.json     fetch records
/// <root>/staging/               scratch space for atomic renames
/// ```
#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheVersion {
    format_version: u32,
}

impl CacheLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn downloads_dir(&self) -> PathBuf {
        self.root.join("downloads")
    }

    #[inline]
    pub fn download_path(&self, key: &str) -> PathBuf {
        self.downloads_dir().join(key)
    }

    #[inline]
    pub fn extracted_dir(&self) -> PathBuf {
        self.root.join("extracted")
    }

    #[inline]
    pub fn extracted_path(&self, key: &str) -> PathBuf {
        self.extracted_dir().join(key)
    }

    #[inline]
    pub fn entries_dir(&self) -> PathBuf {
        self.root.join("entries")
    }

    #[inline]
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.entries_dir().join(format!("{key}.json"))
    }

    /// Scratch space on the same filesystem as the cache, so finished work
    /// can be renamed into place.
    #[inline]
    pub fn staging_dir(&self) -> PathBuf {
        self.root.join("staging")
    }

    #[inline]
    pub fn lock_file(&self) -> PathBuf {
        self.root.join(".lock")
    }

    pub fn initialize(&self) -> Result<(), StoreError> {
        fs::create_dir_all(self.downloads_dir())?;
        fs::create_dir_all(self.extracted_dir())?;
        fs::create_dir_all(self.entries_dir())?;
        fs::create_dir_all(self.staging_dir())?;

        let version_path = self.root.join(VERSION_FILE);
        if version_path.exists() {
            self.verify_version()?;
        } else {
            let ver = CacheVersion {
                format_version: CACHE_FORMAT_VERSION,
            };
            let content = serde_json::to_string_pretty(&ver)?;
            let mut tmp = NamedTempFile::new_in(&self.root)?;
            tmp.write_all(content.as_bytes())?;
            tmp.as_file().sync_all()?;
            tmp.persist(&version_path)
                .map_err(|e| StoreError::Io(e.error))?;
            crate::fsync_dir(&self.root)?;
        }

        Ok(())
    }

    pub fn verify_version(&self) -> Result<(), StoreError> {
        let version_path = self.root.join(VERSION_FILE);
        let content = fs::read_to_string(&version_path)?;
        let ver: CacheVersion = serde_json::from_str(&content)?;

        if ver.format_version != CACHE_FORMAT_VERSION {
            return Err(StoreError::VersionMismatch {
                expected: CACHE_FORMAT_VERSION,
                found: ver.format_version,
            });
        }
        Ok(())
    }
}

/// `$PODBUILD_CACHE_DIR`, else `$HOME/.cache/podbuild`.
pub fn default_cache_root() -> Result<PathBuf, StoreError> {
    if let Ok(dir) = std::env::var(CACHE_DIR_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").map_err(|_| {
        StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("HOME not set and {CACHE_DIR_ENV} not given"),
        ))
    })?;
    Ok(PathBuf::from(home).join(".cache").join("podbuild"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths_are_correct() {
        let layout = CacheLayout::new("/tmp/podbuild-test");
        assert_eq!(
            layout.download_path("abc"),
            PathBuf::from("/tmp/podbuild-test/downloads/abc")
        );
        assert_eq!(
            layout.extracted_path("abc"),
            PathBuf::from("/tmp/podbuild-test/extracted/abc")
        );
        assert_eq!(
            layout.entry_path("abc"),
            PathBuf::from("/tmp/podbuild-test/entries/abc.json")
        );
        assert_eq!(layout.lock_file(), PathBuf::from("/tmp/podbuild-test/.lock"));
    }

    #[test]
    fn initialize_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let layout = CacheLayout::new(dir.path());
        layout.initialize().unwrap();

        assert!(layout.downloads_dir().is_dir());
        assert!(layout.extracted_dir().is_dir());
        assert!(layout.entries_dir().is_dir());
        assert!(layout.staging_dir().is_dir());
    }

    #[test]
    fn initialize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = CacheLayout::new(dir.path());
        layout.initialize().unwrap();
        layout.initialize().unwrap();
        layout.verify_version().unwrap();
    }

    #[test]
    fn foreign_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let layout = CacheLayout::new(dir.path());
        layout.initialize().unwrap();
        fs::write(dir.path().join(VERSION_FILE), r#"{"format_version": 99}"#).unwrap();
        assert!(matches!(
            layout.initialize(),
            Err(StoreError::VersionMismatch {
                expected: CACHE_FORMAT_VERSION,
                found: 99
            })
        ));
    }
}
