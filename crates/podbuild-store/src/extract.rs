use crate::StoreError;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Tar,
    TarGz,
    Zip,
}

impl ArchiveKind {
    /// Guess the archive format from a URL or file name, ignoring any query
    /// string or fragment.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name
            .split(['?', '#'])
            .next()
            .unwrap_or(name)
            .to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveKind::TarGz)
        } else if name.ends_with(".tar") {
            Some(ArchiveKind::Tar)
        } else if name.ends_with(".zip") {
            Some(ArchiveKind::Zip)
        } else {
            None
        }
    }

    /// Sniff the format from leading magic bytes.
    pub fn sniff(path: &Path) -> Result<Option<Self>, StoreError> {
        let mut head = [0u8; 262];
        let mut file = File::open(path)?;
        let n = file.read(&mut head)?;
        let head = &head[..n];
        Ok(if head.starts_with(&[0x1f, 0x8b]) {
            Some(ArchiveKind::TarGz)
        } else if head.starts_with(b"PK\x03\x04") {
            Some(ArchiveKind::Zip)
        } else if head.len() >= 262 && &head[257..262] == b"ustar" {
            Some(ArchiveKind::Tar)
        } else {
            None
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArchiveKind::Tar => "tar",
            ArchiveKind::TarGz => "tar.gz",
            ArchiveKind::Zip => "zip",
        }
    }
}

/// Unpack `archive` into `target_dir`. Entries that would land outside
/// `target_dir` are rejected by the underlying readers.
pub fn extract_archive(archive: &Path, kind: ArchiveKind, target_dir: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(target_dir)?;
    debug!(
        "extracting {} ({}) into {}",
        archive.display(),
        kind.as_str(),
        target_dir.display()
    );
    let file = BufReader::new(File::open(archive)?);
    match kind {
        ArchiveKind::Tar => unpack_tar(file, target_dir),
        ArchiveKind::TarGz => unpack_tar(GzDecoder::new(file), target_dir),
        ArchiveKind::Zip => {
            let mut zip = zip::ZipArchive::new(File::open(archive)?)
                .map_err(|e| StoreError::Archive(format!("{}: {e}", archive.display())))?;
            zip.extract(target_dir)
                .map_err(|e| StoreError::Archive(format!("{}: {e}", archive.display())))
        }
    }
}

fn unpack_tar(reader: impl Read, target_dir: &Path) -> Result<(), StoreError> {
    let mut ar = tar::Archive::new(reader);
    ar.set_preserve_permissions(true);
    ar.set_preserve_mtime(false);
    ar.set_unpack_xattrs(false);
    ar.unpack(target_dir)?;
    Ok(())
}

/// Archives that wrap everything in one top-level directory (`Foo-1.0/`)
/// are rooted at that directory.
pub fn content_root(extracted: &Path) -> Result<PathBuf, StoreError> {
    let mut entries = fs::read_dir(extracted)?
        .filter_map(Result::ok)
        .filter(|e| e.file_name() != "__MACOSX");
    if let (Some(only), None) = (entries.next(), entries.next()) {
        if only.file_type()?.is_dir() {
            return Ok(only.path());
        }
    }
    Ok(extracted.to_path_buf())
}
