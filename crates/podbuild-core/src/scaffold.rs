//! On-disk support files referenced by a generated BUILD file.
//!
//! Staged public headers are symlinked under
//! `pod_support/Headers/Public/<header_name>/` so `#import <Name/Header.h>`
//! resolves, and generated prefix headers are written where `pch` points.

use crate::generate::BuildFile;
use crate::target::{ObjcLibrary, PUBLIC_HEADERS_DIR};
use crate::CoreError;
use podbuild_schema::Platform;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// What [`scaffold`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScaffoldReport {
    pub linked_headers: usize,
    pub prefix_headers: Vec<PathBuf>,
}

/// Create header links and prefix headers for every library in `build`,
/// relative to the pod directory `pod_dir`. Safe to run repeatedly.
pub fn scaffold(pod_dir: &Path, build: &BuildFile) -> Result<ScaffoldReport, CoreError> {
    let mut report = ScaffoldReport::default();
    for lib in build.libraries() {
        report.linked_headers += stage_headers(pod_dir, lib)?;
        report.prefix_headers.extend(write_prefix_headers(pod_dir, lib)?);
    }
    Ok(report)
}

/// Link every public header of `lib` into its staging directory. Returns
/// the number of links.
pub fn stage_headers(pod_dir: &Path, lib: &ObjcLibrary) -> Result<usize, CoreError> {
    let Some(header_name) = &lib.staged_headers else {
        return Ok(0);
    };

    let mut headers: BTreeSet<PathBuf> = BTreeSet::new();
    for platform in Platform::ALL {
        headers.extend(lib.public_headers.sources_on_disk(pod_dir, platform)?);
    }

    let stage_dir = pod_dir.join(PUBLIC_HEADERS_DIR).join(header_name);
    fs::create_dir_all(&stage_dir)?;
    let up = relative_prefix(&Path::new(PUBLIC_HEADERS_DIR).join(header_name));

    let mut linked = 0;
    let mut seen: BTreeSet<&std::ffi::OsStr> = BTreeSet::new();
    for header in &headers {
        let Some(file_name) = header.file_name() else {
            continue;
        };
        if !seen.insert(file_name) {
            warn!(
                "{}: header {} shadows an earlier header with the same name",
                lib.name,
                header.display()
            );
            continue;
        }
        let link = stage_dir.join(file_name);
        replace_symlink(&up.join(header), &link)?;
        linked += 1;
    }
    debug!("{}: staged {linked} headers in {}", lib.name, stage_dir.display());
    Ok(linked)
}

/// Write generated prefix header contents to each distinct `pch` path.
pub fn write_prefix_headers(pod_dir: &Path, lib: &ObjcLibrary) -> Result<Vec<PathBuf>, CoreError> {
    let mut written = Vec::new();
    for platform in Platform::ALL {
        let contents = lib.prefix_header.for_platform(platform);
        let path = lib.pch.for_platform(platform);
        if contents.is_empty() || path.is_empty() {
            continue;
        }
        let dest = pod_dir.join(path);
        if written.contains(&dest) {
            continue;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut text = contents.clone();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        fs::write(&dest, text)?;
        debug!("{}: wrote {}", lib.name, dest.display());
        written.push(dest);
    }
    Ok(written)
}

/// `../` once per component of `dir`.
fn relative_prefix(dir: &Path) -> PathBuf {
    dir.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .map(|_| Component::ParentDir)
        .collect()
}

#[cfg(unix)]
fn replace_symlink(target: &Path, link: &Path) -> Result<(), CoreError> {
    if link.symlink_metadata().is_ok() {
        fs::remove_file(link)?;
    }
    std::os::unix::fs::symlink(target, link)?;
    Ok(())
}

#[cfg(not(unix))]
fn replace_symlink(target: &Path, link: &Path) -> Result<(), CoreError> {
    if link.symlink_metadata().is_ok() {
        fs::remove_file(link)?;
    }
    let source = link
        .parent()
        .map_or_else(|| target.to_path_buf(), |dir| dir.join(target));
    fs::copy(source, link)?;
    Ok(())
}
