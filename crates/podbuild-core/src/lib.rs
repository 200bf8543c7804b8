//! BUILD file generation for CocoaPods podspecs.
//!
//! This crate turns a parsed [`PodSpec`](podbuild_schema::PodSpec) into Bazel
//! targets: it resolves dependencies to labels, splits file patterns into
//! sources and headers, builds the target graph (`objc_library` per spec plus
//! bundle and vendored-binary leaves), applies user overrides, and renders the
//! result through a small Starlark AST. It also stages header symlinks and
//! prefix headers that the generated file refers to.

pub mod deps;
pub mod generate;
pub mod glob;
pub mod inspect;
pub mod options;
pub mod scaffold;
pub mod starlark;
pub mod target;

pub use deps::{resolve_dependencies, resolve_dependency};
pub use generate::{
    exclude_redundant_sources, generate, reexport_aliases, write_build_file, BuildFile,
    BUILD_FILE_NAME,
};
pub use glob::GlobExpr;
pub use inspect::load_podspec;
pub use options::{load_config, BuildConfig, BuildOptions, OptionsError, UserAttr, UserOption};
pub use scaffold::{scaffold, ScaffoldReport};
pub use starlark::{compile, Arg, Expr, ToStarlark};
pub use target::{ObjcLibrary, Target};

use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest error: {0}")]
    Manifest(#[from] podbuild_schema::ManifestError),
    #[error("options error: {0}")]
    Options(#[from] OptionsError),
    #[error("invalid file pattern: {0}")]
    Pattern(#[from] ::glob::PatternError),
    #[error("podspec inspection failed: {0}")]
    Inspector(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fsync a directory so a rename into it survives a crash.
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = fs::File::open(dir)?;
    f.sync_all()
}
