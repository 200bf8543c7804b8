//! Splitting podspec file patterns into compilable sources and headers.
//!
//! Podspecs list files with a single glob (`Classes/**/*.{h,m}`); Bazel wants
//! sources and headers in separate attributes. Patterns are classified by
//! extension, and trailing wildcards are rewritten into one pattern per
//! recognized extension.

use crate::starlark::{select, Arg, Expr, ToStarlark};
use crate::CoreError;
use podbuild_schema::{Platform, PlatformValue};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::trace;

pub const SOURCE_EXTENSIONS: [&str; 4] = ["m", "mm", "c", "cpp"];
pub const HEADER_EXTENSION: &str = "h";

/// Classification of the final path component of a pattern.
enum Tail<'a> {
    /// Ends in a literal extension such as `.m`.
    Extension(&'a str),
    /// Ends in a wildcard that may match any extension (`*`, `*.*`,
    /// `Foo*`); carries the part of the component to keep before `.<ext>`.
    Wildcard(&'a str),
    /// A bare directory name; CocoaPods includes everything below it.
    Directory,
}

fn classify(pattern: &str) -> Tail<'_> {
    let file = pattern.rsplit('/').next().unwrap_or(pattern);
    if file == "**" {
        return Tail::Wildcard("**/*");
    }
    match file.rsplit_once('.') {
        Some((stem, "*")) => Tail::Wildcard(stem),
        Some((_, ext)) if !ext.contains('*') => Tail::Extension(ext),
        Some(_) => Tail::Wildcard(file),
        None if file.ends_with('*') => Tail::Wildcard(file),
        None => Tail::Directory,
    }
}

/// Expand `{a,b}` alternation, left-most group first. Unbalanced braces are
/// left alone.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_owned()];
    };
    let Some(close) = pattern[open..].find('}').map(|i| open + i) else {
        return vec![pattern.to_owned()];
    };
    let (head, tail) = (&pattern[..open], &pattern[close + 1..]);
    pattern[open + 1..close]
        .split(',')
        .flat_map(|alt| expand_braces(&format!("{head}{alt}{tail}")))
        .collect()
}

fn rewrite(pattern: &str, extensions: &[&str]) -> Vec<String> {
    match classify(pattern) {
        Tail::Extension(ext) => {
            if extensions.contains(&ext) {
                vec![pattern.to_owned()]
            } else {
                Vec::new()
            }
        }
        Tail::Wildcard(keep) => {
            let dir = &pattern[..pattern.len() - pattern.rsplit('/').next().map_or(0, str::len)];
            extensions
                .iter()
                .map(|ext| format!("{dir}{keep}.{ext}"))
                .collect()
        }
        Tail::Directory => {
            let dir = pattern.trim_end_matches('/');
            extensions
                .iter()
                .map(|ext| format!("{dir}/**/*.{ext}"))
                .collect()
        }
    }
}

/// Patterns from `pattern` that can match compilable sources.
pub fn source_patterns(pattern: &str) -> Vec<String> {
    expand_braces(pattern)
        .iter()
        .flat_map(|p| rewrite(p, &SOURCE_EXTENSIONS))
        .collect()
}

/// Patterns from `pattern` that can match headers.
pub fn header_patterns(pattern: &str) -> Vec<String> {
    expand_braces(pattern)
        .iter()
        .flat_map(|p| rewrite(p, &[HEADER_EXTENSION]))
        .collect()
}

pub fn partition_sources<'a>(patterns: impl IntoIterator<Item = &'a String>) -> BTreeSet<String> {
    patterns.into_iter().flat_map(|p| source_patterns(p)).collect()
}

pub fn partition_headers<'a>(patterns: impl IntoIterator<Item = &'a String>) -> BTreeSet<String> {
    patterns.into_iter().flat_map(|p| header_patterns(p)).collect()
}

/// An include/exclude pattern pair, possibly varying per platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobExpr {
    pub include: PlatformValue<BTreeSet<String>>,
    pub exclude: PlatformValue<BTreeSet<String>>,
}

impl GlobExpr {
    pub fn new(
        include: PlatformValue<BTreeSet<String>>,
        exclude: PlatformValue<BTreeSet<String>>,
    ) -> Self {
        Self { include, exclude }
    }

    /// The compilable-source half of raw podspec patterns.
    pub fn sources(
        include: PlatformValue<Vec<String>>,
        exclude: PlatformValue<Vec<String>>,
    ) -> Self {
        Self {
            include: include.map(|p| partition_sources(&p)),
            exclude: exclude.map(|p| partition_sources(&p)),
        }
    }

    /// The header half of raw podspec patterns.
    pub fn headers(
        include: PlatformValue<Vec<String>>,
        exclude: PlatformValue<Vec<String>>,
    ) -> Self {
        Self {
            include: include.map(|p| partition_headers(&p)),
            exclude: exclude.map(|p| partition_headers(&p)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Whether any platform has something to match. A glob with only
    /// excludes matches nothing.
    pub fn has_includes(&self) -> bool {
        !self.include.is_empty()
    }

    #[must_use]
    pub fn exclude_more(self, extra: PlatformValue<BTreeSet<String>>) -> Self {
        Self {
            include: self.include,
            exclude: self.exclude.concat(extra).collapse(),
        }
    }

    fn glob_call(include: &BTreeSet<String>, exclude: &BTreeSet<String>) -> Expr {
        if include.is_empty() {
            return Expr::List(Vec::new());
        }
        let mut args = vec![Arg::positional(include.to_starlark())];
        if !exclude.is_empty() {
            args.push(Arg::named("exclude", exclude.to_starlark()));
        }
        Expr::call("glob", args)
    }

    /// Files on disk below `root` that this glob selects for `platform`,
    /// relative to `root`.
    pub fn sources_on_disk(
        &self,
        root: &Path,
        platform: Platform,
    ) -> Result<BTreeSet<PathBuf>, CoreError> {
        let included = expand_on_disk(root, self.include.for_platform(platform))?;
        let excluded = expand_on_disk(root, self.exclude.for_platform(platform))?;
        trace!(
            "{platform}: {} matched, {} excluded below {}",
            included.len(),
            excluded.len(),
            root.display()
        );
        Ok(included.difference(&excluded).cloned().collect())
    }
}

fn expand_on_disk(root: &Path, patterns: &BTreeSet<String>) -> Result<BTreeSet<PathBuf>, CoreError> {
    let mut out = BTreeSet::new();
    for pattern in patterns {
        let full = root.join(pattern);
        for entry in ::glob::glob(&full.to_string_lossy())? {
            let path = entry.map_err(std::io::Error::from)?;
            if path.is_file() {
                if let Ok(relative) = path.strip_prefix(root) {
                    out.insert(relative.to_path_buf());
                }
            }
        }
    }
    Ok(out)
}

impl ToStarlark for GlobExpr {
    fn to_starlark(&self) -> Expr {
        match (&self.include, &self.exclude) {
            (PlatformValue::Uniform(include), PlatformValue::Uniform(exclude)) => {
                Self::glob_call(include, exclude)
            }
            (include, exclude) => select(|platform| {
                Some(Self::glob_call(
                    include.for_platform(platform),
                    exclude.for_platform(platform),
                ))
            }),
        }
    }
}
