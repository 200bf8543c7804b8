//! Podspec to BUILD file generation.

use crate::options::BuildOptions;
use crate::starlark::{compile_file, Arg, Expr};
use crate::target::{leaf_targets, uses_select, Alias, ConfigSetting, ObjcLibrary, Target};
use crate::{fsync_dir, CoreError};
use podbuild_schema::{bazel_label, ComposedSpec, Platform, PodSpec};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const BUILD_FILE_NAME: &str = "BUILD.bazel";

/// The targets generated for one pod, in output order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFile {
    pub pod_name: String,
    pub pod_version: Option<String>,
    pub targets: Vec<Target>,
}

impl BuildFile {
    pub fn libraries(&self) -> impl Iterator<Item = &ObjcLibrary> {
        self.targets.iter().filter_map(Target::as_library)
    }

    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name() == name)
    }

    fn header_comment(&self) -> Expr {
        let what = match &self.pod_version {
            Some(version) => format!("{} {version}", self.pod_name),
            None => self.pod_name.clone(),
        };
        Expr::Comment(format!(
            "Generated by podbuild from the {what} podspec. Do not edit."
        ))
    }

    /// One `load` per `.bzl` file, symbols sorted.
    fn loads(&self) -> Vec<Expr> {
        let mut by_file: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for target in &self.targets {
            if let Some(file) = target.load_from() {
                by_file.entry(file).or_default().insert(target.rule_kind());
            }
        }
        by_file
            .into_iter()
            .map(|(file, symbols)| {
                let mut args = vec![Arg::positional(Expr::str(file))];
                args.extend(symbols.into_iter().map(|s| Arg::positional(Expr::str(s))));
                Expr::call("load", args)
            })
            .collect()
    }

    /// Top-level groups: header, loads, then one group per target.
    pub fn to_starlark(&self) -> Vec<Expr> {
        let mut groups = vec![self.header_comment(), Expr::Lines(self.loads())];
        groups.extend(self.targets.iter().map(Target::render));
        groups
    }

    /// The BUILD file text. Identical inputs give byte-identical output.
    pub fn render(&self) -> String {
        compile_file(&self.to_starlark())
    }
}

/// Generate the BUILD file for `spec` and all of its subspecs.
pub fn generate(spec: &PodSpec, options: &BuildOptions) -> Result<BuildFile, CoreError> {
    spec.validate()?;
    info!("generating targets for {}", spec.name);

    let entries = ComposedSpec::all(spec);
    let mut libraries: Vec<ObjcLibrary> = Vec::with_capacity(entries.len());
    let mut leaves: Vec<Vec<Target>> = Vec::with_capacity(entries.len());
    for entry in &entries {
        let lib = ObjcLibrary::from_spec(entry, options);
        debug!("{} -> {}", lib.external_name, lib.name);
        libraries.push(lib);
        leaves.push(leaf_targets(entry));
    }

    if let Some(top) = libraries.first_mut() {
        let implicit = implicit_subspec_deps(spec);
        if !implicit.is_empty() {
            debug!("{} pulls in subspecs {implicit:?}", top.name);
            *top = top.clone().with_deps(&implicit);
        }
    }

    let libraries = exclude_redundant_sources(libraries);
    warn_unmatched_user_options(&libraries, options);

    let mut targets: Vec<Target> = Vec::new();
    for (lib, leaf) in libraries.into_iter().zip(leaves) {
        targets.push(Target::Library(lib.apply_overrides(options)));
        targets.extend(leaf);
    }

    if uses_select(&targets) {
        let settings = Platform::ALL
            .into_iter()
            .filter_map(ConfigSetting::for_platform)
            .map(Target::ConfigSetting);
        targets.splice(0..0, settings);
    }

    info!("{} targets generated for {}", targets.len(), spec.name);
    Ok(BuildFile {
        pod_name: spec.name.clone(),
        pod_version: spec.version.clone(),
        targets,
    })
}

/// Depending on a pod pulls in its default subspecs, or every direct
/// subspec when none are declared.
fn implicit_subspec_deps(spec: &PodSpec) -> Vec<String> {
    let names: Vec<&str> = if spec.default_subspecs.is_empty() {
        spec.subspecs.iter().map(|s| s.name.as_str()).collect()
    } else {
        spec.default_subspecs.iter().map(String::as_str).collect()
    };
    names
        .into_iter()
        .map(|sub| bazel_label(&format!("{}_{sub}", spec.name)).local_ref())
        .collect()
}

/// A library that depends on another library in the same file stops
/// compiling that library's sources itself.
pub fn exclude_redundant_sources(libraries: Vec<ObjcLibrary>) -> Vec<ObjcLibrary> {
    let sources_by_ref: BTreeMap<String, _> = libraries
        .iter()
        .map(|lib| (lib.name.local_ref(), lib.sources.include.clone()))
        .collect();

    libraries
        .into_iter()
        .map(|lib| {
            let deps = lib.local_deps();
            deps.iter()
                .filter_map(|dep| sources_by_ref.get(dep))
                .filter(|include| !include.is_empty())
                .fold(lib, |acc, include| acc.with_excluded(include.clone()))
        })
        .collect()
}

fn warn_unmatched_user_options(libraries: &[ObjcLibrary], options: &BuildOptions) {
    for opt in &options.user_options {
        if !libraries.iter().any(|lib| opt.applies_to(&lib.name)) {
            warn!("user option '{opt}' matches no generated library");
        }
    }
}

/// A second BUILD file that re-exports every library of `build` from
/// `//<package>`, one alias per library.
pub fn reexport_aliases(build: &BuildFile, package: &str) -> BuildFile {
    let package = match package.trim_start_matches("./").trim_matches('/') {
        "." => "",
        other => other,
    };
    let targets = build
        .libraries()
        .map(|lib| {
            Target::Alias(Alias {
                name: lib.name.clone(),
                actual: format!("//{package}:{}", lib.name),
            })
        })
        .collect();
    BuildFile {
        pod_name: build.pod_name.clone(),
        pod_version: build.pod_version.clone(),
        targets,
    }
}

/// Write `BUILD.bazel` into `dir`. The file is replaced atomically; readers
/// never see partial output.
pub fn write_build_file(dir: &Path, build: &BuildFile) -> Result<PathBuf, CoreError> {
    std::fs::create_dir_all(dir)?;
    let dest = dir.join(BUILD_FILE_NAME);
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(build.render().as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(&dest).map_err(|e| CoreError::Io(e.error))?;
    fsync_dir(dir)?;
    info!("wrote {}", dest.display());
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use podbuild_schema::parse_podspec_str;

    fn build(json: &str) -> BuildFile {
        generate(&parse_podspec_str(json).unwrap(), &BuildOptions::default()).unwrap()
    }

    #[test]
    fn subspecs_follow_their_parent_library() {
        let file = build(
            r#"{"name": "Foo", "resource_bundles": {"R": ["R/*"]},
                "subspecs": [{"name": "Core"}, {"name": "UI"}]}"#,
        );
        let names: Vec<&str> = file.targets.iter().map(|t| t.name().as_str()).collect();
        assert_eq!(names, vec!["Foo", "Foo_Bundle_R", "Foo_Core", "Foo_UI"]);
    }

    #[test]
    fn top_level_depends_on_default_subspecs() {
        let all = build(r#"{"name": "Foo", "subspecs": [{"name": "Core"}, {"name": "UI"}]}"#);
        assert_eq!(
            all.libraries().next().unwrap().deps.flatten_unique(),
            vec![":Foo_Core", ":Foo_UI"]
        );

        let defaults = build(
            r#"{"name": "Foo", "default_subspecs": ["Core"],
                "subspecs": [{"name": "Core"}, {"name": "UI"}]}"#,
        );
        assert_eq!(
            defaults.libraries().next().unwrap().deps.flatten_unique(),
            vec![":Foo_Core"]
        );
    }

    #[test]
    fn dependents_exclude_local_dependency_sources() {
        let file = build(
            r#"{"name": "Foo", "source_files": "Classes/**/*.m",
                "subspecs": [{"name": "Core", "source_files": "Classes/Core/*.m"}]}"#,
        );
        let top = file.libraries().next().unwrap();
        assert_eq!(
            top.excluded,
            podbuild_schema::PlatformValue::Uniform(["Classes/Core/*.m".to_owned()].into())
        );
        let core = file.libraries().nth(1).unwrap();
        assert!(core.excluded.is_empty());
    }

    #[test]
    fn config_settings_only_when_select_is_used() {
        let plain = build(r#"{"name": "Foo", "frameworks": "UIKit"}"#);
        assert!(!plain.render().contains("config_setting("));

        let split = build(r#"{"name": "Foo", "osx": {"frameworks": "AppKit"}}"#);
        let names: Vec<&str> = split.targets.iter().map(|t| t.name().as_str()).collect();
        assert_eq!(names, vec!["osxCase", "watchosCase", "tvosCase", "Foo"]);
    }

    #[test]
    fn rules_apple_symbols_are_loaded_once() {
        let file = build(
            r#"{"name": "Foo", "vendored_frameworks": "A.framework",
                "resource_bundles": {"R": ["R/*"]},
                "subspecs": [{"name": "Core", "vendored_frameworks": "B.framework"}]}"#,
        );
        let text = file.render();
        assert_eq!(
            text.matches("load(\"@build_bazel_rules_apple//apple:apple.bzl\", \"apple_static_framework_import\")")
                .count(),
            1
        );
        assert!(text.contains(
            "load(\"@build_bazel_rules_apple//apple:resources.bzl\", \"apple_resource_bundle\")"
        ));
    }

    #[test]
    fn header_comment_names_the_pod() {
        let file = build(r#"{"name": "Foo", "version": "1.2.3"}"#);
        assert!(file
            .render()
            .starts_with("# Generated by podbuild from the Foo 1.2.3 podspec. Do not edit.\n\n"));
    }

    #[test]
    fn aliases_point_into_the_package() {
        let file = build(r#"{"name": "Foo", "subspecs": [{"name": "Core"}]}"#);
        let aliases = reexport_aliases(&file, "//Vendor/Foo/");
        let text = aliases.render();
        assert!(text.contains("alias(\n    name = \"Foo_Core\",\n    actual = \"//Vendor/Foo:Foo_Core\",\n"));
        assert_eq!(aliases.targets.len(), 2);

        let rooted = reexport_aliases(&file, ".").render();
        assert!(rooted.contains("actual = \"//:Foo_Core\""));
    }

    #[test]
    fn invalid_manifest_is_rejected() {
        let mut spec =
            parse_podspec_str(r#"{"name": "Foo", "subspecs": [{"name": "Core"}]}"#).unwrap();
        spec.subspecs.push(spec.subspecs[0].clone());
        assert!(matches!(
            generate(&spec, &BuildOptions::default()),
            Err(CoreError::Manifest(_))
        ));
    }

    #[test]
    fn build_file_is_written_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let file = build(r#"{"name": "Foo"}"#);
        let path = write_build_file(dir.path(), &file).unwrap();
        assert_eq!(path, dir.path().join(BUILD_FILE_NAME));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), file.render());

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1, "no temp files left behind");
    }
}
