//! Root/subspec attribute composition.
//!
//! A subspec inherits most attributes from the root podspec when it does not
//! declare them itself. [`ComposedSpec`] is a read-only view over a
//! `(root, current)` pair that applies that rule uniformly; it owns nothing.

use crate::manifest::PodSpec;
use crate::platform::PlatformValue;
use crate::types::{bazel_label, ExternalName, Label};
use crate::xcconfig;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy)]
pub struct ComposedSpec<'a> {
    root: Option<&'a PodSpec>,
    current: &'a PodSpec,
}

/// A subspec together with its path below the root (`Core/Extras`).
#[derive(Debug, Clone)]
pub struct SpecEntry<'a> {
    pub spec: ComposedSpec<'a>,
    pub path: String,
}

impl<'a> ComposedSpec<'a> {
    /// View of the top-level spec; it has no root to fall back to.
    pub fn top_level(spec: &'a PodSpec) -> Self {
        Self {
            root: None,
            current: spec,
        }
    }

    pub fn subspec(root: &'a PodSpec, current: &'a PodSpec) -> Self {
        Self {
            root: Some(root),
            current,
        }
    }

    /// The top-level spec paired with itself, then every descendant subspec
    /// paired with the root, depth first in declaration order.
    pub fn all(root: &'a PodSpec) -> Vec<SpecEntry<'a>> {
        let mut out = vec![SpecEntry {
            spec: Self::top_level(root),
            path: String::new(),
        }];
        collect_subspecs(root, root, "", &mut out);
        out
    }

    pub fn current(&self) -> &'a PodSpec {
        self.current
    }

    pub fn root(&self) -> Option<&'a PodSpec> {
        self.root
    }

    /// The root pod's name; the current spec's name at the top level.
    pub fn pod_name(&self) -> &'a str {
        self.root.map_or(&self.current.name, |r| &r.name)
    }

    // ---- policy helpers ---------------------------------------------------

    fn root_fallback<T: crate::platform::Attr>(
        &self,
        read: impl Fn(&PodSpec) -> PlatformValue<T>,
    ) -> PlatformValue<T> {
        let own = read(self.current);
        match self.root {
            Some(root) => own.fallback(read(root)),
            None => own,
        }
    }

    fn root_then_current(
        &self,
        read: impl Fn(&PodSpec) -> PlatformValue<Vec<String>>,
    ) -> PlatformValue<Vec<String>> {
        match self.root {
            Some(root) => read(root).concat(read(self.current)),
            None => read(self.current),
        }
    }

    // ---- independent fields ----------------------------------------------

    pub fn source_files(&self) -> PlatformValue<Vec<String>> {
        self.current.source_files()
    }

    pub fn exclude_files(&self) -> PlatformValue<Vec<String>> {
        self.current.exclude_files()
    }

    pub fn public_header_files(&self) -> PlatformValue<Vec<String>> {
        self.current.public_header_files()
    }

    pub fn resource_bundles(&self) -> &'a BTreeMap<String, Vec<String>> {
        &self.current.resource_bundles
    }

    /// Loose resource patterns copied next to the library, outside any bundle.
    pub fn resources(&self) -> &'a [String] {
        &self.current.resources
    }

    pub fn vendored_frameworks(&self) -> &'a [String] {
        &self.current.vendored_frameworks
    }

    pub fn vendored_libraries(&self) -> &'a [String] {
        &self.current.vendored_libraries
    }

    pub fn requires_arc(&self) -> bool {
        self.current.requires_arc()
    }

    // ---- root-fallback fields --------------------------------------------

    pub fn frameworks(&self) -> PlatformValue<Vec<String>> {
        self.root_fallback(PodSpec::frameworks)
    }

    pub fn weak_frameworks(&self) -> PlatformValue<Vec<String>> {
        self.root_fallback(PodSpec::weak_frameworks)
    }

    pub fn libraries(&self) -> PlatformValue<Vec<String>> {
        self.root_fallback(PodSpec::libraries)
    }

    pub fn dependencies(&self) -> PlatformValue<Vec<String>> {
        self.root_fallback(PodSpec::dependencies)
    }

    pub fn prefix_header_contents(&self) -> PlatformValue<String> {
        self.root_fallback(PodSpec::prefix_header_contents)
    }

    pub fn prefix_header_file(&self) -> Option<&'a str> {
        non_empty(self.current.prefix_header_file.as_deref())
            .or_else(|| self.root.and_then(|r| non_empty(r.prefix_header_file.as_deref())))
    }

    pub fn module_name(&self) -> Option<&'a str> {
        non_empty(self.current.module_name.as_deref())
            .or_else(|| self.root.and_then(|r| non_empty(r.module_name.as_deref())))
    }

    pub fn header_dir(&self) -> Option<&'a str> {
        non_empty(self.current.header_dir.as_deref())
            .or_else(|| self.root.and_then(|r| non_empty(r.header_dir.as_deref())))
    }

    /// Compiler flags in fixed precedence: pod_target_xcconfig,
    /// user_target_xcconfig, xcconfig, then explicit compiler_flags. Within
    /// each source the root's flags precede the subspec's.
    pub fn compiler_flags(&self, target_root: &str) -> PlatformValue<Vec<String>> {
        let translate = |settings: PlatformValue<BTreeMap<String, String>>| {
            settings.map(|s| xcconfig::to_flags(&s, target_root))
        };
        let pod_target = self.root_then_current(|s| translate(s.pod_target_xcconfig()));
        let user_target = self.root_then_current(|s| translate(s.user_target_xcconfig()));
        let plain = self.root_then_current(|s| translate(s.xcconfig()));
        let explicit = self.root_then_current(PodSpec::compiler_flags);

        pod_target
            .concat(user_target)
            .concat(plain)
            .concat(explicit)
            .collapse()
    }

    // ---- naming -----------------------------------------------------------

    /// Rule name: `<root>_<subspec path>` for subspecs, the pod name at the
    /// top level.
    pub fn label(&self, path: &str) -> Label {
        match self.root {
            Some(root) => bazel_label(&format!("{}_{path}", root.name)),
            None => bazel_label(&self.current.name),
        }
    }

    /// Unsanitized `Root/Sub` name.
    pub fn external_name(&self, path: &str) -> ExternalName {
        match self.root {
            Some(root) => ExternalName::new(format!("{}/{path}", root.name)),
            None => ExternalName::new(self.current.name.clone()),
        }
    }

    /// Directory name headers are published under: module name, else
    /// header_dir, else the pod name.
    pub fn header_name(&self) -> &'a str {
        self.module_name()
            .or_else(|| self.header_dir())
            .unwrap_or_else(|| self.pod_name())
    }
}

fn collect_subspecs<'a>(
    root: &'a PodSpec,
    parent: &'a PodSpec,
    prefix: &str,
    out: &mut Vec<SpecEntry<'a>>,
) {
    for sub in &parent.subspecs {
        let path = if prefix.is_empty() {
            sub.name.clone()
        } else {
            format!("{prefix}/{}", sub.name)
        };
        out.push(SpecEntry {
            spec: ComposedSpec::subspec(root, sub),
            path: path.clone(),
        });
        collect_subspecs(root, sub, &path, out);
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::parse_podspec_str;
    use crate::platform::Platform;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    fn fixture() -> PodSpec {
        parse_podspec_str(
            r#"{
                "name": "Foo",
                "frameworks": ["UIKit"],
                "libraries": "z",
                "dependencies": ["Bar"],
                "module_name": "FooKit",
                "subspecs": [
                    {"name": "Core", "frameworks": ["CoreGraphics"]},
                    {"name": "UI", "header_dir": "FooUI",
                     "subspecs": [{"name": "Widgets"}]}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn all_walks_depth_first() {
        let root = fixture();
        let paths: Vec<String> = ComposedSpec::all(&root)
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(paths, vec!["", "Core", "UI", "UI/Widgets"]);
    }

    #[test]
    fn subspec_value_wins_when_non_empty() {
        let root = fixture();
        let core = ComposedSpec::subspec(&root, &root.subspecs[0]);
        assert_eq!(
            core.frameworks(),
            PlatformValue::Uniform(strings(&["CoreGraphics"]))
        );
    }

    #[test]
    fn empty_subspec_value_falls_back_to_root() {
        let root = fixture();
        let ui = ComposedSpec::subspec(&root, &root.subspecs[1]);
        assert_eq!(ui.frameworks(), PlatformValue::Uniform(strings(&["UIKit"])));
        assert_eq!(ui.libraries(), PlatformValue::Uniform(strings(&["z"])));
        assert_eq!(ui.dependencies(), PlatformValue::Uniform(strings(&["Bar"])));
    }

    #[test]
    fn independent_fields_do_not_fall_back() {
        let root = parse_podspec_str(
            r#"{"name": "Foo", "source_files": "A/*.m", "subspecs": [{"name": "Core"}]}"#,
        )
        .unwrap();
        let core = ComposedSpec::subspec(&root, &root.subspecs[0]);
        assert!(core.source_files().is_empty());
    }

    #[test]
    fn labels_use_root_prefix() {
        let root = fixture();
        let entries = ComposedSpec::all(&root);
        let labels: Vec<String> = entries
            .iter()
            .map(|e| e.spec.label(&e.path).into_inner())
            .collect();
        assert_eq!(labels, vec!["Foo", "Foo_Core", "Foo_UI", "Foo_UI_Widgets"]);
        assert_eq!(
            entries[3].spec.external_name(&entries[3].path).as_str(),
            "Foo/UI/Widgets"
        );
    }

    #[test]
    fn top_level_label_is_sanitized() {
        let root = parse_podspec_str(r#"{"name": "Foo-Bar+"}"#).unwrap();
        assert_eq!(ComposedSpec::top_level(&root).label(""), "Foo_Bar_");
    }

    #[test]
    fn header_name_precedence() {
        let root = fixture();
        let top = ComposedSpec::top_level(&root);
        assert_eq!(top.header_name(), "FooKit");

        let plain = parse_podspec_str(
            r#"{"name": "Foo", "subspecs": [{"name": "UI", "header_dir": "FooUI"}, {"name": "Core"}]}"#,
        )
        .unwrap();
        assert_eq!(
            ComposedSpec::subspec(&plain, &plain.subspecs[0]).header_name(),
            "FooUI"
        );
        assert_eq!(
            ComposedSpec::subspec(&plain, &plain.subspecs[1]).header_name(),
            "Foo"
        );
    }

    #[test]
    fn compiler_flags_follow_fixed_precedence() {
        let root = parse_podspec_str(
            r#"{
                "name": "Foo",
                "compiler_flags": "-DROOT_FLAG",
                "pod_target_xcconfig": {"OTHER_CFLAGS": "-root-pod"},
                "user_target_xcconfig": {"OTHER_CFLAGS": "-root-user"},
                "xcconfig": {"OTHER_CFLAGS": "-root-plain"},
                "subspecs": [{
                    "name": "Core",
                    "compiler_flags": "-DSUB_FLAG",
                    "pod_target_xcconfig": {"OTHER_CFLAGS": "-sub-pod"},
                    "user_target_xcconfig": {"OTHER_CFLAGS": "-sub-user"},
                    "xcconfig": {"OTHER_CFLAGS": "-sub-plain"}
                }]
            }"#,
        )
        .unwrap();
        let core = ComposedSpec::subspec(&root, &root.subspecs[0]);
        assert_eq!(
            core.compiler_flags("Foo"),
            PlatformValue::Uniform(strings(&[
                "-root-pod",
                "-sub-pod",
                "-root-user",
                "-sub-user",
                "-root-plain",
                "-sub-plain",
                "-DROOT_FLAG",
                "-DSUB_FLAG",
            ]))
        );

        let top = ComposedSpec::top_level(&root);
        assert_eq!(
            top.compiler_flags("Foo"),
            PlatformValue::Uniform(strings(&[
                "-root-pod",
                "-root-user",
                "-root-plain",
                "-DROOT_FLAG"
            ]))
        );
    }

    #[test]
    fn platform_specific_flags_stay_per_platform() {
        let root = parse_podspec_str(
            r#"{"name": "Foo", "compiler_flags": "-DALL", "osx": {"compiler_flags": "-DMAC"}}"#,
        )
        .unwrap();
        let flags = ComposedSpec::top_level(&root).compiler_flags("Foo");
        assert!(flags.is_per_platform());
        assert_eq!(flags.for_platform(Platform::Osx), &strings(&["-DALL", "-DMAC"]));
        assert_eq!(flags.for_platform(Platform::Ios), &strings(&["-DALL"]));
    }

    #[test]
    fn prefix_header_falls_back_to_root() {
        let root = parse_podspec_str(
            r##"{"name": "Foo", "prefix_header_contents": "#import <UIKit/UIKit.h>",
                 "subspecs": [{"name": "Core"}]}"##,
        )
        .unwrap();
        let core = ComposedSpec::subspec(&root, &root.subspecs[0]);
        assert_eq!(
            core.prefix_header_contents(),
            PlatformValue::Uniform("#import <UIKit/UIKit.h>".to_owned())
        );
    }
}
