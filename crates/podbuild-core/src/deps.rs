//! Mapping podspec dependency names onto Bazel labels.

use podbuild_schema::{bazel_label, PlatformValue};

/// Resolve one dependency name as seen from the pod `root_name`.
///
/// - `Root/Sub` names a sibling subspec in the same BUILD file: `:Root_Sub`.
/// - `Other/Sub` names a subspec of another pod: `@Other//:Other_Sub`.
/// - `Other` names another pod's top-level target: `@Other//:Other`.
///
/// Version constraints are not interpreted and nothing checks that the
/// referenced target exists.
pub fn resolve_dependency(reference: &str, root_name: &str) -> String {
    let reference = reference.trim();
    match reference.split_once('/') {
        Some((pod, _)) if pod == root_name => bazel_label(reference).local_ref(),
        Some((pod, _)) => format!("@{}//:{}", bazel_label(pod), bazel_label(reference)),
        None => {
            let label = bazel_label(reference);
            format!("@{label}//:{label}")
        }
    }
}

/// Resolve every dependency, dropping repeats while keeping the first
/// occurrence per platform.
pub fn resolve_dependencies(
    deps: PlatformValue<Vec<String>>,
    root_name: &str,
) -> PlatformValue<Vec<String>> {
    deps.map(|names| {
        let mut out: Vec<String> = Vec::with_capacity(names.len());
        for name in &names {
            if name.trim().is_empty() {
                continue;
            }
            let label = resolve_dependency(name, root_name);
            if !out.contains(&label) {
                out.push(label);
            }
        }
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use podbuild_schema::{PerPlatform, Platform};

    #[test]
    fn own_subspec_is_local() {
        assert_eq!(resolve_dependency("Foo/Core", "Foo"), ":Foo_Core");
        assert_eq!(resolve_dependency("Foo/UI/Widgets", "Foo"), ":Foo_UI_Widgets");
    }

    #[test]
    fn foreign_subspec_is_external() {
        assert_eq!(resolve_dependency("Bar/UI", "Foo"), "@Bar//:Bar_UI");
    }

    #[test]
    fn foreign_pod_is_external_top_level() {
        assert_eq!(resolve_dependency("Baz", "Foo"), "@Baz//:Baz");
        assert_eq!(resolve_dependency("Baz-Kit", "Foo"), "@Baz_Kit//:Baz_Kit");
    }

    #[test]
    fn repository_names_are_sanitized_consistently() {
        assert_eq!(resolve_dependency("Baz-Kit/Core", "Foo"), "@Baz_Kit//:Baz_Kit_Core");
        assert_eq!(resolve_dependency("Foo-Kit/Core", "Foo-Kit"), ":Foo_Kit_Core");
    }

    #[test]
    fn duplicates_are_removed_keeping_first() {
        let deps = PlatformValue::Uniform(vec![
            "Foo/Core".to_owned(),
            "Bar".to_owned(),
            "Foo/Core".to_owned(),
            " ".to_owned(),
        ]);
        assert_eq!(
            resolve_dependencies(deps, "Foo"),
            PlatformValue::Uniform(vec![":Foo_Core".to_owned(), "@Bar//:Bar".to_owned()])
        );
    }

    #[test]
    fn per_platform_shape_is_kept() {
        let deps = PlatformValue::PerPlatform(PerPlatform {
            ios: vec!["Bar".to_owned()],
            osx: Vec::new(),
            watchos: Vec::new(),
            tvos: Vec::new(),
        });
        let resolved = resolve_dependencies(deps, "Foo");
        assert_eq!(resolved.for_platform(Platform::Ios), &vec!["@Bar//:Bar".to_owned()]);
        assert!(resolved.for_platform(Platform::Osx).is_empty());
    }
}
