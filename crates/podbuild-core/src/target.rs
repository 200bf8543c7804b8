//! Build targets derived from composed specs.
//!
//! Each spec in the tree becomes one [`ObjcLibrary`]. Resource bundles and
//! vendored binaries become leaf targets the library depends on. Targets are
//! immutable values: transforms build a new value through the `with_*`
//! methods instead of mutating in place.

use crate::deps::resolve_dependencies;
use crate::glob::{expand_braces, GlobExpr};
use crate::options::{BuildOptions, UserAttr};
use crate::starlark::{config_setting_name, identifier, Arg, Expr, ToStarlark};
use podbuild_schema::{
    bazel_label, ComposedSpec, ExternalName, Label, PerPlatform, Platform, PlatformValue,
    SpecEntry,
};
use std::collections::{BTreeMap, BTreeSet};

pub const PUBLIC_VISIBILITY: &str = "//visibility:public";
pub const RULES_APPLE_APPLE: &str = "@build_bazel_rules_apple//apple:apple.bzl";
pub const RULES_APPLE_RESOURCES: &str = "@build_bazel_rules_apple//apple:resources.bzl";
/// Directory, relative to the pod, that staged public headers live under.
pub const PUBLIC_HEADERS_DIR: &str = "pod_support/Headers/Public";
pub const SUPPORT_DIR: &str = "pod_support";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Library(ObjcLibrary),
    BundleLibrary(BundleLibrary),
    FrameworkImport(FrameworkImport),
    ArchiveImport(ArchiveImport),
    ConfigSetting(ConfigSetting),
    Alias(Alias),
}

impl Target {
    pub fn name(&self) -> &Label {
        match self {
            Target::Library(t) => &t.name,
            Target::BundleLibrary(t) => &t.name,
            Target::FrameworkImport(t) => &t.name,
            Target::ArchiveImport(t) => &t.name,
            Target::ConfigSetting(t) => &t.name,
            Target::Alias(t) => &t.name,
        }
    }

    pub fn rule_kind(&self) -> &'static str {
        match self {
            Target::Library(_) => "objc_library",
            Target::BundleLibrary(_) => "apple_resource_bundle",
            Target::FrameworkImport(_) => "apple_static_framework_import",
            Target::ArchiveImport(_) => "objc_import",
            Target::ConfigSetting(_) => "config_setting",
            Target::Alias(_) => "alias",
        }
    }

    /// The `.bzl` file the rule must be loaded from, for rules that are not
    /// built into Bazel.
    pub fn load_from(&self) -> Option<&'static str> {
        match self {
            Target::BundleLibrary(_) => Some(RULES_APPLE_RESOURCES),
            Target::FrameworkImport(_) => Some(RULES_APPLE_APPLE),
            _ => None,
        }
    }

    pub fn as_library(&self) -> Option<&ObjcLibrary> {
        match self {
            Target::Library(lib) => Some(lib),
            _ => None,
        }
    }

    pub fn render(&self) -> Expr {
        match self {
            Target::Library(t) => t.render(),
            Target::BundleLibrary(t) => rule(
                self.rule_kind(),
                &t.name,
                vec![Arg::named("resources", t.resources.to_starlark())],
            ),
            Target::FrameworkImport(t) => rule(
                self.rule_kind(),
                &t.name,
                vec![Arg::named("framework_imports", t.framework_imports.to_starlark())],
            ),
            Target::ArchiveImport(t) => rule(
                self.rule_kind(),
                &t.name,
                vec![Arg::named("archives", t.archives.to_starlark())],
            ),
            Target::ConfigSetting(t) => rule(
                self.rule_kind(),
                &t.name,
                vec![Arg::named("values", Expr::str_dict(&t.values))],
            ),
            Target::Alias(t) => rule(
                self.rule_kind(),
                &t.name,
                vec![Arg::named("actual", Expr::str(t.actual.clone()))],
            ),
        }
    }
}

/// `<kind>(name = ..., <attrs>, visibility = public)`
fn rule(kind: &str, name: &Label, attrs: Vec<Arg>) -> Expr {
    let mut args = Vec::with_capacity(attrs.len() + 2);
    args.push(Arg::named("name", Expr::str(name.as_str())));
    args.extend(attrs);
    args.push(Arg::named("visibility", Expr::str_list([PUBLIC_VISIBILITY])));
    Expr::call(kind, args)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleLibrary {
    pub name: Label,
    pub resources: GlobExpr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkImport {
    pub name: Label,
    pub framework_imports: GlobExpr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveImport {
    pub name: Label,
    pub archives: GlobExpr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSetting {
    pub name: Label,
    pub values: BTreeMap<String, String>,
}

impl ConfigSetting {
    /// The setting that selects `platform`; iOS is the default branch and has
    /// none.
    pub fn for_platform(platform: Platform) -> Option<Self> {
        let name = config_setting_name(platform)?;
        let platform_type = match platform {
            Platform::Ios => "ios",
            Platform::Osx => "macos",
            Platform::Watchos => "watchos",
            Platform::Tvos => "tvos",
        };
        Some(Self {
            name: bazel_label(&name),
            values: [("apple_platform_type".to_owned(), platform_type.to_owned())].into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub name: Label,
    pub actual: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjcLibrary {
    pub name: Label,
    pub external_name: ExternalName,
    /// False when the spec sets `requires_arc: false`; sources then go to
    /// `non_arc_srcs`.
    pub arc: bool,
    pub sources: GlobExpr,
    pub headers: GlobExpr,
    /// Headers published under [`PUBLIC_HEADERS_DIR`] when staging.
    pub public_headers: GlobExpr,
    /// Extra source exclusions added by transforms.
    pub excluded: PlatformValue<BTreeSet<String>>,
    /// Path of the precompiled header, empty for none.
    pub pch: PlatformValue<String>,
    /// Generated prefix header text to write at `pch`.
    pub prefix_header: PlatformValue<String>,
    pub includes: Vec<String>,
    pub sdk_frameworks: PlatformValue<Vec<String>>,
    pub weak_sdk_frameworks: PlatformValue<Vec<String>>,
    pub sdk_dylibs: PlatformValue<Vec<String>>,
    pub deps: PlatformValue<Vec<String>>,
    pub copts: PlatformValue<Vec<String>>,
    pub bundles: Vec<String>,
    /// Loose `resources` shipped in `data` next to the bundles.
    pub resources: GlobExpr,
    pub enable_modules: bool,
    /// Header directory name when headers are staged.
    pub staged_headers: Option<String>,
}

impl ObjcLibrary {
    pub fn from_spec(entry: &SpecEntry<'_>, options: &BuildOptions) -> Self {
        let spec = &entry.spec;
        let name = spec.label(&entry.path);
        let exclude = spec.exclude_files();

        let sources = GlobExpr::sources(spec.source_files(), exclude.clone());
        let headers = GlobExpr::headers(spec.source_files(), exclude.clone());
        let public_patterns = spec.public_header_files();
        let public_headers = if public_patterns.is_empty() {
            headers.clone()
        } else {
            GlobExpr::headers(public_patterns, exclude)
        };

        let staged_headers = (options.stage_headers && headers.has_includes())
            .then(|| spec.header_name().to_owned());
        let includes = staged_headers.as_ref().map_or_else(Vec::new, |header_name| {
            vec![
                PUBLIC_HEADERS_DIR.to_owned(),
                format!("{PUBLIC_HEADERS_DIR}/{header_name}"),
            ]
        });

        let prefix_header = spec.prefix_header_contents();
        let pch = pch_path(&name, spec.prefix_header_file(), &prefix_header);

        let own_ref = name.local_ref();
        let mut leaf_deps: Vec<String> = Vec::new();
        if !spec.vendored_frameworks().is_empty() {
            leaf_deps.push(vendored_frameworks_label(&name).local_ref());
        }
        if !spec.vendored_libraries().is_empty() {
            leaf_deps.push(vendored_libraries_label(&name).local_ref());
        }
        let deps = resolve_dependencies(spec.dependencies(), spec.pod_name())
            .map(|labels| labels.into_iter().filter(|l| *l != own_ref).collect::<Vec<_>>())
            .concat(PlatformValue::Uniform(leaf_deps))
            .collapse();

        let bundles = spec
            .resource_bundles()
            .keys()
            .map(|key| bundle_label(&name, key).local_ref())
            .collect();
        let resources = uniform_glob(spec.resources().iter().cloned());

        Self {
            external_name: spec.external_name(&entry.path),
            arc: spec.requires_arc(),
            sources,
            headers,
            public_headers,
            excluded: PlatformValue::empty(),
            pch,
            prefix_header,
            includes,
            sdk_frameworks: spec.frameworks(),
            weak_sdk_frameworks: spec.weak_frameworks(),
            sdk_dylibs: spec
                .libraries()
                .map(|libs| libs.into_iter().map(|l| dylib_name(&l)).collect()),
            deps,
            copts: spec.compiler_flags(&options.path),
            bundles,
            resources,
            enable_modules: options.enable_modules,
            staged_headers,
            name,
        }
    }

    /// Union more patterns into the source exclusions.
    #[must_use]
    pub fn with_excluded(self, extra: PlatformValue<BTreeSet<String>>) -> Self {
        Self {
            excluded: self.excluded.concat(extra).collapse(),
            ..self
        }
    }

    /// Append dependency labels not already present.
    #[must_use]
    pub fn with_deps(self, extra: &[String]) -> Self {
        let deps = self.deps.map(|mut labels| {
            for label in extra {
                if !labels.contains(label) {
                    labels.push(label.clone());
                }
            }
            labels
        });
        Self { deps, ..self }
    }

    /// Apply global copts, then every user option addressed to this
    /// library, in the order given.
    #[must_use]
    pub fn apply_overrides(self, options: &BuildOptions) -> Self {
        let mut lib = Self {
            copts: self
                .copts
                .concat(PlatformValue::Uniform(options.global_copts.clone())),
            ..self
        };
        let name = lib.name.clone();
        for opt in options.user_options.iter().filter(|o| o.applies_to(&name)) {
            let extra = PlatformValue::Uniform(opt.values.clone());
            lib = match opt.attr {
                UserAttr::Copts => Self {
                    copts: lib.copts.concat(extra),
                    ..lib
                },
                UserAttr::SdkFrameworks => Self {
                    sdk_frameworks: lib.sdk_frameworks.concat(extra),
                    ..lib
                },
                UserAttr::WeakSdkFrameworks => Self {
                    weak_sdk_frameworks: lib.weak_sdk_frameworks.concat(extra),
                    ..lib
                },
                UserAttr::SdkDylibs => Self {
                    sdk_dylibs: lib.sdk_dylibs.concat(extra),
                    ..lib
                },
            };
        }
        lib
    }

    /// Local (same-file) dependency labels across every platform.
    pub fn local_deps(&self) -> Vec<String> {
        self.deps
            .flatten_unique()
            .into_iter()
            .filter(|d| d.starts_with(':'))
            .collect()
    }

    fn srcs_expr(&self) -> Option<Expr> {
        if !self.sources.has_includes() {
            return None;
        }
        let glob = self.sources.clone().exclude_more(self.excluded.clone());
        Some(glob.to_starlark())
    }

    fn direct_hdrs_ident(&self) -> String {
        identifier(&format!("{}_direct_hdrs", self.name))
    }

    fn public_hdrs_ident(&self) -> String {
        identifier(&format!("{}_public_hdrs", self.name))
    }

    fn hdrs_ident(&self) -> String {
        identifier(&format!("{}_hdrs", self.name))
    }

    /// Bundle labels, then the loose resource glob, joined with `+`.
    fn data_expr(&self) -> Option<Expr> {
        let bundles = (!self.bundles.is_empty()).then(|| self.bundles.to_starlark());
        let resources = self
            .resources
            .has_includes()
            .then(|| self.resources.to_starlark());
        match (bundles, resources) {
            (Some(b), Some(r)) => Some(Expr::Concat(vec![b, r])),
            (b, r) => b.or(r),
        }
    }

    /// Assignments that build the header union used by `hdrs` when headers
    /// are staged.
    fn header_assignments(&self) -> Vec<Expr> {
        let Some(header_name) = &self.staged_headers else {
            return Vec::new();
        };
        let staged = GlobExpr::new(
            PlatformValue::Uniform([format!("{PUBLIC_HEADERS_DIR}/{header_name}/**/*.h")].into()),
            PlatformValue::empty(),
        );
        vec![
            Expr::assign(self.direct_hdrs_ident(), self.headers.to_starlark()),
            Expr::assign(self.public_hdrs_ident(), staged.to_starlark()),
            Expr::assign(
                self.hdrs_ident(),
                Expr::Concat(vec![
                    Expr::ident(self.direct_hdrs_ident()),
                    Expr::ident(self.public_hdrs_ident()),
                ]),
            ),
        ]
    }

    /// The header assignments (if any) followed by the `objc_library` call.
    pub fn render(&self) -> Expr {
        let mut attrs = Vec::new();
        if let Some(srcs) = self.srcs_expr() {
            attrs.push(Arg::named(if self.arc { "srcs" } else { "non_arc_srcs" }, srcs));
        }
        if self.staged_headers.is_some() {
            attrs.push(Arg::named("hdrs", Expr::ident(self.hdrs_ident())));
        } else if self.headers.has_includes() {
            attrs.push(Arg::named("hdrs", self.headers.to_starlark()));
        }
        if !self.pch.is_empty() {
            attrs.push(Arg::named("pch", self.pch.to_starlark()));
        }
        if !self.includes.is_empty() {
            attrs.push(Arg::named("includes", self.includes.to_starlark()));
        }
        push_list(&mut attrs, "sdk_frameworks", &self.sdk_frameworks);
        push_list(&mut attrs, "weak_sdk_frameworks", &self.weak_sdk_frameworks);
        push_list(&mut attrs, "sdk_dylibs", &self.sdk_dylibs);
        push_list(&mut attrs, "deps", &self.deps);
        push_list(&mut attrs, "copts", &self.copts);
        if let Some(data) = self.data_expr() {
            attrs.push(Arg::named("data", data));
        }
        if self.enable_modules {
            attrs.push(Arg::named("enable_modules", Expr::Bool(true)));
        }

        let mut lines = self.header_assignments();
        lines.push(rule("objc_library", &self.name, attrs));
        Expr::Lines(lines)
    }
}

fn push_list(attrs: &mut Vec<Arg>, name: &str, value: &PlatformValue<Vec<String>>) {
    if !value.is_empty() {
        attrs.push(Arg::named(name, value.to_starlark()));
    }
}

/// Leaf targets owned by a spec: resource bundles, vendored frameworks and
/// vendored static libraries.
pub fn leaf_targets(entry: &SpecEntry<'_>) -> Vec<Target> {
    let spec: &ComposedSpec<'_> = &entry.spec;
    let name = spec.label(&entry.path);
    let mut out = Vec::new();

    for (key, patterns) in spec.resource_bundles() {
        out.push(Target::BundleLibrary(BundleLibrary {
            name: bundle_label(&name, key),
            resources: uniform_glob(patterns.iter().cloned()),
        }));
    }
    let frameworks = spec.vendored_frameworks();
    if !frameworks.is_empty() {
        out.push(Target::FrameworkImport(FrameworkImport {
            name: vendored_frameworks_label(&name),
            framework_imports: uniform_glob(
                frameworks
                    .iter()
                    .map(|f| format!("{}/**", f.trim_end_matches('/'))),
            ),
        }));
    }
    let libraries = spec.vendored_libraries();
    if !libraries.is_empty() {
        out.push(Target::ArchiveImport(ArchiveImport {
            name: vendored_libraries_label(&name),
            archives: uniform_glob(libraries.iter().cloned()),
        }));
    }
    out
}

fn uniform_glob(patterns: impl Iterator<Item = String>) -> GlobExpr {
    GlobExpr::new(
        PlatformValue::Uniform(patterns.flat_map(|p| expand_braces(&p)).collect()),
        PlatformValue::empty(),
    )
}

pub fn bundle_label(library: &Label, key: &str) -> Label {
    library.suffixed(&format!("Bundle_{key}"))
}

pub fn vendored_frameworks_label(library: &Label) -> Label {
    library.suffixed("VendoredFrameworks")
}

pub fn vendored_libraries_label(library: &Label) -> Label {
    library.suffixed("VendoredLibraries")
}

/// `z` -> `libz`; names already carrying the prefix are kept.
fn dylib_name(name: &str) -> String {
    if name.starts_with("lib") {
        name.to_owned()
    } else {
        format!("lib{name}")
    }
}

/// Where the precompiled header for `library` lives. An explicit prefix
/// header file wins; generated contents get one file per distinct platform
/// value under [`SUPPORT_DIR`].
fn pch_path(
    library: &Label,
    explicit: Option<&str>,
    contents: &PlatformValue<String>,
) -> PlatformValue<String> {
    if let Some(file) = explicit {
        return PlatformValue::Uniform(file.to_owned());
    }
    match contents {
        PlatformValue::Uniform(text) if text.is_empty() => PlatformValue::empty(),
        PlatformValue::Uniform(_) => {
            PlatformValue::Uniform(format!("{SUPPORT_DIR}/{library}-prefix.pch"))
        }
        PlatformValue::PerPlatform(pp) => {
            let slot = |platform: Platform| {
                if pp.get(platform).is_empty() {
                    String::new()
                } else {
                    format!("{SUPPORT_DIR}/{library}-{platform}-prefix.pch")
                }
            };
            PlatformValue::PerPlatform(PerPlatform {
                ios: slot(Platform::Ios),
                osx: slot(Platform::Osx),
                watchos: slot(Platform::Watchos),
                tvos: slot(Platform::Tvos),
            })
        }
    }
}

/// Whether any rendered target needs the platform config settings.
pub fn uses_select(targets: &[Target]) -> bool {
    targets.iter().any(|t| t.render().contains_call("select"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::starlark::compile;
    use podbuild_schema::parse_podspec_str;

    fn spec_of(json: &str) -> podbuild_schema::PodSpec {
        parse_podspec_str(json).unwrap()
    }

    fn library(json: &str, index: usize, options: &BuildOptions) -> ObjcLibrary {
        let spec = spec_of(json);
        let entries = ComposedSpec::all(&spec);
        ObjcLibrary::from_spec(&entries[index], options)
    }

    #[test]
    fn empty_spec_renders_name_and_visibility_only() {
        let lib = library(r#"{"name": "Empty"}"#, 0, &BuildOptions::default());
        assert_eq!(
            compile(&lib.render()),
            "objc_library(\n    name = \"Empty\",\n    visibility = [\"//visibility:public\"],\n)\n"
        );
    }

    #[test]
    fn fields_render_in_fixed_order() {
        let lib = library(
            r##"{
                "name": "Foo",
                "source_files": "Classes/*.{h,m}",
                "frameworks": "UIKit",
                "weak_frameworks": "UserNotifications",
                "libraries": ["z", "libc++"],
                "dependencies": {"Bar": []},
                "compiler_flags": "-DFOO",
                "prefix_header_contents": "#import <UIKit/UIKit.h>",
                "resource_bundles": {"Assets": ["Assets/*.png"]}
            }"##,
            0,
            &BuildOptions {
                enable_modules: true,
                ..BuildOptions::default()
            },
        );
        let text = compile(&lib.render());
        let order = [
            "name =",
            "srcs =",
            "hdrs =",
            "pch =",
            "sdk_frameworks =",
            "weak_sdk_frameworks =",
            "sdk_dylibs =",
            "deps =",
            "copts =",
            "data =",
            "enable_modules = True",
            "visibility =",
        ];
        let positions: Vec<usize> = order
            .iter()
            .map(|needle| text.find(needle).unwrap_or_else(|| panic!("missing {needle}")))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{text}");
        assert!(text.contains("\"libz\""));
        assert!(text.contains("\"libc++\""));
        assert!(text.contains("pch = \"pod_support/Foo-prefix.pch\""));
        assert!(text.contains("data = [\":Foo_Bundle_Assets\"]"));
    }

    #[test]
    fn subspec_does_not_depend_on_itself() {
        let lib = library(
            r#"{"name": "Foo", "dependencies": ["Foo/Core", "Bar"],
                "subspecs": [{"name": "Core"}]}"#,
            1,
            &BuildOptions::default(),
        );
        assert_eq!(lib.deps, PlatformValue::Uniform(vec!["@Bar//:Bar".to_owned()]));
    }

    #[test]
    fn vendored_binaries_become_leaf_deps() {
        let spec = spec_of(
            r#"{"name": "Foo", "vendored_frameworks": "Foo.framework",
                "vendored_libraries": ["lib/libFoo.a"]}"#,
        );
        let entries = ComposedSpec::all(&spec);
        let lib = ObjcLibrary::from_spec(&entries[0], &BuildOptions::default());
        assert_eq!(
            lib.deps,
            PlatformValue::Uniform(vec![
                ":Foo_VendoredFrameworks".to_owned(),
                ":Foo_VendoredLibraries".to_owned()
            ])
        );

        let leaves = leaf_targets(&entries[0]);
        let names: Vec<&str> = leaves.iter().map(|t| t.name().as_str()).collect();
        assert_eq!(names, vec!["Foo_VendoredFrameworks", "Foo_VendoredLibraries"]);
        let text = compile(&leaves[0].render());
        assert!(text.contains("framework_imports = glob([\"Foo.framework/**\"])"));
        assert_eq!(leaves[0].load_from(), Some(RULES_APPLE_APPLE));
        assert!(compile(&leaves[1].render()).starts_with("objc_import(\n"));
    }

    #[test]
    fn non_arc_sources_use_their_own_attribute() {
        let lib = library(
            r#"{"name": "Foo", "source_files": "A/*.m", "requires_arc": false}"#,
            0,
            &BuildOptions::default(),
        );
        let text = compile(&lib.render());
        assert!(text.contains("non_arc_srcs = glob([\"A/*.m\"])"));
    }

    #[test]
    fn excluded_patterns_join_the_srcs_exclude() {
        let lib = library(
            r#"{"name": "Foo", "source_files": "A/**/*.m", "exclude_files": "A/Old.m"}"#,
            0,
            &BuildOptions::default(),
        )
        .with_excluded(PlatformValue::Uniform(["A/Core/*.m".to_owned()].into()));
        let text = compile(&lib.render());
        assert!(text.contains("exclude = [\n            \"A/Core/*.m\",\n            \"A/Old.m\",\n        ],"), "{text}");
    }

    #[test]
    fn staged_headers_use_the_header_union() {
        let lib = library(
            r#"{"name": "Foo", "module_name": "FooKit", "source_files": "A/*.{h,m}"}"#,
            0,
            &BuildOptions {
                stage_headers: true,
                ..BuildOptions::default()
            },
        );
        let text = compile(&lib.render());
        assert!(text.starts_with(
            "Foo_direct_hdrs = glob([\"A/*.h\"])\n\
             Foo_public_hdrs = glob([\"pod_support/Headers/Public/FooKit/**/*.h\"])\n\
             Foo_hdrs = Foo_direct_hdrs + Foo_public_hdrs\n"
        ));
        assert!(text.contains("hdrs = Foo_hdrs,"));
        assert!(text.contains("\"pod_support/Headers/Public/FooKit\""));
    }

    #[test]
    fn header_union_names_are_valid_identifiers() {
        let lib = library(
            r#"{"name": "Socket.IO", "source_files": "Source/*.{h,m}"}"#,
            0,
            &BuildOptions {
                stage_headers: true,
                ..BuildOptions::default()
            },
        );
        let text = compile(&lib.render());
        assert!(text.contains("Socket_IO_hdrs = Socket_IO_direct_hdrs + Socket_IO_public_hdrs\n"), "{text}");
        assert!(text.contains("hdrs = Socket_IO_hdrs,"));
        assert!(text.contains("name = \"Socket.IO\","));
    }

    #[test]
    fn loose_resources_ship_as_data() {
        let lib = library(
            r#"{"name": "Foo", "resources": ["Res/*.{png,xib}"]}"#,
            0,
            &BuildOptions::default(),
        );
        let text = compile(&lib.render());
        assert!(
            text.contains("data = glob([\n        \"Res/*.png\",\n        \"Res/*.xib\",\n    ]),"),
            "{text}"
        );

        let both = library(
            r#"{"name": "Foo", "resources": "Res/*.png",
                "resource_bundles": {"Assets": ["Assets/*"]}}"#,
            0,
            &BuildOptions::default(),
        );
        let text = compile(&both.render());
        assert!(
            text.contains("data = [\":Foo_Bundle_Assets\"] + glob([\"Res/*.png\"]),"),
            "{text}"
        );
    }

    #[test]
    fn overrides_append_global_then_user_values() {
        let options = BuildOptions {
            global_copts: vec!["-Wno-everything".to_owned()],
            user_options: vec![
                "Foo.copts += -DUSER".parse().unwrap(),
                "Foo.sdk_frameworks += Metal".parse().unwrap(),
                "Other.copts += -DOTHER".parse().unwrap(),
            ],
            ..BuildOptions::default()
        };
        let lib = library(
            r#"{"name": "Foo", "compiler_flags": "-DSPEC", "frameworks": "UIKit"}"#,
            0,
            &options,
        )
        .apply_overrides(&options);
        assert_eq!(
            lib.copts,
            PlatformValue::Uniform(vec![
                "-DSPEC".to_owned(),
                "-Wno-everything".to_owned(),
                "-DUSER".to_owned()
            ])
        );
        assert_eq!(
            lib.sdk_frameworks,
            PlatformValue::Uniform(vec!["UIKit".to_owned(), "Metal".to_owned()])
        );
    }

    #[test]
    fn per_platform_prefix_headers_get_per_platform_paths() {
        let lib = library(
            r##"{"name": "Foo", "ios": {"prefix_header_contents": "#import <UIKit/UIKit.h>"}}"##,
            0,
            &BuildOptions::default(),
        );
        assert_eq!(
            lib.pch.for_platform(Platform::Ios),
            "pod_support/Foo-ios-prefix.pch"
        );
        assert!(lib.pch.for_platform(Platform::Osx).is_empty());
        let text = compile(&lib.render());
        assert!(text.contains("\":osxCase\": None,"));
    }

    #[test]
    fn config_settings_cover_non_default_platforms() {
        assert!(ConfigSetting::for_platform(Platform::Ios).is_none());
        let osx = ConfigSetting::for_platform(Platform::Osx).unwrap();
        assert_eq!(osx.name, "osxCase");
        let text = compile(&Target::ConfigSetting(osx).render());
        assert!(text.contains("values = {\"apple_platform_type\": \"macos\"},"));
        assert!(text.contains("visibility = [\"//visibility:public\"],"));
    }

    #[test]
    fn select_detection() {
        let uniform = library(r#"{"name": "Foo", "frameworks": "UIKit"}"#, 0, &BuildOptions::default());
        let split = library(
            r#"{"name": "Foo", "osx": {"frameworks": "AppKit"}}"#,
            0,
            &BuildOptions::default(),
        );
        assert!(!uses_select(&[Target::Library(uniform)]));
        assert!(uses_select(&[Target::Library(split)]));
    }
}
