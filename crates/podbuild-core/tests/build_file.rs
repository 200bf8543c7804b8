use podbuild_core::{generate, write_build_file, BuildOptions, Target};
use podbuild_schema::{bazel_label, parse_podspec_str, Platform, PlatformValue};

const SCENARIO: &str = r#"{
    "name": "Foo",
    "source_files": ["Classes/**/*.*"],
    "dependencies": ["Foo/Core"],
    "subspecs": [{"name": "Core", "source_files": ["Core/*.m"]}]
}"#;

fn render(json: &str, options: &BuildOptions) -> String {
    generate(&parse_podspec_str(json).unwrap(), options)
        .unwrap()
        .render()
}

#[test]
fn scenario_renders_two_libraries() {
    let text = render(SCENARIO, &BuildOptions::default());
    assert_eq!(
        text,
        r#"# Generated by podbuild from the Foo podspec. Do not edit.

objc_library(
    name = "Foo",
    srcs = glob(
        [
            "Classes/**/*.c",
            "Classes/**/*.cpp",
            "Classes/**/*.m",
            "Classes/**/*.mm",
        ],
        exclude = ["Core/*.m"],
    ),
    hdrs = glob(["Classes/**/*.h"]),
    deps = [":Foo_Core"],
    visibility = ["//visibility:public"],
)

objc_library(
    name = "Foo_Core",
    srcs = glob(["Core/*.m"]),
    visibility = ["//visibility:public"],
)
"#
    );
}

#[test]
fn scenario_dependency_points_at_subspec() {
    let build = generate(&parse_podspec_str(SCENARIO).unwrap(), &BuildOptions::default()).unwrap();
    let names: Vec<&str> = build.libraries().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["Foo", "Foo_Core"]);
    let foo = build.libraries().next().unwrap();
    assert!(foo.deps.flatten_unique().contains(&":Foo_Core".to_owned()));
}

#[test]
fn output_is_byte_identical_across_runs() {
    let json = r#"{
        "name": "Multi",
        "source_files": "Src/**/*.{h,m,mm}",
        "frameworks": ["UIKit", "Foundation"],
        "osx": {"frameworks": "AppKit", "compiler_flags": "-DMAC"},
        "pod_target_xcconfig": {"GCC_PREPROCESSOR_DEFINITIONS": "B=2 A=1", "OTHER_CFLAGS": "-fno-objc-arc"},
        "resource_bundles": {"Zeta": ["Z/*"], "Alpha": ["A/*"]},
        "subspecs": [{"name": "Net", "dependencies": {"AFNetworking": ["~> 4.0"]}}]
    }"#;
    let options = BuildOptions {
        stage_headers: true,
        enable_modules: true,
        ..BuildOptions::default()
    };
    let first = render(json, &options);
    let second = render(json, &options);
    assert_eq!(first, second);
    assert!(first.find(":Multi_Bundle_Alpha").unwrap() < first.find(":Multi_Bundle_Zeta").unwrap());
}

#[test]
fn empty_manifest_emits_name_and_visibility_only() {
    let text = render(r#"{"name": "Bare"}"#, &BuildOptions::default());
    assert!(text.ends_with(
        "objc_library(\n    name = \"Bare\",\n    visibility = [\"//visibility:public\"],\n)\n"
    ));
    assert!(!text.contains("[]"));
    assert!(!text.contains("{}"));
}

#[test]
fn copts_follow_xcconfig_precedence_then_overrides() {
    let json = r#"{
        "name": "Foo",
        "compiler_flags": "-DROOT_EXPLICIT",
        "xcconfig": {"OTHER_CFLAGS": "-root-plain"},
        "subspecs": [{
            "name": "Core",
            "pod_target_xcconfig": {"GCC_PREPROCESSOR_DEFINITIONS": "SUB_POD=1"},
            "user_target_xcconfig": {"OTHER_CFLAGS": "-sub-user"},
            "compiler_flags": "-DSUB_EXPLICIT"
        }]
    }"#;
    let options = BuildOptions {
        global_copts: vec!["-DGLOBAL".to_owned()],
        user_options: vec!["Foo/Core.copts += -DUSER".parse().unwrap()],
        ..BuildOptions::default()
    };
    let build = generate(&parse_podspec_str(json).unwrap(), &options).unwrap();
    let Some(Target::Library(core)) = build.target("Foo_Core") else {
        panic!("Foo_Core missing");
    };
    assert_eq!(
        core.copts,
        PlatformValue::Uniform(
            [
                "-DSUB_POD=1",
                "-sub-user",
                "-root-plain",
                "-DROOT_EXPLICIT",
                "-DSUB_EXPLICIT",
                "-DGLOBAL",
                "-DUSER",
            ]
            .map(str::to_owned)
            .to_vec()
        )
    );
}

#[test]
fn platform_specific_attributes_render_select_with_config_settings() {
    let text = render(
        r#"{"name": "Foo", "frameworks": "Foundation",
            "ios": {"frameworks": "UIKit"}, "osx": {"frameworks": "AppKit"}}"#,
        &BuildOptions::default(),
    );
    let osx_setting = text.find("name = \"osxCase\"").unwrap();
    let library = text.find("objc_library(").unwrap();
    assert!(osx_setting < library);
    assert!(text.contains(
        "    sdk_frameworks = select({\n        \"//conditions:default\": [\n            \"Foundation\",\n            \"UIKit\",\n        ],\n"
    ));
    assert!(text.contains("\":watchosCase\": [\"Foundation\"],"));
}

#[test]
fn platform_values_resolve_per_slot() {
    let build = generate(
        &parse_podspec_str(r#"{"name": "Foo", "tvos": {"libraries": "z"}}"#).unwrap(),
        &BuildOptions::default(),
    )
    .unwrap();
    let lib = build.libraries().next().unwrap();
    assert_eq!(lib.sdk_dylibs.for_platform(Platform::Tvos), &vec!["libz".to_owned()]);
    assert!(lib.sdk_dylibs.for_platform(Platform::Ios).is_empty());
}

#[test]
fn labels_are_sanitized_everywhere() {
    let text = render(
        r#"{"name": "Foo-Kit", "subspecs": [{"name": "C++"}]}"#,
        &BuildOptions::default(),
    );
    assert!(text.contains("name = \"Foo_Kit\""));
    assert!(text.contains("name = \"Foo_Kit_C__\""));
    assert!(text.contains("deps = [\":Foo_Kit_C__\"]"));
    assert_eq!(bazel_label("Foo_Kit_C__"), "Foo_Kit_C__");
}

#[test]
fn written_file_matches_render() {
    let dir = tempfile::tempdir().unwrap();
    let build = generate(&parse_podspec_str(SCENARIO).unwrap(), &BuildOptions::default()).unwrap();
    let path = write_build_file(&dir.path().join("Vendor/Foo"), &build).unwrap();
    assert_eq!(std::fs::read_to_string(path).unwrap(), build.render());
}
