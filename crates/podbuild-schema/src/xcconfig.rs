//! Translation of Xcode build settings into compiler flags.

use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Translate an xcconfig dictionary into `copts`.
///
/// Keys are visited in sorted order so the output is stable. `target_root`
/// is the pod's directory inside the workspace; `$(PODS_TARGET_SRCROOT)`
/// expands to it and `$(PODS_ROOT)`/`$(SRCROOT)` to its parent.
pub fn to_flags(settings: &BTreeMap<String, String>, target_root: &str) -> Vec<String> {
    let pods_root = Path::new(target_root)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| ".".to_owned());

    let mut flags = Vec::new();
    for (key, raw) in settings {
        let values: Vec<String> = split_setting(raw)
            .into_iter()
            .filter(|v| v != "$(inherited)")
            .map(|v| expand(&v, target_root, &pods_root))
            .collect();

        match key.as_str() {
            "GCC_PREPROCESSOR_DEFINITIONS" => {
                flags.extend(values.into_iter().map(|v| format!("-D{v}")));
            }
            "HEADER_SEARCH_PATHS" | "USER_HEADER_SEARCH_PATHS" => {
                flags.extend(values.into_iter().map(|v| format!("-I{v}")));
            }
            "OTHER_CFLAGS" | "OTHER_CPLUSPLUSFLAGS" => flags.extend(values),
            "CLANG_CXX_LANGUAGE_STANDARD" | "GCC_C_LANGUAGE_STANDARD" => {
                flags.extend(values.into_iter().map(|v| format!("-std={v}")));
            }
            "CLANG_CXX_LIBRARY" => {
                flags.extend(values.into_iter().map(|v| format!("-stdlib={v}")));
            }
            "GCC_WARN_INHIBIT_ALL_WARNINGS" => {
                if values.iter().any(|v| v.eq_ignore_ascii_case("YES")) {
                    flags.push("-w".to_owned());
                }
            }
            other => debug!("ignoring unsupported build setting {other}"),
        }
    }
    flags
}

/// Split a setting on whitespace, honoring double and single quotes.
fn split_setting(raw: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_token = false;

    for c in raw.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    out.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if in_token {
        out.push(current);
    }
    out
}

fn expand(value: &str, target_root: &str, pods_root: &str) -> String {
    value
        .replace("$(PODS_TARGET_SRCROOT)", target_root)
        .replace("${PODS_TARGET_SRCROOT}", target_root)
        .replace("$(PODS_ROOT)", pods_root)
        .replace("${PODS_ROOT}", pods_root)
        .replace("$(SRCROOT)", pods_root)
        .replace("${SRCROOT}", pods_root)
}
