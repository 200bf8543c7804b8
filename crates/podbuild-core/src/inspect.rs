//! Loading podspecs from disk.
//!
//! JSON podspecs are parsed directly. Ruby `.podspec` files are converted to
//! JSON by CocoaPods itself (`pod ipc spec <file>`).

use crate::CoreError;
use podbuild_schema::{parse_podspec_file, parse_podspec_str, PodSpec};
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Program invoked to evaluate Ruby podspecs.
pub const POD_PROGRAM: &str = "pod";

pub fn load_podspec(path: &Path) -> Result<PodSpec, CoreError> {
    let is_ruby = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("podspec"));
    if is_ruby {
        load_ruby_podspec(path, POD_PROGRAM)
    } else {
        Ok(parse_podspec_file(path)?)
    }
}

/// Evaluate a Ruby podspec with `<program> ipc spec` and parse its output.
pub fn load_ruby_podspec(path: &Path, program: &str) -> Result<PodSpec, CoreError> {
    debug!("evaluating {} with {program} ipc spec", path.display());
    let output = Command::new(program)
        .args(["ipc", "spec"])
        .arg(path)
        .output()
        .map_err(|e| CoreError::Inspector(format!("failed to run '{program}': {e}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CoreError::Inspector(format!(
            "'{program} ipc spec {}' failed ({}): {}",
            path.display(),
            output.status,
            stderr.trim()
        )));
    }
    let json = String::from_utf8(output.stdout)
        .map_err(|e| CoreError::Inspector(format!("podspec JSON is not UTF-8: {e}")))?;
    Ok(parse_podspec_str(&json)?)
}
