//! Podspec parsing, platform-conditional attributes, and subspec composition
//! for podbuild.
//!
//! This crate defines the schema layer: JSON podspec parsing (`PodSpec`), the
//! attribute algebra over per-platform values (`PlatformValue`), root/subspec
//! inheritance (`ComposedSpec`), xcconfig-to-flag translation, and the
//! sanitized label newtypes used by the generator.

pub mod compose;
pub mod manifest;
pub mod platform;
pub mod types;
pub mod xcconfig;

pub use compose::{ComposedSpec, SpecEntry};
pub use manifest::{
    parse_podspec_file, parse_podspec_str, ManifestError, PodSpec, SourceLocation,
    SpecAttributes,
};
pub use platform::{Attr, CombineError, Monoid, PerPlatform, Platform, PlatformValue};
pub use types::{bazel_label, ExternalName, Label};
