use crate::platform::{Attr, Monoid, PerPlatform, PlatformValue};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest {path}: {source}")]
    ParseJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("manifest name must not be empty (at '{0}')")]
    EmptyName(String),
    #[error("duplicate subspec '{name}' under '{parent}'")]
    DuplicateSubspec { parent: String, name: String },
}

/// Where a pod's sources come from.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SourceLocation {
    #[serde(default)]
    pub http: Option<String>,
    #[serde(default)]
    pub git: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub commit: Option<String>,
    #[serde(default)]
    pub sha256: Option<String>,
}

/// Attributes a podspec may declare both at the top level and inside a
/// per-platform block (`"ios": { ... }`).
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SpecAttributes {
    #[serde(default, deserialize_with = "string_or_list")]
    pub source_files: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub exclude_files: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub public_header_files: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub frameworks: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub weak_frameworks: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub libraries: Vec<String>,
    #[serde(default, deserialize_with = "dependency_names")]
    pub dependencies: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub compiler_flags: Vec<String>,
    #[serde(default)]
    pub pod_target_xcconfig: BTreeMap<String, String>,
    #[serde(default)]
    pub user_target_xcconfig: BTreeMap<String, String>,
    #[serde(default)]
    pub xcconfig: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "joined_lines")]
    pub prefix_header_contents: String,
}

/// One parsed podspec (or subspec), as emitted by `pod ipc spec`.
///
/// Unknown keys (`license`, `authors`, `summary`, ...) are ignored.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PodSpec {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub source: Option<SourceLocation>,
    #[serde(flatten)]
    pub attributes: SpecAttributes,
    #[serde(default)]
    pub module_name: Option<String>,
    #[serde(default)]
    pub header_dir: Option<String>,
    #[serde(default, deserialize_with = "path_or_false")]
    pub prefix_header_file: Option<String>,
    #[serde(default)]
    pub requires_arc: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "bundle_map")]
    pub resource_bundles: BTreeMap<String, Vec<String>>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub resources: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub vendored_frameworks: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub vendored_libraries: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub default_subspecs: Vec<String>,
    #[serde(default)]
    pub platforms: BTreeMap<String, Option<String>>,
    #[serde(default)]
    pub ios: Option<SpecAttributes>,
    #[serde(default)]
    pub osx: Option<SpecAttributes>,
    #[serde(default)]
    pub watchos: Option<SpecAttributes>,
    #[serde(default)]
    pub tvos: Option<SpecAttributes>,
    #[serde(default)]
    pub subspecs: Vec<PodSpec>,
}

impl PodSpec {
    /// Check structural invariants: names are non-empty and unique among
    /// siblings, recursively.
    pub fn validate(&self) -> Result<(), ManifestError> {
        self.validate_at(&self.name)
    }

    fn validate_at(&self, path: &str) -> Result<(), ManifestError> {
        if self.name.trim().is_empty() {
            return Err(ManifestError::EmptyName(path.to_owned()));
        }
        let mut seen = BTreeSet::new();
        for sub in &self.subspecs {
            let sub_path = format!("{path}/{}", sub.name);
            if !seen.insert(sub.name.as_str()) {
                return Err(ManifestError::DuplicateSubspec {
                    parent: path.to_owned(),
                    name: sub.name.clone(),
                });
            }
            sub.validate_at(&sub_path)?;
        }
        Ok(())
    }

    /// Read an attribute from the top level and every platform block.
    ///
    /// The base value is broadcast and each platform block's value is
    /// appended to its slot. Without any platform-specific value the result
    /// stays uniform.
    pub fn attr<T: Monoid>(&self, get: impl Fn(&SpecAttributes) -> T) -> PlatformValue<T> {
        let base = PlatformValue::Uniform(get(&self.attributes));
        let overrides = self.platform_blocks().map(|block| block.map(&get).unwrap_or_default());
        if overrides.iter().all(|(_, v)| v.is_empty()) {
            return base;
        }
        base.concat(PlatformValue::PerPlatform(overrides))
    }

    /// Like [`attr`](Self::attr) for single-valued fields: a platform block
    /// replaces the base value for that platform.
    pub fn scalar_attr<T: Attr>(&self, get: impl Fn(&SpecAttributes) -> T) -> PlatformValue<T> {
        let base = PlatformValue::Uniform(get(&self.attributes));
        let overrides = self.platform_blocks().map(|block| block.map(&get).unwrap_or_default());
        if overrides.iter().all(|(_, v)| v.is_empty()) {
            return base;
        }
        PlatformValue::PerPlatform(overrides).fallback(base)
    }

    fn platform_blocks(&self) -> PerPlatform<Option<&SpecAttributes>> {
        PerPlatform {
            ios: self.ios.as_ref(),
            osx: self.osx.as_ref(),
            watchos: self.watchos.as_ref(),
            tvos: self.tvos.as_ref(),
        }
    }

    pub fn source_files(&self) -> PlatformValue<Vec<String>> {
        self.attr(|a| a.source_files.clone())
    }

    pub fn exclude_files(&self) -> PlatformValue<Vec<String>> {
        self.attr(|a| a.exclude_files.clone())
    }

    pub fn public_header_files(&self) -> PlatformValue<Vec<String>> {
        self.attr(|a| a.public_header_files.clone())
    }

    pub fn frameworks(&self) -> PlatformValue<Vec<String>> {
        self.attr(|a| a.frameworks.clone())
    }

    pub fn weak_frameworks(&self) -> PlatformValue<Vec<String>> {
        self.attr(|a| a.weak_frameworks.clone())
    }

    pub fn libraries(&self) -> PlatformValue<Vec<String>> {
        self.attr(|a| a.libraries.clone())
    }

    pub fn dependencies(&self) -> PlatformValue<Vec<String>> {
        self.attr(|a| a.dependencies.clone())
    }

    /// Explicit compiler flags, one flag per element.
    pub fn compiler_flags(&self) -> PlatformValue<Vec<String>> {
        self.attr(|a| {
            a.compiler_flags
                .iter()
                .flat_map(|f| f.split_whitespace().map(str::to_owned))
                .collect()
        })
    }

    pub fn pod_target_xcconfig(&self) -> PlatformValue<BTreeMap<String, String>> {
        self.attr(|a| a.pod_target_xcconfig.clone())
    }

    pub fn user_target_xcconfig(&self) -> PlatformValue<BTreeMap<String, String>> {
        self.attr(|a| a.user_target_xcconfig.clone())
    }

    pub fn xcconfig(&self) -> PlatformValue<BTreeMap<String, String>> {
        self.attr(|a| a.xcconfig.clone())
    }

    pub fn prefix_header_contents(&self) -> PlatformValue<String> {
        self.scalar_attr(|a| a.prefix_header_contents.clone())
    }

    /// `requires_arc` is either a boolean or a list of ARC file patterns.
    /// Anything other than an explicit `false` means ARC is on.
    pub fn requires_arc(&self) -> bool {
        !matches!(self.requires_arc, Some(serde_json::Value::Bool(false)))
    }
}

pub fn parse_podspec_str(input: &str) -> Result<PodSpec, ManifestError> {
    parse_named("<input>", input)
}

pub fn parse_podspec_file(path: impl AsRef<Path>) -> Result<PodSpec, ManifestError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    parse_named(&path.display().to_string(), &content)
}

fn parse_named(origin: &str, input: &str) -> Result<PodSpec, ManifestError> {
    let spec: PodSpec = serde_json::from_str(input).map_err(|source| ManifestError::ParseJson {
        path: origin.to_owned(),
        source,
    })?;
    spec.validate()?;
    Ok(spec)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<OneOrMany>::deserialize(deserializer)?
        .map(Vec::from)
        .unwrap_or_default())
}

fn joined_lines<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(string_or_list(deserializer)?.join("\n"))
}

fn bundle_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, OneOrMany>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, Vec::from(v)))
        .collect())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PathOrFlag {
    Path(String),
    Flag(bool),
}

/// `prefix_header_file` is a path, or `false` to turn the prefix header off.
fn path_or_false<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<PathOrFlag>::deserialize(deserializer)? {
        Some(PathOrFlag::Path(path)) if !path.trim().is_empty() => Ok(Some(path)),
        Some(PathOrFlag::Flag(true)) => Err(de::Error::custom(
            "prefix_header_file must be a path or false",
        )),
        _ => Ok(None),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DependencyDecl {
    Name(String),
    Names(Vec<String>),
    Constrained(BTreeMap<String, serde_json::Value>),
}

/// Dependencies arrive either as names or as CocoaPods' `{name: [constraints]}`
/// map. Only the names are kept.
fn dependency_names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let names = match Option::<DependencyDecl>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(DependencyDecl::Name(name)) => vec![name],
        Some(DependencyDecl::Names(names)) => names,
        Some(DependencyDecl::Constrained(map)) => map.into_keys().collect(),
    };
    if names.iter().any(|n| n.trim().is_empty()) {
        return Err(de::Error::custom("dependency name must not be empty"));
    }
    Ok(names)
}
