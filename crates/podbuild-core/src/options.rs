//! Generation options: command-line flags, `podbuild.toml`, and per-target
//! user overrides.

use podbuild_schema::bazel_label;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "podbuild.toml";

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("invalid user option '{0}', expected '<target>.<attr> += <value>[, <value>...]'")]
    InvalidUserOption(String),
    #[error("unsupported user option attribute '{attr}' in '{option}'")]
    UnsupportedAttribute { attr: String, option: String },
}

/// Attributes a user option may extend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAttr {
    Copts,
    SdkFrameworks,
    WeakSdkFrameworks,
    SdkDylibs,
}

impl UserAttr {
    pub fn as_str(self) -> &'static str {
        match self {
            UserAttr::Copts => "copts",
            UserAttr::SdkFrameworks => "sdk_frameworks",
            UserAttr::WeakSdkFrameworks => "weak_sdk_frameworks",
            UserAttr::SdkDylibs => "sdk_dylibs",
        }
    }
}

/// `Foo_Core.copts += -DFOO, -Wno-error`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserOption {
    pub target: String,
    pub attr: UserAttr,
    pub values: Vec<String>,
}

impl UserOption {
    /// Whether this option addresses the rule `label`. Targets may be given
    /// either as labels or as `Pod/Sub` names.
    pub fn applies_to(&self, label: &str) -> bool {
        bazel_label(&self.target) == label
    }
}

impl FromStr for UserOption {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || OptionsError::InvalidUserOption(s.to_owned());
        let (lhs, rhs) = s.split_once("+=").ok_or_else(invalid)?;
        let (target, attr) = lhs.trim().rsplit_once('.').ok_or_else(invalid)?;
        let (target, attr) = (target.trim(), attr.trim());
        if target.is_empty() || attr.is_empty() {
            return Err(invalid());
        }
        let attr = match attr {
            "copts" => UserAttr::Copts,
            "sdk_frameworks" => UserAttr::SdkFrameworks,
            "weak_sdk_frameworks" => UserAttr::WeakSdkFrameworks,
            "sdk_dylibs" => UserAttr::SdkDylibs,
            other => {
                return Err(OptionsError::UnsupportedAttribute {
                    attr: other.to_owned(),
                    option: s.to_owned(),
                })
            }
        };
        let values: Vec<String> = rhs
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
            .collect();
        if values.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            target: target.to_owned(),
            attr,
            values,
        })
    }
}

impl fmt::Display for UserOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} += {}",
            self.target,
            self.attr.as_str(),
            self.values.join(", ")
        )
    }
}

/// Everything that shapes generation besides the podspec itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Pod directory relative to the workspace root.
    pub path: String,
    pub user_options: Vec<UserOption>,
    /// Flags appended to every library, before user options.
    pub global_copts: Vec<String>,
    pub enable_modules: bool,
    /// Emit header-union assignments and include paths for
    /// `pod_support/Headers/Public`.
    pub stage_headers: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            path: ".".to_owned(),
            user_options: Vec::new(),
            global_copts: Vec::new(),
            enable_modules: false,
            stage_headers: false,
        }
    }
}

impl BuildOptions {
    /// Options seeded from a config file. Command-line values are layered on
    /// top by the caller.
    pub fn from_config(config: &BuildConfig) -> Result<Self, OptionsError> {
        let user_options = config
            .build
            .user_options
            .iter()
            .map(|s| s.parse())
            .collect::<Result<Vec<UserOption>, _>>()?;
        Ok(Self {
            path: config.build.path.clone().unwrap_or_else(|| ".".to_owned()),
            user_options,
            global_copts: config.build.global_copts.clone(),
            enable_modules: config.build.enable_modules,
            stage_headers: config.build.stage_headers,
        })
    }
}

/// `podbuild.toml`
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    #[serde(default)]
    pub build: BuildSection,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub global_copts: Vec<String>,
    #[serde(default)]
    pub user_options: Vec<String>,
    #[serde(default)]
    pub enable_modules: bool,
    #[serde(default)]
    pub stage_headers: bool,
}

pub fn parse_config_str(input: &str) -> Result<BuildConfig, OptionsError> {
    Ok(toml::from_str(input)?)
}

pub fn parse_config_file(path: impl AsRef<Path>) -> Result<BuildConfig, OptionsError> {
    let content = fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Load `podbuild.toml` from `dir` if it exists.
pub fn load_config(dir: &Path) -> Result<Option<BuildConfig>, OptionsError> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.is_file() {
        return Ok(None);
    }
    parse_config_file(&path).map(Some)
}
