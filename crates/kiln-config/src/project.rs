//! Project Configuration (kiln.toml)
//!
//! Handles the project file at the project root: package metadata, configure
//! defaults, the `[toolchain]` layer, build targets, documentation, and clean
//! groups.

use crate::layer::ConfigLayer;
use crate::options::OptionSet;
use crate::platform::{Compiler, Flavor, Platform};
use crate::resolved::Product;
use crate::resolver::target_options;
use crate::{ConfigError, ConfigResult, Role};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Name of the project file
pub const PROJECT_FILE_NAME: &str = "kiln.toml";

/// Project configuration from kiln.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProjectFile {
    /// Package metadata
    pub package: PackageConfig,

    /// Defaults for `kiln configure`
    #[serde(default)]
    pub configure: ConfigureDefaults,

    /// Project toolchain layer
    #[serde(default, skip_serializing_if = "ConfigLayer::is_empty")]
    pub toolchain: ConfigLayer,

    /// Build targets in declaration order
    #[serde(default, rename = "target", skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<TargetSpec>,

    /// Documentation generator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs: Option<DocsConfig>,

    /// Named clean groups
    #[serde(default, skip_serializing_if = "CleanConfig::is_empty")]
    pub clean: CleanConfig,
}

/// Package metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PackageConfig {
    /// Package name
    pub name: String,

    /// Package version (X.Y or X.Y.Z with optional pre-release)
    pub version: String,

    /// Package description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// License identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
}

/// Defaults for `kiln configure`, overridden by flags and environment
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ConfigureDefaults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler: Option<Compiler>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flavor: Option<Flavor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<PathBuf>,
}

/// Kind of artifact a target produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    StaticLib,
    SharedLib,
    Program,
}

impl ArtifactKind {
    /// Name as written in kiln.toml
    pub fn name(&self) -> &'static str {
        match self {
            Self::StaticLib => "static-lib",
            Self::SharedLib => "shared-lib",
            Self::Program => "program",
        }
    }

    /// Role whose template produces the artifact
    pub fn role(&self) -> Role {
        match self {
            Self::StaticLib => Role::Ar,
            Self::SharedLib => Role::Shlink,
            Self::Program => Role::Link,
        }
    }
}

impl FromStr for ArtifactKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static-lib" | "staticlib" | "static" => Ok(Self::StaticLib),
            "shared-lib" | "sharedlib" | "shared" => Ok(Self::SharedLib),
            "program" | "bin" => Ok(Self::Program),
            other => Err(ConfigError::InvalidValue {
                field: "kind".to_string(),
                reason: format!("unknown artifact kind '{}' (expected static-lib, shared-lib, program)", other),
            }),
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One build target
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TargetSpec {
    /// Target name, also the artifact base name
    pub name: String,

    /// Artifact kind
    pub kind: ArtifactKind,

    /// Source files relative to the project root, in compile order
    pub sources: Vec<PathBuf>,

    /// Option overrides for every role
    #[serde(default, skip_serializing_if = "OptionSet::is_empty")]
    pub options: OptionSet,

    /// Additional overrides per platform
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub platform: BTreeMap<Platform, OptionSet>,

    /// Shared library version (X[.Y[.Z]])
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl TargetSpec {
    /// Create a target with no overrides
    pub fn new<I, P>(name: impl Into<String>, kind: ArtifactKind, sources: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            name: name.into(),
            kind,
            sources: sources.into_iter().map(Into::into).collect(),
            options: OptionSet::new(),
            platform: BTreeMap::new(),
            version: None,
        }
    }

    /// Set the option overrides (builder style)
    pub fn with_options(mut self, options: OptionSet) -> Self {
        self.options = options;
        self
    }

    /// Effective overrides on `platform`
    pub fn options_for(&self, platform: Platform) -> OptionSet {
        target_options(&self.options, self.platform.get(&platform))
    }

    /// Validate the target in isolation
    pub fn validate(&self) -> ConfigResult<()> {
        if !is_valid_target_name(&self.name) {
            return Err(ConfigError::InvalidValue {
                field: "target.name".to_string(),
                reason: format!(
                    "'{}' must be non-empty and use only letters, digits, '-', '_' or '.'",
                    self.name
                ),
            });
        }

        if self.sources.is_empty() {
            return Err(ConfigError::MissingField {
                field: "sources".to_string(),
                scope: format!("target '{}'", self.name),
            });
        }

        if let Some(version) = &self.version {
            if self.kind != ArtifactKind::SharedLib {
                return Err(ConfigError::InvalidValue {
                    field: format!("target '{}' version", self.name),
                    reason: "only shared libraries carry a version".to_string(),
                });
            }
            if !is_valid_library_version(version) {
                return Err(ConfigError::InvalidVersion(version.clone()));
            }
        }

        Ok(())
    }
}

/// Documentation generator invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DocsConfig {
    /// Generator program
    #[serde(default = "default_generator")]
    pub generator: String,

    /// Configuration file handed to the generator
    pub config: PathBuf,
}

fn default_generator() -> String {
    "doxygen".to_string()
}

/// Named groups of path globs removed by `kiln clean`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct CleanConfig {
    pub groups: BTreeMap<String, Vec<String>>,
}

impl CleanConfig {
    /// Groups used when the project declares none
    pub fn defaults(build_dir: &Path) -> Self {
        let build = format!("{}/**", build_dir.to_string_lossy().trim_end_matches(['/', '\\']));
        let mut groups = BTreeMap::new();
        groups.insert("build".to_string(), vec![build]);
        Self { groups }
    }

    /// Globs of one group
    pub fn group(&self, name: &str) -> Option<&[String]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    /// Group names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl ProjectFile {
    /// Load the project file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let project: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        project.validate()?;
        Ok(project)
    }

    /// Find the project file in `start` or one of its ancestors
    pub fn find(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(PROJECT_FILE_NAME))
            .find(|candidate| candidate.is_file())
    }

    /// Validate the project file
    pub fn validate(&self) -> ConfigResult<()> {
        if self.package.name.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "package.name".to_string(),
                reason: "name cannot be empty".to_string(),
            });
        }

        if !is_valid_version(&self.package.version) {
            return Err(ConfigError::InvalidVersion(self.package.version.clone()));
        }

        let mut seen = HashSet::new();
        for target in &self.targets {
            target.validate()?;
            if !seen.insert(target.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "target '{}' is declared more than once",
                    target.name
                )));
            }
        }

        for (name, globs) in &self.clean.groups {
            if globs.iter().any(|g| g.trim().is_empty()) {
                return Err(ConfigError::InvalidValue {
                    field: format!("clean.{}", name),
                    reason: "glob cannot be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Product metadata for the resolved configuration
    pub fn product(&self) -> Product {
        Product {
            name: self.package.name.clone(),
            version: self.package.version.clone(),
        }
    }

    /// Look up a target by name
    pub fn target(&self, name: &str) -> Option<&TargetSpec> {
        self.targets.iter().find(|t| t.name == name)
    }

    /// Clean groups, falling back to removing the build directory
    pub fn clean_groups(&self, build_dir: &Path) -> CleanConfig {
        if self.clean.is_empty() {
            CleanConfig::defaults(build_dir)
        } else {
            self.clean.clone()
        }
    }
}

/// Basic semver validation (simplified)
fn is_valid_version(version: &str) -> bool {
    let main_version = version.split(['-', '+']).next().unwrap_or("");
    let parts: Vec<&str> = main_version.split('.').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return false;
    }
    all_numeric(&parts)
}

/// X, X.Y or X.Y.Z
fn is_valid_library_version(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    parts.len() <= 3 && all_numeric(&parts)
}

fn all_numeric(parts: &[&str]) -> bool {
    parts
        .iter()
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}

fn is_valid_target_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
