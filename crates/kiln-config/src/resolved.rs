//! Resolved configuration
//!
//! The result of `configure`: every toolchain role fully specified, naming
//! patterns complete, product and install directories fixed. It is written
//! once to `<build-dir>/kiln-config.json` and only read afterwards.

use crate::options::OptionSet;
use crate::platform::{Compiler, Flavor, Platform};
use crate::template::{render_one, Template, TemplateError, Vars};
use crate::{ConfigError, ConfigResult, Role};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// File name of the persisted configuration inside the build directory
pub const CONFIG_FILE_NAME: &str = "kiln-config.json";

/// Format version of the persisted configuration
pub const SCHEMA_VERSION: u32 = 1;

/// Fully resolved settings for one toolchain role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolvedRole {
    /// Program path found on the search path
    pub program: String,
    /// Command template
    pub template: String,
    /// Default options
    #[serde(default)]
    pub options: OptionSet,
    /// Always-linked libraries
    #[serde(default)]
    pub std_libs: Vec<String>,
}

impl ResolvedRole {
    /// Parse the command template
    pub fn template(&self) -> Result<Template, TemplateError> {
        Template::parse(&self.template)
    }

    /// Copy of this role with target overrides merged on top
    pub fn with_overrides(&self, overrides: &OptionSet) -> ResolvedRole {
        ResolvedRole {
            options: self.options.merge(overrides),
            ..self.clone()
        }
    }
}

/// Complete naming and switch patterns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamingPatterns {
    pub static_lib: String,
    pub shared_lib: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_lib_versioned: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_lib: Option<String>,
    pub program: String,
    pub object_ext: String,
    pub object_glob: String,
    pub define: String,
    pub include: String,
    pub lib: String,
    pub lib_path: String,
}

impl NamingPatterns {
    /// File name of a static library
    pub fn static_lib_name(&self, name: &str) -> Result<String, TemplateError> {
        render_one(&self.static_lib, "NAME", name)
    }

    /// File name of a shared library, versioned when both a version and a
    /// versioned pattern exist
    pub fn shared_lib_name(&self, name: &str, version: Option<&str>) -> Result<String, TemplateError> {
        match (version, &self.shared_lib_versioned) {
            (Some(version), Some(pattern)) => Template::parse(pattern)?.render(
                &Vars::new().with("NAME", name).with("VERSION", version),
            ),
            _ => render_one(&self.shared_lib, "NAME", name),
        }
    }

    /// File name of the import library, if the platform produces one
    pub fn import_lib_name(&self, name: &str) -> Result<Option<String>, TemplateError> {
        self.import_lib
            .as_deref()
            .map(|pattern| render_one(pattern, "NAME", name))
            .transpose()
    }

    /// File name of an executable
    pub fn program_name(&self, name: &str) -> Result<String, TemplateError> {
        render_one(&self.program, "NAME", name)
    }

    /// `-D<value>` or equivalent
    pub fn define_switch(&self, value: &str) -> Result<String, TemplateError> {
        render_one(&self.define, "VALUE", value)
    }

    /// `-I<value>` or equivalent
    pub fn include_switch(&self, value: &str) -> Result<String, TemplateError> {
        render_one(&self.include, "VALUE", value)
    }

    /// `-l<value>` or equivalent
    pub fn lib_switch(&self, value: &str) -> Result<String, TemplateError> {
        render_one(&self.lib, "VALUE", value)
    }

    /// `-L<value>` or equivalent
    pub fn lib_path_switch(&self, value: &str) -> Result<String, TemplateError> {
        render_one(&self.lib_path, "VALUE", value)
    }
}

/// Product metadata taken from the package descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub version: String,
}

/// Installation directories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallDirs {
    pub prefix: PathBuf,
    pub bindir: PathBuf,
    pub libdir: PathBuf,
    pub includedir: PathBuf,
    pub docdir: PathBuf,
}

/// The immutable result of `configure`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolvedConfig {
    /// Format version
    pub schema: u32,
    pub platform: Platform,
    pub compiler: Compiler,
    pub flavor: Flavor,
    pub product: Product,
    /// Build directory, relative to the project root unless absolute
    pub build_dir: PathBuf,
    pub install: InstallDirs,
    pub cc: ResolvedRole,
    pub cxx: ResolvedRole,
    pub ar: ResolvedRole,
    pub shlink: ResolvedRole,
    pub link: ResolvedRole,
    pub patterns: NamingPatterns,
}

impl ResolvedConfig {
    /// Settings for a role
    pub fn role(&self, role: Role) -> &ResolvedRole {
        match role {
            Role::Cc => &self.cc,
            Role::Cxx => &self.cxx,
            Role::Ar => &self.ar,
            Role::Shlink => &self.shlink,
            Role::Link => &self.link,
        }
    }

    /// Copy of this configuration with target overrides merged into every role
    pub fn with_target_overrides(&self, overrides: &OptionSet) -> ResolvedConfig {
        if overrides.is_empty() {
            return self.clone();
        }
        ResolvedConfig {
            cc: self.cc.with_overrides(overrides),
            cxx: self.cxx.with_overrides(overrides),
            ar: self.ar.with_overrides(overrides),
            shlink: self.shlink.with_overrides(overrides),
            link: self.link.with_overrides(overrides),
            ..self.clone()
        }
    }

    /// Path of the persisted configuration inside a build directory
    pub fn config_path(build_dir: &Path) -> PathBuf {
        build_dir.join(CONFIG_FILE_NAME)
    }

    /// Write the configuration into `build_dir`, creating it if needed
    pub fn save_to_dir(&self, build_dir: &Path) -> ConfigResult<PathBuf> {
        fs::create_dir_all(build_dir)?;
        let path = Self::config_path(build_dir);
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        // Write-then-rename so a half-written artifact is never observed
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &path)?;

        tracing::debug!(path = %path.display(), "wrote resolved configuration");
        Ok(path)
    }

    /// Load a persisted configuration
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::ConfigurationMissing(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = serde_json::from_str(&content).map_err(|e| ConfigError::JsonError {
            file: path.to_path_buf(),
            error: e,
        })?;

        if config.schema != SCHEMA_VERSION {
            return Err(ConfigError::ValidationError(format!(
                "{} was written by an incompatible kiln (schema {}, expected {}); run `kiln configure` again",
                path.display(),
                config.schema,
                SCHEMA_VERSION
            )));
        }

        Ok(config)
    }

    /// Load the configuration persisted in `build_dir`
    pub fn load_from_dir(build_dir: &Path) -> ConfigResult<Self> {
        Self::load(&Self::config_path(build_dir))
    }
}

/// Lazily loaded, shared configuration for one build session
///
/// The artifact is read on first use and the same [`Arc`] is handed out
/// afterwards; a failed load is not cached.
#[derive(Debug)]
pub struct ConfigCache {
    path: PathBuf,
    cached: OnceLock<Arc<ResolvedConfig>>,
}

impl ConfigCache {
    /// Cache for the configuration persisted in `build_dir`
    pub fn new(build_dir: &Path) -> Self {
        Self {
            path: ResolvedConfig::config_path(build_dir),
            cached: OnceLock::new(),
        }
    }

    /// Path of the underlying artifact
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the configuration, loading it on first use
    pub fn get(&self) -> ConfigResult<Arc<ResolvedConfig>> {
        if let Some(config) = self.cached.get() {
            return Ok(Arc::clone(config));
        }

        let loaded = Arc::new(ResolvedConfig::load(&self.path)?);
        Ok(Arc::clone(self.cached.get_or_init(|| loaded)))
    }

    /// Whether the configuration has been loaded
    pub fn is_loaded(&self) -> bool {
        self.cached.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns() -> NamingPatterns {
        NamingPatterns {
            static_lib: "lib${NAME}.a".to_string(),
            shared_lib: "lib${NAME}.so".to_string(),
            shared_lib_versioned: Some("lib${NAME}.so.${VERSION}".to_string()),
            import_lib: None,
            program: "${NAME}".to_string(),
            object_ext: "o".to_string(),
            object_glob: "*.o".to_string(),
            define: "-D${VALUE}".to_string(),
            include: "-I${VALUE}".to_string(),
            lib: "-l${VALUE}".to_string(),
            lib_path: "-L${VALUE}".to_string(),
        }
    }

    #[test]
    fn test_artifact_names() {
        let p = patterns();
        assert_eq!(p.static_lib_name("mathlib").unwrap(), "libmathlib.a");
        assert_eq!(p.shared_lib_name("orion", None).unwrap(), "liborion.so");
        assert_eq!(p.shared_lib_name("orion", Some("1.2")).unwrap(), "liborion.so.1.2");
        assert_eq!(p.import_lib_name("orion").unwrap(), None);
        assert_eq!(p.program_name("tool").unwrap(), "tool");
    }

    #[test]
    fn test_switches() {
        let p = patterns();
        assert_eq!(p.define_switch("NDEBUG").unwrap(), "-DNDEBUG");
        assert_eq!(p.include_switch("include").unwrap(), "-Iinclude");
        assert_eq!(p.lib_switch("m").unwrap(), "-lm");
        assert_eq!(p.lib_path_switch("build/lib").unwrap(), "-Lbuild/lib");
    }

    #[test]
    fn test_versioned_name_falls_back_without_pattern() {
        let p = NamingPatterns {
            shared_lib_versioned: None,
            ..patterns()
        };
        assert_eq!(p.shared_lib_name("orion", Some("2")).unwrap(), "liborion.so");
    }

    #[test]
    fn test_role_overrides_merge_options() {
        let role = ResolvedRole {
            program: "/usr/bin/cc".to_string(),
            template: "${PROGRAM}".to_string(),
            options: OptionSet::new().with_flags(["-Wall"]),
            std_libs: vec![],
        };
        let merged = role.with_overrides(&OptionSet::new().with_flags(["-Wall", "-Werror"]));
        assert_eq!(merged.options.flags, vec!["-Wall", "-Werror"]);
        assert_eq!(merged.program, "/usr/bin/cc");
    }

    #[test]
    fn test_load_missing_is_configuration_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = ResolvedConfig::load_from_dir(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigurationMissing(_)));
    }

    #[test]
    fn test_cache_reports_missing_and_stays_unloaded() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ConfigCache::new(dir.path());
        assert!(matches!(
            cache.get().unwrap_err(),
            ConfigError::ConfigurationMissing(_)
        ));
        assert!(!cache.is_loaded());
    }
}
