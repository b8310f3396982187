//! Configuration Loader
//!
//! Finds the project file, loads the global configuration, and decides the
//! platform/compiler/flavor selection with proper precedence:
//! 1. CLI flags - highest priority (passed in by the caller)
//! 2. Environment variables (`KILN_PLATFORM`, `KILN_COMPILER`, `KILN_FLAVOR`)
//! 3. Project `[configure]` table
//! 4. Global config (~/.kiln/config.toml)
//! 5. Host defaults - lowest priority

use crate::global::GlobalConfig;
use crate::platform::{self, Compiler, Flavor, Platform};
use crate::project::ProjectFile;
use crate::resolver::{ConfigResolver, InstallOverrides, Selection};
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};

/// Default build directory, relative to the project root
pub const DEFAULT_BUILD_DIR: &str = "build";

/// A partially specified selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionRequest {
    pub platform: Option<Platform>,
    pub compiler: Option<Compiler>,
    pub flavor: Option<Flavor>,
}

impl SelectionRequest {
    /// Read `KILN_PLATFORM`, `KILN_COMPILER` and `KILN_FLAVOR`
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the selection variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Ok(Self {
            platform: value("KILN_PLATFORM").map(|v| v.parse()).transpose()?,
            compiler: value("KILN_COMPILER").map(|v| v.parse()).transpose()?,
            flavor: value("KILN_FLAVOR").map(|v| v.parse()).transpose()?,
        })
    }

    /// Fill unset fields from `fallback`
    pub fn or(self, fallback: SelectionRequest) -> Self {
        Self {
            platform: self.platform.or(fallback.platform),
            compiler: self.compiler.or(fallback.compiler),
            flavor: self.flavor.or(fallback.flavor),
        }
    }

    /// Complete the selection with host defaults
    pub fn finish(self) -> Selection {
        let platform = self.platform.unwrap_or_else(Platform::host);
        Selection::new(
            platform,
            self.compiler.unwrap_or_else(|| Compiler::default_for(platform)),
            self.flavor.unwrap_or_default(),
        )
    }
}

/// A loaded project together with the user's global configuration
#[derive(Debug, Clone)]
pub struct ProjectContext {
    /// Directory containing kiln.toml
    pub root: PathBuf,
    pub project: ProjectFile,
    pub global: GlobalConfig,
}

impl ProjectContext {
    /// Find kiln.toml in `start` or an ancestor and load it
    pub fn discover(start: &Path) -> ConfigResult<Self> {
        let path = ProjectFile::find(start)
            .ok_or_else(|| ConfigError::NotFound(start.join(crate::project::PROJECT_FILE_NAME)))?;
        Self::load(&path)
    }

    /// Load a specific project file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let project = ProjectFile::load_from_file(path)?;
        // The global file is optional; a broken one is reported, a missing home is not
        let global = match GlobalConfig::load_or_default() {
            Err(ConfigError::HomeNotFound) => GlobalConfig::default(),
            other => other?,
        };
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        tracing::debug!(root = %root.display(), package = %project.package.name, "loaded project");
        Ok(Self {
            root,
            project,
            global,
        })
    }

    /// Build directory as configured, relative to the project root unless absolute
    pub fn build_dir(&self, cli: Option<&Path>) -> PathBuf {
        cli.map(Path::to_path_buf)
            .or_else(|| self.project.configure.build_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BUILD_DIR))
    }

    /// Absolute location of the build directory
    pub fn build_path(&self, build_dir: &Path) -> PathBuf {
        self.root.join(build_dir)
    }

    /// Decide the selection from CLI flags, environment, project, and global config
    pub fn selection(&self, cli: SelectionRequest, env: SelectionRequest) -> Selection {
        let configure = &self.project.configure;
        let project = SelectionRequest {
            platform: configure.platform,
            compiler: configure.compiler,
            flavor: configure.flavor,
        };
        let global = SelectionRequest {
            platform: None,
            compiler: self.global.default_compiler(),
            flavor: self.global.default_flavor(),
        };

        let mut request = cli.or(env).or(project);
        // A global compiler default only applies where a profile exists for it
        if request.compiler.is_none() {
            let platform = request.platform.unwrap_or_else(Platform::host);
            request.compiler = global
                .compiler
                .filter(|compiler| platform::profile_layer(platform, *compiler).is_ok());
        }
        request.or(global).finish()
    }

    /// Resolver carrying the project's product, toolchain layer, and install prefix
    pub fn resolver(&self, selection: Selection, build_dir: &Path, install: InstallOverrides) -> ConfigResolver {
        let install = InstallOverrides {
            prefix: install.prefix.or_else(|| self.project.configure.prefix.clone()),
            ..install
        };

        ConfigResolver::new(selection)
            .with_product(self.project.product())
            .with_user_layer(self.project.toolchain.clone())
            .with_build_dir(build_dir)
            .with_install(install)
            .with_working_dir(&self.root)
    }

    /// Default parallel compile jobs
    pub fn default_jobs(&self) -> usize {
        self.global.default_jobs().unwrap_or(1)
    }
}
