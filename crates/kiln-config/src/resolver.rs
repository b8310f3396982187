//! Configuration resolution
//!
//! Merges the layer stack for one platform/compiler/flavor selection,
//! validates the result, resolves every role's program on the search path,
//! and produces a [`ResolvedConfig`].

use crate::layer::{ConfigLayer, RoleLayer};
use crate::options::OptionSet;
use crate::platform::{self, Compiler, Flavor, Platform};
use crate::resolved::{
    InstallDirs, NamingPatterns, Product, ResolvedConfig, ResolvedRole, SCHEMA_VERSION,
};
use crate::template::Template;
use crate::{ConfigError, ConfigResult, Role};
use serde::{Deserialize, Serialize};
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Platform, compiler, and flavor chosen for a configure run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub platform: Platform,
    pub compiler: Compiler,
    pub flavor: Flavor,
}

impl Selection {
    pub fn new(platform: Platform, compiler: Compiler, flavor: Flavor) -> Self {
        Self {
            platform,
            compiler,
            flavor,
        }
    }

    /// Host platform with its default compiler and the debug flavor
    pub fn host() -> Self {
        let platform = Platform::host();
        Self::new(platform, Compiler::default_for(platform), Flavor::default())
    }
}

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{} ({})", self.platform, self.compiler, self.flavor)
    }
}

/// Install directory overrides; relative directories are taken under the prefix
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallOverrides {
    pub prefix: Option<PathBuf>,
    pub bindir: Option<PathBuf>,
    pub libdir: Option<PathBuf>,
    pub includedir: Option<PathBuf>,
    pub docdir: Option<PathBuf>,
}

/// Builds a [`ResolvedConfig`] from the layer stack
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    selection: Selection,
    env_layer: ConfigLayer,
    user_layer: ConfigLayer,
    product: Product,
    build_dir: PathBuf,
    install: InstallOverrides,
    search_path: Option<OsString>,
    working_dir: Option<PathBuf>,
}

impl ConfigResolver {
    /// Create a resolver for a selection with no environment or user layer
    pub fn new(selection: Selection) -> Self {
        Self {
            selection,
            env_layer: ConfigLayer::new(),
            user_layer: ConfigLayer::new(),
            product: Product {
                name: "unnamed".to_string(),
                version: "0.0.0".to_string(),
            },
            build_dir: PathBuf::from("build"),
            install: InstallOverrides::default(),
            search_path: None,
            working_dir: None,
        }
    }

    /// The selection being resolved
    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Set the environment layer
    pub fn with_env_layer(mut self, layer: ConfigLayer) -> Self {
        self.env_layer = layer;
        self
    }

    /// Take the environment layer from the process environment
    pub fn with_process_env(self) -> Self {
        let layer = Self::env_layer(|key| env::var(key).ok());
        self.with_env_layer(layer)
    }

    /// Set the project's `[toolchain]` layer
    pub fn with_user_layer(mut self, layer: ConfigLayer) -> Self {
        self.user_layer = layer;
        self
    }

    pub fn with_product(mut self, product: Product) -> Self {
        self.product = product;
        self
    }

    pub fn with_build_dir(mut self, build_dir: impl Into<PathBuf>) -> Self {
        self.build_dir = build_dir.into();
        self
    }

    pub fn with_install(mut self, install: InstallOverrides) -> Self {
        self.install = install;
        self
    }

    /// Search these directories for programs instead of `PATH`
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// Directory relative program paths are resolved against
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Build the environment layer from a variable lookup
    ///
    /// `CC`, `CXX`, `AR` and `LD` replace programs; `CFLAGS`, `CXXFLAGS`,
    /// `CPPFLAGS` and `LDFLAGS` add whitespace-separated flags.
    pub fn env_layer<F>(lookup: F) -> ConfigLayer
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let words = |key: &str| -> Vec<String> {
            value(key)
                .map(|v| v.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default()
        };

        let mut layer = ConfigLayer::new();
        layer.cc.program = value("CC");
        layer.cxx.program = value("CXX");
        layer.ar.program = value("AR");
        if let Some(ld) = value("LD") {
            layer.shlink.program = Some(ld.clone());
            layer.link.program = Some(ld);
        }

        let cppflags = words("CPPFLAGS");
        layer.cc.options.flags = words("CFLAGS");
        layer.cc.options.cppflags = cppflags.clone();
        layer.cxx.options.flags = words("CXXFLAGS");
        layer.cxx.options.cppflags = cppflags;

        let ldflags = words("LDFLAGS");
        layer.shlink.options.ldflags = ldflags.clone();
        layer.link.options.ldflags = ldflags;

        layer
    }

    /// The named layers in merge order
    pub fn layers(&self) -> ConfigResult<Vec<(&'static str, ConfigLayer)>> {
        let Selection {
            platform,
            compiler,
            flavor,
        } = self.selection;

        Ok(vec![
            ("defaults", platform::common_defaults()),
            ("profile", platform::profile_layer(platform, compiler)?),
            ("flavor", platform::flavor_layer(flavor, compiler)),
            ("environment", self.env_layer.clone()),
            ("toolchain", self.user_layer.clone()),
        ])
    }

    /// Merge every layer without validating or resolving programs
    pub fn merged(&self) -> ConfigResult<ConfigLayer> {
        let layers = self.layers()?;
        Ok(ConfigLayer::stack(layers.iter().map(|(_, layer)| layer)))
    }

    /// Merge, validate, and resolve programs
    pub fn resolve(&self) -> ConfigResult<ResolvedConfig> {
        let merged = self.merged()?;
        tracing::debug!(selection = %self.selection, "resolving configuration");

        let role = |r: Role| self.resolve_role(r, merged.role(r));

        let config = ResolvedConfig {
            schema: SCHEMA_VERSION,
            platform: self.selection.platform,
            compiler: self.selection.compiler,
            flavor: self.selection.flavor,
            product: self.product.clone(),
            build_dir: self.build_dir.clone(),
            install: self.install_dirs(),
            cc: role(Role::Cc)?,
            cxx: role(Role::Cxx)?,
            ar: role(Role::Ar)?,
            shlink: role(Role::Shlink)?,
            link: role(Role::Link)?,
            patterns: resolve_patterns(&merged)?,
        };

        tracing::info!(
            selection = %self.selection,
            cc = %config.cc.program,
            cxx = %config.cxx.program,
            "configuration resolved"
        );
        Ok(config)
    }

    fn resolve_role(&self, role: Role, layer: &RoleLayer) -> ConfigResult<ResolvedRole> {
        let scope = format!("the {} ({})", role, role.name());

        let program = layer.program.as_deref().filter(|p| !p.is_empty()).ok_or_else(|| {
            ConfigError::MissingField {
                field: "program".to_string(),
                scope: scope.clone(),
            }
        })?;
        let template = layer.template.as_deref().filter(|t| !t.is_empty()).ok_or_else(|| {
            ConfigError::MissingField {
                field: "template".to_string(),
                scope,
            }
        })?;

        Template::parse(template)?.check_allowed(role.placeholders())?;

        Ok(ResolvedRole {
            program: self.find_program(role, program)?,
            template: template.to_string(),
            options: layer.options.clone(),
            std_libs: layer.std_libs.clone(),
        })
    }

    fn find_program(&self, role: Role, program: &str) -> ConfigResult<String> {
        let search_path = self
            .search_path
            .clone()
            .or_else(|| env::var_os("PATH"))
            .unwrap_or_default();
        let cwd = match &self.working_dir {
            Some(dir) => dir.clone(),
            None => env::current_dir()?,
        };

        match which::which_in(program, Some(search_path), &cwd) {
            Ok(path) => {
                tracing::debug!(role = role.name(), program, path = %path.display(), "found program");
                Ok(path.to_string_lossy().into_owned())
            }
            Err(_) => Err(ConfigError::ProgramNotFound {
                role: role.to_string(),
                program: program.to_string(),
            }),
        }
    }

    fn install_dirs(&self) -> InstallDirs {
        let platform = self.selection.platform;
        let name = &self.product.name;

        let prefix = self.install.prefix.clone().unwrap_or_else(|| {
            if platform.uses_usr_local() {
                PathBuf::from("/usr/local")
            } else {
                Path::new("C:\\Program Files").join(name)
            }
        });

        let under_prefix = |dir: &Option<PathBuf>, default: PathBuf| match dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => prefix.join(dir),
            None => prefix.join(default),
        };

        let docdir_default = if platform.is_windows() {
            PathBuf::from("doc")
        } else {
            Path::new("share").join("doc").join(name)
        };

        InstallDirs {
            bindir: under_prefix(&self.install.bindir, PathBuf::from("bin")),
            libdir: under_prefix(&self.install.libdir, PathBuf::from("lib")),
            includedir: under_prefix(&self.install.includedir, PathBuf::from("include")),
            docdir: under_prefix(&self.install.docdir, docdir_default),
            prefix,
        }
    }
}

fn required_pattern(value: &Option<String>, field: &str, allowed: &[&str]) -> ConfigResult<String> {
    let value = value.as_deref().filter(|v| !v.is_empty()).ok_or_else(|| {
        ConfigError::MissingField {
            field: field.to_string(),
            scope: "naming patterns".to_string(),
        }
    })?;
    Template::parse(value)?.check_allowed(allowed)?;
    Ok(value.to_string())
}

fn optional_pattern(value: &Option<String>, allowed: &[&str]) -> ConfigResult<Option<String>> {
    match value.as_deref() {
        None | Some("") => Ok(None),
        Some(value) => {
            Template::parse(value)?.check_allowed(allowed)?;
            Ok(Some(value.to_string()))
        }
    }
}

fn resolve_patterns(layer: &ConfigLayer) -> ConfigResult<NamingPatterns> {
    const NAME: &[&str] = &["NAME"];
    const VALUE: &[&str] = &["VALUE"];
    let p = &layer.patterns;

    let object_ext = p.object_ext.as_deref().unwrap_or_default();
    if object_ext.is_empty() || object_ext.contains(['.', '/', '\\']) {
        return Err(ConfigError::InvalidValue {
            field: "object_ext".to_string(),
            reason: format!("'{}' must be a bare extension such as 'o'", object_ext),
        });
    }

    Ok(NamingPatterns {
        static_lib: required_pattern(&p.static_lib, "static_lib", NAME)?,
        shared_lib: required_pattern(&p.shared_lib, "shared_lib", NAME)?,
        shared_lib_versioned: optional_pattern(&p.shared_lib_versioned, &["NAME", "VERSION"])?,
        import_lib: optional_pattern(&p.import_lib, NAME)?,
        program: required_pattern(&p.program, "program", NAME)?,
        object_ext: object_ext.to_string(),
        object_glob: required_pattern(&p.object_glob, "object_glob", &[])?,
        define: required_pattern(&p.define, "define", VALUE)?,
        include: required_pattern(&p.include, "include", VALUE)?,
        lib: required_pattern(&p.lib, "lib", VALUE)?,
        lib_path: required_pattern(&p.lib_path, "lib_path", VALUE)?,
    })
}

/// Options that apply to a target on a given platform
pub fn target_options(base: &OptionSet, platform_specific: Option<&OptionSet>) -> OptionSet {
    match platform_specific {
        Some(extra) => base.merge(extra),
        None => base.clone(),
    }
}
