//! Kiln Configuration System
//!
//! Provides the typed, layered toolchain configuration used by every kiln build:
//! - Toolchain roles and their option sets
//! - Built-in platform/compiler profiles and build flavors
//! - Layer merging and resolution into an immutable [`ResolvedConfig`]
//! - Persistence of the resolved configuration between `configure` and `build`
//! - Project files (`kiln.toml`) and global user configuration
//!
//! # Configuration Hierarchy
//!
//! Layers are merged in the following order (later overrides earlier):
//! 1. Common defaults
//! 2. Platform + compiler profile
//! 3. Build flavor overlay
//! 4. Environment (`CC`, `CFLAGS`, ...)
//! 5. Project `[toolchain]` tables
//! 6. Per-target overrides (applied at build time)
//!
//! Array options append and deduplicate in first-seen order; scalar options
//! are replaced by the more specific layer.
//!
//! # Example
//!
//! ```no_run
//! use kiln_config::{ConfigResolver, Selection};
//!
//! let resolver = ConfigResolver::new(Selection::host());
//! let config = resolver.resolve().unwrap();
//! config.save_to_dir(std::path::Path::new("build")).unwrap();
//! ```

pub mod global;
pub mod layer;
pub mod loader;
pub mod options;
pub mod platform;
pub mod project;
pub mod resolved;
pub mod resolver;
pub mod template;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid configuration artifact {file}: {error}")]
    JsonError {
        file: PathBuf,
        error: serde_json::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    SerializeError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Missing required field '{field}' for {scope}")]
    MissingField { field: String, scope: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Unsupported profile: compiler '{compiler}' is not available on platform '{platform}'")]
    UnsupportedProfile { platform: String, compiler: String },

    #[error("Program '{program}' for {role} not found in search path")]
    ProgramNotFound { role: String, program: String },

    #[error("Project is not configured: {0} does not exist (run `kiln configure` first)")]
    ConfigurationMissing(PathBuf),

    #[error("Template error: {0}")]
    Template(#[from] template::TemplateError),

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use global::GlobalConfig;
pub use layer::{ConfigLayer, PatternLayer, RoleLayer};
pub use loader::{ProjectContext, SelectionRequest};
pub use options::OptionSet;
pub use platform::{Compiler, Flavor, Platform};
pub use project::{
    ArtifactKind, CleanConfig, ConfigureDefaults, DocsConfig, PackageConfig, ProjectFile,
    TargetSpec, PROJECT_FILE_NAME,
};
pub use resolved::{
    ConfigCache, InstallDirs, NamingPatterns, Product, ResolvedConfig, ResolvedRole,
    CONFIG_FILE_NAME, SCHEMA_VERSION,
};
pub use resolver::{ConfigResolver, InstallOverrides, Selection};
pub use template::{Template, TemplateError, Vars};

/// Toolchain role: which kind of tool a command line invokes
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// C compiler
    Cc,
    /// C++ compiler
    Cxx,
    /// Static archiver
    Ar,
    /// Shared library linker
    Shlink,
    /// Program linker
    Link,
}

impl Role {
    /// All roles in resolution order
    pub fn all() -> [Role; 5] {
        [Self::Cc, Self::Cxx, Self::Ar, Self::Shlink, Self::Link]
    }

    /// Short name used in config files and logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cc => "cc",
            Self::Cxx => "cxx",
            Self::Ar => "ar",
            Self::Shlink => "shlink",
            Self::Link => "link",
        }
    }

    /// Whether this role compiles a single source file
    pub fn is_compile(&self) -> bool {
        matches!(self, Self::Cc | Self::Cxx)
    }

    /// Placeholders a command template for this role may reference
    pub fn placeholders(&self) -> &'static [&'static str] {
        match self {
            Self::Cc | Self::Cxx => &[
                "PROGRAM", "FLAGS", "CPPFLAGS", "DEFINES", "INCLUDES", "SRC", "OUT",
            ],
            Self::Ar => &["PROGRAM", "OBJS", "OUT"],
            Self::Shlink => &[
                "PROGRAM", "LDFLAGS", "LIBPATHS", "LIBS", "OBJS", "OUT", "IMPLIB",
            ],
            Self::Link => &["PROGRAM", "LDFLAGS", "LIBPATHS", "LIBS", "OBJS", "OUT"],
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Cc => "C compiler",
            Self::Cxx => "C++ compiler",
            Self::Ar => "archiver",
            Self::Shlink => "shared library linker",
            Self::Link => "program linker",
        };
        write!(f, "{}", label)
    }
}
