/// Build system error types
use kiln_config::{ConfigError, TemplateError};
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Project is not configured: {0} does not exist (run `kiln configure` first)")]
    ConfigurationMissing(PathBuf),

    #[error("Program '{program}' for {role} not found in search path")]
    ProgramNotFound { role: String, program: String },

    #[error("Source file not found for target '{target}': {file}")]
    SourceNotFound { target: String, file: PathBuf },

    #[error("Compilation of {file} failed for target '{target}'\n{diagnostics}")]
    CompileFailed {
        target: String,
        file: PathBuf,
        diagnostics: String,
    },

    #[error("Linking target '{target}' failed\n{diagnostics}")]
    LinkFailed { target: String, diagnostics: String },

    #[error("Archiving target '{target}' failed\n{diagnostics}")]
    ArchiveFailed { target: String, diagnostics: String },

    #[error("Documentation generator failed\n{diagnostics}")]
    DocsFailed { diagnostics: String },

    #[error("Failed to start `{command}`: {error}")]
    SpawnFailed {
        command: String,
        error: std::io::Error,
    },

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Configuration error: {0}")]
    Config(ConfigError),

    #[error("Target not found: {target}")]
    TargetNotFound { target: String },

    #[error("Invalid target configuration: {0}")]
    InvalidTarget(String),

    #[error("Targets link against each other: {0}")]
    DependencyCycle(String),

    #[error("Target '{target}' not built: dependency '{dependency}' failed")]
    DependencyFailed { target: String, dependency: String },

    #[error("Invalid glob '{pattern}': {reason}")]
    InvalidGlob { pattern: String, reason: String },

    #[error("Failed to remove {path}: {error}")]
    CleanFailed {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create a compile failure
    pub fn compile_failed(
        target: impl Into<String>,
        file: impl Into<PathBuf>,
        diagnostics: impl Into<String>,
    ) -> Self {
        Self::CompileFailed {
            target: target.into(),
            file: file.into(),
            diagnostics: diagnostics.into(),
        }
    }

    /// Create a missing source error
    pub fn source_not_found(target: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self::SourceNotFound {
            target: target.into(),
            file: file.into(),
        }
    }

    /// Create a target not found error
    pub fn target_not_found(target: impl Into<String>) -> Self {
        Self::TargetNotFound {
            target: target.into(),
        }
    }

    /// Short machine-readable name of the failure class
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigurationMissing(_) => "configuration-missing",
            Self::ProgramNotFound { .. } => "program-not-found",
            Self::SourceNotFound { .. } => "source-not-found",
            Self::CompileFailed { .. } => "compile-failed",
            Self::LinkFailed { .. } => "link-failed",
            Self::ArchiveFailed { .. } => "archive-failed",
            Self::DocsFailed { .. } => "docs-failed",
            Self::SpawnFailed { .. } => "spawn-failed",
            Self::Template(_) => "template",
            Self::Config(_) => "config",
            Self::TargetNotFound { .. } => "target-not-found",
            Self::InvalidTarget(_) => "invalid-target",
            Self::DependencyCycle(_) => "dependency-cycle",
            Self::DependencyFailed { .. } => "dependency-failed",
            Self::InvalidGlob { .. } => "invalid-glob",
            Self::CleanFailed { .. } => "clean-failed",
            Self::IoError { .. } | Self::Io(_) => "io",
        }
    }
}

impl From<ConfigError> for BuildError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::ConfigurationMissing(path) => Self::ConfigurationMissing(path),
            ConfigError::ProgramNotFound { role, program } => Self::ProgramNotFound { role, program },
            ConfigError::Template(error) => Self::Template(error),
            other => Self::Config(other),
        }
    }
}
