//! Artifact kinds
//!
//! One strategy per [`ArtifactKind`]: it names the outputs, picks the
//! toolchain role that produces them, and renders the archive or link
//! command over a target's object files.

use crate::command::{ArchiveCommand, LinkCommand};
use crate::error::{BuildError, BuildResult};
use crate::layout::BuildLayout;
use kiln_config::{ArtifactKind, ResolvedConfig, Role, TargetSpec};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Files produced by one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactOutputs {
    /// Archive, shared library or executable
    pub primary: PathBuf,
    /// Import library written next to a shared library on some platforms
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_lib: Option<PathBuf>,
}

impl ArtifactOutputs {
    pub fn paths(&self) -> Vec<PathBuf> {
        std::iter::once(self.primary.clone())
            .chain(self.import_lib.clone())
            .collect()
    }
}

/// How one kind of artifact is produced from object files
pub trait ArtifactStrategy: Send + Sync {
    fn kind(&self) -> ArtifactKind;

    /// Toolchain role whose template produces the artifact
    fn role(&self) -> Role {
        self.kind().role()
    }

    /// Output paths for `target`
    fn outputs(
        &self,
        target: &TargetSpec,
        config: &ResolvedConfig,
        layout: &BuildLayout,
    ) -> BuildResult<ArtifactOutputs>;

    /// Libraries always linked after the requested ones
    fn std_libs(&self, config: &ResolvedConfig) -> Vec<String> {
        config.role(self.role()).std_libs.clone()
    }

    /// Render the archive or link command
    fn command(
        &self,
        objects: &[PathBuf],
        outputs: &ArtifactOutputs,
        config: &ResolvedConfig,
    ) -> BuildResult<String>;

    /// Get the output directories ready before the command runs
    fn prepare(&self, outputs: &ArtifactOutputs) -> BuildResult<()> {
        for path in outputs.paths() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
            }
        }
        Ok(())
    }

    /// Error for a failed archive or link step
    fn failure(&self, target: &str, diagnostics: String) -> BuildError {
        BuildError::LinkFailed {
            target: target.to_string(),
            diagnostics,
        }
    }
}

/// Static archive of every object
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLib;

impl ArtifactStrategy for StaticLib {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::StaticLib
    }

    fn outputs(
        &self,
        target: &TargetSpec,
        config: &ResolvedConfig,
        layout: &BuildLayout,
    ) -> BuildResult<ArtifactOutputs> {
        let name = config.patterns.static_lib_name(&target.name)?;
        Ok(ArtifactOutputs {
            primary: layout.lib_dir().join(name),
            import_lib: None,
        })
    }

    fn std_libs(&self, _config: &ResolvedConfig) -> Vec<String> {
        Vec::new()
    }

    fn command(
        &self,
        objects: &[PathBuf],
        outputs: &ArtifactOutputs,
        config: &ResolvedConfig,
    ) -> BuildResult<String> {
        ArchiveCommand::new(objects.to_vec(), &outputs.primary).render(config.role(Role::Ar))
    }

    /// Archivers update members in place, so a member whose source was
    /// removed would survive; start from an empty archive instead
    fn prepare(&self, outputs: &ArtifactOutputs) -> BuildResult<()> {
        remove_if_exists(&outputs.primary)?;
        if let Some(parent) = outputs.primary.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
        Ok(())
    }

    fn failure(&self, target: &str, diagnostics: String) -> BuildError {
        BuildError::ArchiveFailed {
            target: target.to_string(),
            diagnostics,
        }
    }
}

/// Dynamically loadable library, plus an import library where the platform
/// has one
#[derive(Debug, Clone, Copy, Default)]
pub struct SharedLib;

impl ArtifactStrategy for SharedLib {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::SharedLib
    }

    fn outputs(
        &self,
        target: &TargetSpec,
        config: &ResolvedConfig,
        layout: &BuildLayout,
    ) -> BuildResult<ArtifactOutputs> {
        let patterns = &config.patterns;
        let name = patterns.shared_lib_name(&target.name, target.version.as_deref())?;
        let import_lib = patterns
            .import_lib_name(&target.name)?
            .map(|name| layout.lib_dir().join(name));

        Ok(ArtifactOutputs {
            primary: layout.bin_dir().join(name),
            import_lib,
        })
    }

    fn command(
        &self,
        objects: &[PathBuf],
        outputs: &ArtifactOutputs,
        config: &ResolvedConfig,
    ) -> BuildResult<String> {
        LinkCommand::new(Role::Shlink, objects.to_vec(), &outputs.primary)
            .with_import_lib(outputs.import_lib.clone())
            .with_std_libs(self.std_libs(config))
            .render(config.role(Role::Shlink), &config.patterns)
    }
}

/// Executable program
#[derive(Debug, Clone, Copy, Default)]
pub struct Program;

impl ArtifactStrategy for Program {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Program
    }

    fn outputs(
        &self,
        target: &TargetSpec,
        config: &ResolvedConfig,
        layout: &BuildLayout,
    ) -> BuildResult<ArtifactOutputs> {
        let name = config.patterns.program_name(&target.name)?;
        Ok(ArtifactOutputs {
            primary: layout.bin_dir().join(name),
            import_lib: None,
        })
    }

    fn command(
        &self,
        objects: &[PathBuf],
        outputs: &ArtifactOutputs,
        config: &ResolvedConfig,
    ) -> BuildResult<String> {
        LinkCommand::new(Role::Link, objects.to_vec(), &outputs.primary)
            .with_std_libs(self.std_libs(config))
            .render(config.role(Role::Link), &config.patterns)
    }
}

/// Strategy for an artifact kind
pub fn strategy_for(kind: ArtifactKind) -> &'static dyn ArtifactStrategy {
    match kind {
        ArtifactKind::StaticLib => &StaticLib,
        ArtifactKind::SharedLib => &SharedLib,
        ArtifactKind::Program => &Program,
    }
}

fn remove_if_exists(path: &Path) -> BuildResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BuildError::io(path, e)),
    }
}
