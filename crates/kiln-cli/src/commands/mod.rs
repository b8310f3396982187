pub mod build;
pub mod clean;
pub mod configure;
pub mod docs;
pub mod show;
pub mod targets;

use anyhow::{Context, Result};
use kiln_config::{ProjectContext, PROJECT_FILE_NAME};
use std::env;
use std::path::{Path, PathBuf};

/// Where the project and its build directory are
#[derive(Debug, Clone, Default)]
pub struct Location {
    /// kiln.toml or the directory holding it
    pub project: Option<PathBuf>,
    /// Build directory override
    pub build_dir: Option<PathBuf>,
}

impl Location {
    /// Load the project, searching upward from the current directory by default
    pub fn open(&self) -> Result<ProjectContext> {
        match &self.project {
            Some(path) => {
                let file = if path.is_dir() {
                    path.join(PROJECT_FILE_NAME)
                } else {
                    path.clone()
                };
                ProjectContext::load(&file)
                    .with_context(|| format!("Failed to load {}", file.display()))
            }
            None => {
                let cwd = env::current_dir().context("Failed to read the current directory")?;
                ProjectContext::discover(&cwd).with_context(|| {
                    format!(
                        "No {} found in {} or any parent directory",
                        PROJECT_FILE_NAME,
                        cwd.display()
                    )
                })
            }
        }
    }

    /// Build directory of `ctx`, relative to its root unless absolute
    pub fn build_dir(&self, ctx: &ProjectContext) -> PathBuf {
        ctx.build_dir(self.build_dir.as_deref())
    }
}

/// Display a path relative to `root` when it lies inside it
pub fn relative<'a>(path: &'a Path, root: &Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}
