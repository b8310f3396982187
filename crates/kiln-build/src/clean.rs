/// Removal of build outputs by glob
use crate::error::{BuildError, BuildResult};
use crate::glob::expand_all;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Summary of one clean run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Paths that were removed, in removal order
    pub removed: Vec<PathBuf>,
}

/// Removes paths matching globs below a project root
#[derive(Debug, Clone)]
pub struct Cleaner {
    root: PathBuf,
    dry_run: bool,
}

impl Cleaner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dry_run: false,
        }
    }

    /// Report what would be removed without touching the filesystem
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Paths the patterns currently match
    pub fn matches(&self, patterns: &[String]) -> BuildResult<Vec<PathBuf>> {
        let mut paths = expand_all(&self.root, patterns)?;
        paths.retain(|p| p != &self.root);
        // Parents first so a removed directory covers its children
        paths.sort_by_key(|p| p.components().count());
        Ok(paths)
    }

    /// Remove every path the patterns match
    pub fn clean(&self, patterns: &[String]) -> BuildResult<CleanReport> {
        let mut report = CleanReport::default();

        for path in self.matches(patterns)? {
            if report.removed.iter().any(|removed| path.starts_with(removed)) {
                continue;
            }
            if self.dry_run {
                report.removed.push(path);
                continue;
            }
            if remove_path(&path)? {
                tracing::debug!(path = %path.display(), "removed");
                report.removed.push(path);
            }
        }

        Ok(report)
    }
}

/// Remove a file or directory tree; `false` if it was already gone
fn remove_path(path: &Path) -> BuildResult<bool> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(error) => {
            return Err(BuildError::CleanFailed {
                path: path.to_path_buf(),
                error,
            })
        }
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(error) => Err(BuildError::CleanFailed {
            path: path.to_path_buf(),
            error,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("build/obj/m")).unwrap();
        fs::create_dir_all(root.join("build/lib")).unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("build/obj/m/a.o"), "").unwrap();
        fs::write(root.join("build/lib/libm.a"), "").unwrap();
        fs::write(root.join("src/a.c"), "").unwrap();
        fs::write(root.join("notes.tmp"), "").unwrap();
        dir
    }

    #[test]
    fn test_clean_build_tree_keeps_sources() {
        let dir = project();
        let report = Cleaner::new(dir.path())
            .clean(&["build/**".to_string()])
            .unwrap();

        assert_eq!(report.removed, vec![dir.path().join("build")]);
        assert!(!dir.path().join("build").exists());
        assert!(dir.path().join("src/a.c").exists());
    }

    #[test]
    fn test_clean_selected_files() {
        let dir = project();
        let report = Cleaner::new(dir.path())
            .clean(&["**/*.o".to_string(), "*.tmp".to_string()])
            .unwrap();

        assert_eq!(report.removed.len(), 2);
        assert!(!dir.path().join("notes.tmp").exists());
        assert!(dir.path().join("build/lib/libm.a").exists());
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let dir = project();
        let report = Cleaner::new(dir.path())
            .with_dry_run(true)
            .clean(&["build/lib/*".to_string()])
            .unwrap();

        assert_eq!(report.removed, vec![dir.path().join("build/lib/libm.a")]);
        assert!(dir.path().join("build/lib/libm.a").exists());
    }

    #[test]
    fn test_nothing_to_clean_succeeds() {
        let dir = TempDir::new().unwrap();
        let report = Cleaner::new(dir.path()).clean(&["build/**".to_string()]).unwrap();
        assert!(report.removed.is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let dir = project();
        let err = Cleaner::new(dir.path())
            .clean(&["../*".to_string()])
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidGlob { .. }));
    }
}
