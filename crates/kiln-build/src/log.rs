//! Append-only build log
//!
//! Every command line kiln runs is written to `<build-dir>/build.log`
//! together with its exit status and captured output.

use crate::error::{BuildError, BuildResult};
use crate::process::ProcessOutput;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// File name of the log inside the build directory
pub const LOG_FILE_NAME: &str = "build.log";

/// Shared, mutex-guarded log file
#[derive(Debug)]
pub struct BuildLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl BuildLog {
    /// Open (or create) the log for appending
    pub fn open(path: impl Into<PathBuf>) -> BuildResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| BuildError::io(&path, e))?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Open the log inside a build directory
    pub fn in_build_dir(build_dir: &Path) -> BuildResult<Self> {
        Self::open(build_dir.join(LOG_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a finished command
    pub fn record(&self, command: &str, output: &ProcessOutput) {
        let mut entry = format!("$ {}\n", command);
        entry.push_str(&format!(
            "# {} in {} ms\n",
            output.status_text(),
            output.duration.as_millis()
        ));
        for stream in [&output.stdout, &output.stderr] {
            if !stream.is_empty() {
                entry.push_str(stream);
                if !stream.ends_with('\n') {
                    entry.push('\n');
                }
            }
        }
        self.append(&entry);
    }

    /// Record a command that could not be started
    pub fn record_spawn_failure(&self, command: &str, error: &std::io::Error) {
        self.append(&format!("$ {}\n# failed to start: {}\n", command, error));
    }

    fn append(&self, entry: &str) {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        // A log write failure must not fail the build
        if let Err(e) = file.write_all(entry.as_bytes()).and_then(|_| file.flush()) {
            tracing::warn!(path = %self.path.display(), error = %e, "could not write build log");
        }
    }
}
