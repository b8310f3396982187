//! Incremental rebuild decisions
//!
//! A source is recompiled unless its object file exists and is at least as
//! new as the source. Included headers are not tracked.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

/// Why a source does or does not need compiling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staleness {
    /// Object exists and is not older than the source
    UpToDate,
    /// No object file yet
    MissingObject,
    /// Source modified after the object was written
    SourceNewer,
    /// A timestamp could not be read; rebuilding is the safe answer
    Unknown(String),
}

impl Staleness {
    pub fn needs_rebuild(&self) -> bool {
        !matches!(self, Self::UpToDate)
    }

    /// Short description for logs
    pub fn reason(&self) -> &str {
        match self {
            Self::UpToDate => "up to date",
            Self::MissingObject => "no object file",
            Self::SourceNewer => "source changed",
            Self::Unknown(reason) => reason,
        }
    }
}

fn modified(path: &Path) -> std::io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}

/// Compare the source and object timestamps
pub fn check(source: &Path, object: &Path) -> Staleness {
    let object_time = match modified(object) {
        Ok(time) => time,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Staleness::MissingObject,
        Err(e) => return Staleness::Unknown(format!("cannot read {}: {}", object.display(), e)),
    };

    let source_time = match modified(source) {
        Ok(time) => time,
        Err(e) => return Staleness::Unknown(format!("cannot read {}: {}", source.display(), e)),
    };

    if object_time >= source_time {
        Staleness::UpToDate
    } else {
        Staleness::SourceNewer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch(path: &Path, time: SystemTime) {
        let file = File::options().create(true).append(true).open(path).unwrap();
        file.set_modified(time).unwrap();
    }

    #[test]
    fn test_object_newer_than_source_is_up_to_date() {
        let dir = TempDir::new().unwrap();
        let (src, obj) = (dir.path().join("a.c"), dir.path().join("a.o"));
        let now = SystemTime::now();
        touch(&src, now - Duration::from_secs(60));
        touch(&obj, now);

        assert_eq!(check(&src, &obj), Staleness::UpToDate);
        assert!(!check(&src, &obj).needs_rebuild());
    }

    #[test]
    fn test_equal_timestamps_are_up_to_date() {
        let dir = TempDir::new().unwrap();
        let (src, obj) = (dir.path().join("a.c"), dir.path().join("a.o"));
        let now = SystemTime::now();
        touch(&src, now);
        touch(&obj, now);

        assert!(!check(&src, &obj).needs_rebuild());
    }

    #[test]
    fn test_source_newer_needs_rebuild() {
        let dir = TempDir::new().unwrap();
        let (src, obj) = (dir.path().join("a.c"), dir.path().join("a.o"));
        let now = SystemTime::now();
        touch(&obj, now - Duration::from_secs(60));
        touch(&src, now);

        assert_eq!(check(&src, &obj), Staleness::SourceNewer);
    }

    #[test]
    fn test_missing_object_needs_rebuild() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.c");
        touch(&src, SystemTime::now());

        assert_eq!(check(&src, &dir.path().join("a.o")), Staleness::MissingObject);
    }

    #[test]
    fn test_unreadable_source_needs_rebuild() {
        let dir = TempDir::new().unwrap();
        let obj = dir.path().join("a.o");
        touch(&obj, SystemTime::now());

        let staleness = check(&dir.path().join("gone.c"), &obj);
        assert!(matches!(staleness, Staleness::Unknown(_)));
        assert!(staleness.needs_rebuild());
    }
}
