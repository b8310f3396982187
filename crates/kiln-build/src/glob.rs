//! Path globs
//!
//! Patterns are relative, `/`-separated and support `*` and `?` within one
//! path segment and `**` for any number of segments. A trailing `/` restricts
//! matches to directories. Expansion walks only the literal prefix of the
//! pattern, so `build/**` never looks outside `build`.

use crate::error::{BuildError, BuildResult};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A parsed glob pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobPattern {
    pattern: String,
    /// Leading segments without wildcards
    base: PathBuf,
    /// Remaining segments, matched against paths below `base`
    segments: Vec<String>,
    dirs_only: bool,
}

fn has_wildcard(segment: &str) -> bool {
    segment.contains(['*', '?'])
}

impl GlobPattern {
    pub fn parse(pattern: &str) -> BuildResult<Self> {
        let invalid = |reason: &str| BuildError::InvalidGlob {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        let normalized = pattern.replace('\\', "/");
        if normalized.trim().is_empty() {
            return Err(invalid("pattern is empty"));
        }
        if normalized.starts_with('/') || Path::new(pattern).is_absolute() {
            return Err(invalid("pattern must be relative to the project root"));
        }

        let dirs_only = normalized.ends_with('/');
        let mut base = PathBuf::new();
        let mut segments = Vec::new();

        for segment in normalized.split('/').filter(|s| !s.is_empty() && *s != ".") {
            if segment == ".." {
                return Err(invalid("'..' is not allowed"));
            }
            if segment.contains("**") && segment != "**" {
                return Err(invalid("'**' must be a whole path segment"));
            }
            if segments.is_empty() && !has_wildcard(segment) {
                base.push(segment);
            } else {
                segments.push(segment.to_string());
            }
        }

        if base.as_os_str().is_empty() && segments.is_empty() {
            return Err(invalid("pattern matches the project root"));
        }

        Ok(Self {
            pattern: pattern.to_string(),
            base,
            segments,
            dirs_only,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn dirs_only(&self) -> bool {
        self.dirs_only
    }

    /// Check a path relative to the project root
    pub fn matches(&self, relative: &Path) -> bool {
        let Ok(rest) = relative.strip_prefix(&self.base) else {
            return false;
        };
        let parts: Vec<String> = rest
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
        match_segments(&self.segments, &parts)
    }

    /// Existing paths under `root` that match, sorted
    pub fn expand(&self, root: &Path) -> Vec<PathBuf> {
        let start = if self.base.as_os_str().is_empty() {
            root.to_path_buf()
        } else {
            root.join(&self.base)
        };
        if !start.exists() {
            return Vec::new();
        }

        let mut found: Vec<PathBuf> = WalkDir::new(&start)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|entry| !self.dirs_only || entry.file_type().is_dir())
            .filter(|entry| {
                entry
                    .path()
                    .strip_prefix(root)
                    .map(|relative| self.matches(relative))
                    .unwrap_or(false)
            })
            .map(|entry| entry.into_path())
            .collect();
        found.sort();
        found
    }
}

impl std::fmt::Display for GlobPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.pattern)
    }
}

fn match_segments(patterns: &[String], parts: &[&str]) -> bool {
    match patterns.split_first() {
        None => parts.is_empty(),
        Some((pattern, rest)) if pattern == "**" => {
            (0..=parts.len()).any(|skip| match_segments(rest, &parts[skip..]))
        }
        Some((pattern, rest)) => match parts.split_first() {
            Some((part, remaining)) => match_segment(pattern, part) && match_segments(rest, remaining),
            None => false,
        },
    }
}

/// Match one path segment against `*` and `?` wildcards
pub fn match_segment(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();

    let (mut p, mut n) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while n < name.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == name[n]) {
            p += 1;
            n += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, n));
            p += 1;
        } else if let Some((star_p, star_n)) = star {
            p = star_p + 1;
            n = star_n + 1;
            star = Some((star_p, star_n + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Expand several patterns, removing duplicates
pub fn expand_all(root: &Path, patterns: &[String]) -> BuildResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    for pattern in patterns {
        for path in GlobPattern::parse(pattern)?.expand(root) {
            if !found.contains(&path) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;

    #[rstest]
    #[case("*.o", "a.o", true)]
    #[case("*.o", "a.c", false)]
    #[case("a?.c", "ab.c", true)]
    #[case("a?.c", "a.c", false)]
    #[case("*", "", true)]
    #[case("lib*.a", "libmath.a", true)]
    #[case("*a*b", "xaxxb", true)]
    #[case("*a*b", "xaxxbc", false)]
    fn test_match_segment(#[case] pattern: &str, #[case] name: &str, #[case] expected: bool) {
        assert_eq!(match_segment(pattern, name), expected);
    }

    #[rstest]
    #[case("build/**", "build", true)]
    #[case("build/**", "build/obj/m/a.o", true)]
    #[case("build/**", "src/a.c", false)]
    #[case("**/*.o", "build/obj/a.o", true)]
    #[case("**/*.o", "a.o", true)]
    #[case("build/*/lib*.a", "build/lib/libm.a", true)]
    #[case("build/*/lib*.a", "build/lib/sub/libm.a", false)]
    fn test_matches(#[case] pattern: &str, #[case] path: &str, #[case] expected: bool) {
        assert_eq!(GlobPattern::parse(pattern).unwrap().matches(Path::new(path)), expected);
    }

    #[rstest]
    #[case("")]
    #[case("/etc/*")]
    #[case("../outside/*")]
    #[case("build/../../x")]
    #[case("a**/b")]
    #[case("./")]
    fn test_rejected_patterns(#[case] pattern: &str) {
        assert!(matches!(
            GlobPattern::parse(pattern),
            Err(BuildError::InvalidGlob { .. })
        ));
    }

    #[test]
    fn test_expand_files_and_dirs_only() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("build/obj/m")).unwrap();
        fs::write(root.join("build/obj/m/a.o"), "").unwrap();
        fs::write(root.join("build/obj/m/b.o"), "").unwrap();
        fs::write(root.join("build/build.log"), "").unwrap();

        let objects = GlobPattern::parse("build/obj/m/*.o").unwrap().expand(root);
        assert_eq!(
            objects,
            vec![root.join("build/obj/m/a.o"), root.join("build/obj/m/b.o")]
        );

        let dirs = GlobPattern::parse("build/*/").unwrap().expand(root);
        assert_eq!(dirs, vec![root.join("build/obj")]);

        assert!(GlobPattern::parse("missing/**").unwrap().expand(root).is_empty());
    }

    #[test]
    fn test_expand_all_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("x.tmp"), "").unwrap();
        let found = expand_all(dir.path(), &["*.tmp".to_string(), "x.*".to_string()]).unwrap();
        assert_eq!(found, vec![dir.path().join("x.tmp")]);
    }
}
