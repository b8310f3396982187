/// Build directory layout and object naming
use crate::log::LOG_FILE_NAME;
use std::path::{Component, Path, PathBuf};

/// Where build outputs live under the build directory
///
/// ```text
/// <build>/obj/<target>/   object files, one directory per target
/// <build>/lib/            static and import libraries
/// <build>/bin/            shared libraries and programs
/// <build>/build.log       command log
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    root: PathBuf,
}

impl BuildLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Object directory of one target
    pub fn obj_dir(&self, target: &str) -> PathBuf {
        self.root.join("obj").join(target)
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.root.join("lib")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.join(LOG_FILE_NAME)
    }
}

/// Object file name for a source path relative to the project root
///
/// The whole relative path and the source extension are kept, so
/// `src/util.c`, `test/util.c` and `src/util.cpp` map to `src_util.c.o`,
/// `test_util.c.o` and `src_util.cpp.o`. Underscores inside a component are
/// doubled so `src_x.c` (`src__x.c.o`) never meets `src/x.c` (`src_x.c.o`).
pub fn object_name(source: &Path, object_ext: &str) -> String {
    let parts: Vec<String> = source
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().replace('_', "__")),
            Component::ParentDir => Some("up".to_string()),
            _ => None,
        })
        .collect();
    format!("{}.{}", parts.join("_"), object_ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_layout_paths() {
        let layout = BuildLayout::new("build");
        assert_eq!(layout.obj_dir("mathlib"), PathBuf::from("build/obj/mathlib"));
        assert_eq!(layout.lib_dir(), PathBuf::from("build/lib"));
        assert_eq!(layout.bin_dir(), PathBuf::from("build/bin"));
        assert_eq!(layout.log_path(), PathBuf::from("build/build.log"));
    }

    #[rstest]
    #[case("a.c", "o", "a.c.o")]
    #[case("lib/a.c", "o", "lib_a.c.o")]
    #[case("src/util.cpp", "obj", "src_util.cpp.obj")]
    #[case("./src/x.y.c", "o", "src_x.y.c.o")]
    #[case("../shared/z.c", "o", "up_shared_z.c.o")]
    #[case("src_x.c", "o", "src__x.c.o")]
    fn test_object_name(#[case] source: &str, #[case] ext: &str, #[case] expected: &str) {
        assert_eq!(object_name(Path::new(source), ext), expected);
    }

    #[test]
    fn test_same_file_name_in_different_dirs_does_not_collide() {
        assert_ne!(
            object_name(Path::new("src/util.c"), "o"),
            object_name(Path::new("test/util.c"), "o")
        );
    }

    #[rstest]
    #[case("util.c", "util.cpp")]
    #[case("src/x.c", "src_x.c")]
    #[case("a/b_c.c", "a_b/c.c")]
    fn test_distinct_sources_get_distinct_objects(#[case] left: &str, #[case] right: &str) {
        assert_ne!(
            object_name(Path::new(left), "o"),
            object_name(Path::new(right), "o")
        );
    }
}
