//! Project file parsing and validation tests

use kiln_config::{
    ArtifactKind, Compiler, ConfigError, Flavor, Platform, ProjectFile, TargetSpec,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FULL_PROJECT: &str = r#"
[package]
name = "orion"
version = "2.1.0"
description = "Networking and math utilities"

[configure]
platform = "linux"
compiler = "gcc"
flavor = "release"
build-dir = "out"
prefix = "/opt/orion"

[toolchain.cc]
options = { flags = ["-fno-strict-aliasing"] }

[toolchain.link]
std_libs = ["pthread"]

[toolchain.patterns]
shared_lib_versioned = ""

[[target]]
name = "mathlib"
kind = "static-lib"
sources = ["lib/math/add.c", "lib/math/mul.c"]
options = { includes = ["include"] }

[[target]]
name = "orion"
kind = "shared-lib"
sources = ["lib/net/Url.cpp"]
version = "2.1"

[target.options]
defines = ["ORION_BUILD"]
libs = ["mathlib"]

[target.platform.linux]
libs = ["dl"]

[target.platform.windows]
libs = ["ws2_32"]

[[target]]
name = "orion-cli"
kind = "program"
sources = ["tools/cli.cpp"]

[docs]
config = "docs/Doxyfile"

[clean]
build = ["out/**"]
docs = ["docs/*/"]
"#;

fn write_project(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("kiln.toml");
    fs::write(&path, content).unwrap();
    path
}

fn project(targets: &str) -> String {
    format!(
        "[package]\nname = \"p\"\nversion = \"0.1.0\"\n{}",
        targets
    )
}

#[test]
fn test_parse_full_project() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_project(temp_dir.path(), FULL_PROJECT);
    let project = ProjectFile::load_from_file(&path).unwrap();

    assert_eq!(project.package.name, "orion");
    assert_eq!(project.configure.platform, Some(Platform::Linux));
    assert_eq!(project.configure.compiler, Some(Compiler::Gcc));
    assert_eq!(project.configure.flavor, Some(Flavor::Release));
    assert_eq!(project.configure.build_dir, Some(PathBuf::from("out")));

    assert_eq!(project.toolchain.cc.options.flags, vec!["-fno-strict-aliasing"]);
    assert_eq!(project.toolchain.link.std_libs, vec!["pthread"]);
    assert_eq!(project.toolchain.patterns.shared_lib_versioned.as_deref(), Some(""));

    let names: Vec<_> = project.targets.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["mathlib", "orion", "orion-cli"]);
    assert_eq!(project.targets[0].kind, ArtifactKind::StaticLib);
    assert_eq!(project.targets[1].version.as_deref(), Some("2.1"));

    let docs = project.docs.as_ref().unwrap();
    assert_eq!(docs.generator, "doxygen");
    assert_eq!(docs.config, PathBuf::from("docs/Doxyfile"));

    assert_eq!(project.clean.names().collect::<Vec<_>>(), vec!["build", "docs"]);
}

#[test]
fn test_platform_specific_target_options() {
    let project: ProjectFile = toml::from_str(FULL_PROJECT).unwrap();
    let orion = project.target("orion").unwrap();

    let linux = orion.options_for(Platform::Linux);
    assert_eq!(linux.libs, vec!["mathlib", "dl"]);
    assert_eq!(linux.defines, vec!["ORION_BUILD"]);

    let windows = orion.options_for(Platform::Windows);
    assert_eq!(windows.libs, vec!["mathlib", "ws2_32"]);

    let darwin = orion.options_for(Platform::Darwin);
    assert_eq!(darwin.libs, vec!["mathlib"]);
}

#[test]
fn test_clean_groups_default_to_build_dir() {
    let project: ProjectFile = toml::from_str(&project("")).unwrap();
    let groups = project.clean_groups(Path::new("build"));
    assert_eq!(groups.group("build"), Some(&["build/**".to_string()][..]));

    let full: ProjectFile = toml::from_str(FULL_PROJECT).unwrap();
    assert_eq!(full.clean_groups(Path::new("build")), full.clean);
}

#[rstest]
#[case::duplicate_target(
    "[[target]]\nname = \"a\"\nkind = \"program\"\nsources = [\"a.c\"]\n\
     [[target]]\nname = \"a\"\nkind = \"static-lib\"\nsources = [\"b.c\"]\n"
)]
#[case::no_sources("[[target]]\nname = \"a\"\nkind = \"program\"\nsources = []\n")]
#[case::version_on_static_lib(
    "[[target]]\nname = \"a\"\nkind = \"static-lib\"\nsources = [\"a.c\"]\nversion = \"1\"\n"
)]
#[case::bad_library_version(
    "[[target]]\nname = \"a\"\nkind = \"shared-lib\"\nsources = [\"a.c\"]\nversion = \"1.2.3.4\"\n"
)]
#[case::bad_target_name("[[target]]\nname = \"a/b\"\nkind = \"program\"\nsources = [\"a.c\"]\n")]
#[case::empty_clean_glob("[clean]\nbuild = [\"\"]\n")]
fn test_invalid_project_is_rejected(#[case] body: &str) {
    let temp_dir = TempDir::new().unwrap();
    let path = write_project(temp_dir.path(), &project(body));
    assert!(ProjectFile::load_from_file(&path).is_err());
}

#[rstest]
#[case::unknown_target_key("[[target]]\nname = \"a\"\nkind = \"program\"\nsources = [\"a.c\"]\nsrcs = []\n")]
#[case::unknown_kind("[[target]]\nname = \"a\"\nkind = \"dylib\"\nsources = [\"a.c\"]\n")]
#[case::unknown_role("[toolchain.fortran]\nprogram = \"gfortran\"\n")]
#[case::unknown_option("[toolchain.cc]\noptions = { cflags = [\"-g\"] }\n")]
#[case::unknown_platform("[[target]]\nname = \"a\"\nkind = \"program\"\nsources = [\"a.c\"]\n[target.platform.haiku]\nlibs = [\"be\"]\n")]
fn test_key_typos_fail_loudly(#[case] body: &str) {
    let temp_dir = TempDir::new().unwrap();
    let path = write_project(temp_dir.path(), &project(body));
    assert!(matches!(
        ProjectFile::load_from_file(&path).unwrap_err(),
        ConfigError::TomlParseError { .. }
    ));
}

#[test]
fn test_invalid_package_version() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_project(temp_dir.path(), "[package]\nname = \"p\"\nversion = \"one\"\n");
    assert!(matches!(
        ProjectFile::load_from_file(&path).unwrap_err(),
        ConfigError::InvalidVersion(_)
    ));
}

#[test]
fn test_missing_project_file() {
    let temp_dir = TempDir::new().unwrap();
    let err = ProjectFile::load_from_file(&temp_dir.path().join("kiln.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
}

#[test]
fn test_target_builder() {
    let target = TargetSpec::new("mathlib", ArtifactKind::StaticLib, ["a.c", "b.c"]);
    assert!(target.validate().is_ok());
    assert_eq!(target.sources, vec![PathBuf::from("a.c"), PathBuf::from("b.c")]);
    assert!(target.options_for(Platform::Linux).is_empty());
}
