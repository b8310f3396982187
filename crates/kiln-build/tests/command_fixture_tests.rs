//! Exact command lines per built-in profile
//!
//! Each profile is resolved against a directory of stand-in executables; the
//! directory prefix is stripped from program paths so the fixtures stay
//! stable.

#![cfg(unix)]

use kiln_build::{ArtifactStrategy, BuildLayout, CompileCommand, Program, SharedLib, StaticLib};
use kiln_config::{
    ArtifactKind, Compiler, ConfigResolver, Flavor, OptionSet, Platform, ResolvedConfig, Role,
    Selection, TargetSpec,
};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Profile {
    tools: TempDir,
    config: ResolvedConfig,
}

impl Profile {
    fn resolve(platform: Platform, compiler: Compiler, flavor: Flavor, programs: &[&str]) -> Self {
        let tools = TempDir::new().unwrap();
        for program in programs {
            let path = tools.path().join(program);
            fs::write(&path, "#!/bin/sh\n").unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }

        let config = ConfigResolver::new(Selection::new(platform, compiler, flavor))
            .with_search_path(tools.path().as_os_str())
            .with_working_dir(tools.path())
            .resolve()
            .unwrap();
        Self { tools, config }
    }

    fn strip(&self, line: String) -> String {
        line.replace(&format!("{}/", self.tools.path().display()), "")
    }

    fn compile(&self, source: &str) -> String {
        let source = Path::new(source);
        let role = kiln_build::compile_role(source).unwrap();
        let object = PathBuf::from("build/obj/m").join(kiln_build::object_name(source, &self.config.patterns.object_ext));
        let line = CompileCommand::new(role, source, object)
            .render(self.config.role(role), &self.config.patterns)
            .unwrap();
        self.strip(line)
    }

    fn artifact(&self, strategy: &dyn ArtifactStrategy, target: &TargetSpec, objects: &[&str]) -> String {
        let config = self.config.with_target_overrides(&target.options_for(self.config.platform));
        let outputs = strategy
            .outputs(target, &config, &BuildLayout::new("build"))
            .unwrap();
        let objects: Vec<PathBuf> = objects.iter().map(PathBuf::from).collect();
        self.strip(strategy.command(&objects, &outputs, &config).unwrap())
    }
}

#[test]
fn test_linux_gcc_debug() {
    let p = Profile::resolve(Platform::Linux, Compiler::Gcc, Flavor::Debug, &["gcc", "g++", "ar"]);

    insta::assert_snapshot!(
        p.compile("src/a.c"),
        @"gcc -fPIC -Wall -Wshadow -Wundef -O0 -g -DDEBUG -I. -c src/a.c -o build/obj/m/src_a.c.o"
    );
    insta::assert_snapshot!(
        p.compile("src/b.cpp"),
        @"g++ -fPIC -Wall -Wshadow -Wundef -O0 -g -Wnon-virtual-dtor -std=c++14 -DDEBUG -I. -c src/b.cpp -o build/obj/m/src_b.cpp.o"
    );

    let lib = TargetSpec::new("mathlib", ArtifactKind::StaticLib, ["a.c", "b.c"]);
    insta::assert_snapshot!(
        p.artifact(&StaticLib, &lib, &["a.o", "b.o"]),
        @"ar rcs build/lib/libmathlib.a a.o b.o"
    );

    let tool = TargetSpec::new("tool", ArtifactKind::Program, ["main.c"]).with_options(
        OptionSet::new().with_libs(["m"]).with_lib_paths(["build/lib"]),
    );
    insta::assert_snapshot!(
        p.artifact(&Program, &tool, &["main.o"]),
        @"g++ -o build/bin/tool main.o -Lbuild/lib -lm"
    );
}

#[test]
fn test_linux_clang_release_shared() {
    let p = Profile::resolve(
        Platform::Linux,
        Compiler::Clang,
        Flavor::Release,
        &["clang", "clang++", "ar"],
    );

    insta::assert_snapshot!(
        p.compile("codec.c"),
        @"clang -fPIC -Wall -Wshadow -Wundef -O2 -DNDEBUG -I. -c codec.c -o build/obj/m/codec.c.o"
    );

    let mut codec = TargetSpec::new("codec", ArtifactKind::SharedLib, ["codec.c"]);
    codec.version = Some("1.2.3".to_string());
    insta::assert_snapshot!(
        p.artifact(&SharedLib, &codec, &["codec.o"]),
        @"clang++ -shared -o build/bin/libcodec.so.1.2.3 codec.o"
    );
}

#[test]
fn test_darwin_clang_minsize() {
    let p = Profile::resolve(
        Platform::Darwin,
        Compiler::Clang,
        Flavor::MinSize,
        &["clang", "clang++", "libtool"],
    );

    insta::assert_snapshot!(
        p.compile("a.c"),
        @"clang -Wall -Wshadow -Wundef -Os -DNDEBUG -I. -c a.c -o build/obj/m/a.c.o"
    );

    let lib = TargetSpec::new("mathlib", ArtifactKind::StaticLib, ["a.c"]);
    insta::assert_snapshot!(
        p.artifact(&StaticLib, &lib, &["a.o"]),
        @"libtool -static -o build/lib/libmathlib.a a.o"
    );

    let mut codec = TargetSpec::new("codec", ArtifactKind::SharedLib, ["codec.c"]);
    codec.version = Some("2".to_string());
    insta::assert_snapshot!(
        p.artifact(&SharedLib, &codec, &["codec.o"]),
        @"clang++ -dynamiclib -o build/bin/libcodec.2.dylib codec.o"
    );
}

#[test]
fn test_windows_clang_cl_release() {
    let p = Profile::resolve(
        Platform::Windows,
        Compiler::ClangCl,
        Flavor::Release,
        &["clang-cl.exe", "llvm-lib.exe", "lld-link.exe"],
    );

    insta::assert_snapshot!(
        p.compile("src/a.c"),
        @"clang-cl.exe -nologo -W1 -MD -O2 -DUNICODE -D_UNICODE -DWIN32_LEAN_AND_MEAN -DWINVER=0x0A00 -D_WIN32_WINNT=0x0A00 -D_CRT_SECURE_NO_DEPRECATE -D_SCL_SECURE_NO_DEPRECATE -DNDEBUG -I. -c src/a.c -Fobuild/obj/m/src_a.c.obj"
    );

    let lib = TargetSpec::new("mathlib", ArtifactKind::StaticLib, ["a.c"]);
    insta::assert_snapshot!(
        p.artifact(&StaticLib, &lib, &["a.obj"]),
        @"llvm-lib.exe -nologo -out:build/lib/libmathlib.lib a.obj"
    );

    let codec = TargetSpec::new("codec", ArtifactKind::SharedLib, ["codec.c"]);
    insta::assert_snapshot!(
        p.artifact(&SharedLib, &codec, &["codec.obj"]),
        @"lld-link.exe -nologo -dll -out:build/bin/libcodec.dll -implib:build/lib/libcodec.dll.lib codec.obj kernel32.lib user32.lib gdi32.lib winspool.lib shell32.lib ole32.lib oleaut32.lib uuid.lib comdlg32.lib advapi32.lib"
    );
}

#[test]
fn test_windows_mingw_debug_program() {
    let p = Profile::resolve(
        Platform::Windows,
        Compiler::Gcc,
        Flavor::Debug,
        &["gcc.exe", "g++.exe", "ar.exe"],
    );

    let tool = TargetSpec::new("tool", ArtifactKind::Program, ["main.c"])
        .with_options(OptionSet::new().with_libs(["ws2_32"]));
    insta::assert_snapshot!(
        p.artifact(&Program, &tool, &["main.o"]),
        @"g++.exe -o build/bin/tool.exe main.o -lws2_32 -lkernel32 -luser32 -lgdi32 -lwinspool -lshell32 -lole32 -loleaut32 -luuid -lcomdlg32 -ladvapi32"
    );

    let codec = TargetSpec::new("codec", ArtifactKind::SharedLib, ["codec.c"]);
    insta::assert_snapshot!(
        p.artifact(&SharedLib, &codec, &["codec.o"]),
        @"g++.exe -shared -o build/bin/libcodec.dll -Wl,--out-implib,build/lib/libcodec.dll.a codec.o -lkernel32 -luser32 -lgdi32 -lwinspool -lshell32 -lole32 -loleaut32 -luuid -lcomdlg32 -ladvapi32"
    );
}

#[test]
fn test_every_role_template_uses_only_its_placeholders() {
    let p = Profile::resolve(Platform::Linux, Compiler::Gcc, Flavor::Debug, &["gcc", "g++", "ar"]);
    for role in Role::all() {
        let template = p.config.role(role).template().unwrap();
        template.check_allowed(role.placeholders()).unwrap();
    }
}
