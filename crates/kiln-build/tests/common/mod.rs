//! Shared helpers for kiln-build integration tests

#![allow(dead_code)]

use kiln_build::{BuildLayout, BuildResult, CommandRunner, ProcessOutput, ProcessRunner, TaskOrchestrator};
use kiln_config::{
    Compiler, Flavor, InstallDirs, NamingPatterns, OptionSet, Platform, Product, ResolvedConfig,
    ResolvedRole, SCHEMA_VERSION,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn role(program: &str, template: &str) -> ResolvedRole {
    ResolvedRole {
        program: program.to_string(),
        template: template.to_string(),
        options: OptionSet::new(),
        std_libs: Vec::new(),
    }
}

/// Minimal GNU-style configuration with bare program names
pub fn gnu_config() -> ResolvedConfig {
    ResolvedConfig {
        schema: SCHEMA_VERSION,
        platform: Platform::Linux,
        compiler: Compiler::Gcc,
        flavor: Flavor::Debug,
        product: Product {
            name: "demo".to_string(),
            version: "0.1.0".to_string(),
        },
        build_dir: PathBuf::from("build"),
        install: InstallDirs {
            prefix: PathBuf::from("/usr/local"),
            bindir: PathBuf::from("/usr/local/bin"),
            libdir: PathBuf::from("/usr/local/lib"),
            includedir: PathBuf::from("/usr/local/include"),
            docdir: PathBuf::from("/usr/local/share/doc/demo"),
        },
        cc: role("cc", "${PROGRAM} ${FLAGS} ${DEFINES} -c ${SRC} -o ${OUT}"),
        cxx: role("c++", "${PROGRAM} ${FLAGS} ${DEFINES} -c ${SRC} -o ${OUT}"),
        ar: role("ar", "${PROGRAM} rcs ${OUT} ${OBJS}"),
        shlink: role("c++", "${PROGRAM} -shared -o ${OUT} ${OBJS} ${LIBPATHS} ${LIBS}"),
        link: role("c++", "${PROGRAM} -o ${OUT} ${OBJS} ${LIBPATHS} ${LIBS}"),
        patterns: NamingPatterns {
            static_lib: "lib${NAME}.a".to_string(),
            shared_lib: "lib${NAME}.so".to_string(),
            shared_lib_versioned: Some("lib${NAME}.so.${VERSION}".to_string()),
            import_lib: None,
            program: "${NAME}".to_string(),
            object_ext: "o".to_string(),
            object_glob: "*.o".to_string(),
            define: "-D${VALUE}".to_string(),
            include: "-I${VALUE}".to_string(),
            lib: "-l${VALUE}".to_string(),
            lib_path: "-L${VALUE}".to_string(),
        },
    }
}

/// Create a scratch project with the given files
pub fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (path, content) in files {
        let full = dir.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }
    dir
}

/// Set a file's modification time
pub fn set_mtime(path: &Path, time: SystemTime) {
    let file = fs::File::options().append(true).open(path).unwrap();
    file.set_modified(time).unwrap();
}

/// Move a file's modification time into the future
pub fn touch_later(path: &Path, seconds: u64) {
    set_mtime(path, SystemTime::now() + Duration::from_secs(seconds));
}

/// Move a file's modification time into the past
pub fn age(path: &Path, seconds: u64) {
    set_mtime(path, SystemTime::now() - Duration::from_secs(seconds));
}

/// Records every command and pretends to be a GNU toolchain
///
/// Successful commands create the file named after `-o` (or after `rcs` for
/// the archiver). Commands containing `fail_on` exit with status 1.
#[derive(Debug, Default)]
pub struct FakeToolchain {
    commands: Mutex<Vec<String>>,
    fail_on: Option<String>,
}

impl FakeToolchain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on(needle: &str) -> Arc<Self> {
        Arc::new(Self {
            commands: Mutex::new(Vec::new()),
            fail_on: Some(needle.to_string()),
        })
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    /// Commands run by the compiler roles
    pub fn compiles(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|c| c.contains(" -c "))
            .collect()
    }

    pub fn clear(&self) {
        self.commands.lock().unwrap().clear();
    }
}

impl CommandRunner for FakeToolchain {
    fn run(&self, command: &str, _cwd: &Path) -> BuildResult<ProcessOutput> {
        self.commands.lock().unwrap().push(command.to_string());

        if let Some(needle) = &self.fail_on {
            if command.contains(needle.as_str()) {
                return Ok(ProcessOutput::failure(1, format!("{}: error: expected ';'", needle.trim())));
            }
        }

        let words: Vec<&str> = command.split_whitespace().collect();
        let output = match words.iter().position(|w| *w == "-o" || *w == "rcs") {
            Some(i) => words[i + 1],
            None => return Ok(ProcessOutput::failure(2, "no output path")),
        };
        fs::write(output, command).unwrap();
        Ok(ProcessOutput::success_empty())
    }
}

/// Orchestrator over `root` whose build directory is `<root>/build`
pub fn orchestrator(root: &Path, config: ResolvedConfig, runner: Arc<FakeToolchain>) -> TaskOrchestrator {
    TaskOrchestrator::new(
        root,
        Arc::new(config),
        BuildLayout::new(root.join("build")),
        ProcessRunner::with_runner(runner),
    )
}
