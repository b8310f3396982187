//! Per-target compile and link orchestration
//!
//! Building one target runs in three steps:
//!
//! 1. **Plan**: check every source exists, derive its object path and decide
//!    whether it is stale. Compile commands are rendered here, so a broken
//!    template fails before anything runs.
//! 2. **Compile**: run the stale compiles in declaration order, or on a
//!    bounded worker pool when `jobs > 1`. The first failure stops further
//!    compiles and the target fails without linking.
//! 3. **Link**: collect every object in the target's object directory and
//!    run the archive or link step for the artifact kind.

use crate::artifact::strategy_for;
use crate::command::CompileCommand;
use crate::error::{BuildError, BuildResult};
use crate::glob::GlobPattern;
use crate::layout::{object_name, BuildLayout};
use crate::process::{ProcessOutput, ProcessRunner};
use crate::staleness::{self, Staleness};
use kiln_config::{ArtifactKind, ResolvedConfig, Role, TargetSpec};
use rayon::prelude::*;
use serde::{Serialize, Serializer};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Compiler role for a source file, chosen by extension
pub fn compile_role(source: &Path) -> BuildResult<Role> {
    match source.extension().and_then(|e| e.to_str()) {
        Some("c") => Ok(Role::Cc),
        Some("cc" | "cpp" | "cxx" | "c++" | "C") => Ok(Role::Cxx),
        _ => Err(BuildError::InvalidTarget(format!(
            "cannot tell the language of {} (expected .c, .cc, .cpp, .cxx, .c++ or .C)",
            source.display()
        ))),
    }
}

/// One source of a target and what to do with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileTask {
    /// Source path as declared, relative to the project root
    pub source: PathBuf,
    pub object: PathBuf,
    pub role: Role,
    pub command: String,
    pub staleness: Staleness,
}

impl CompileTask {
    pub fn is_stale(&self) -> bool {
        self.staleness.needs_rebuild()
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Result of a successful target build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetReport {
    pub name: String,
    pub kind: ArtifactKind,
    /// Sources compiled in this run
    pub compiled: usize,
    /// Sources skipped because their object was current
    pub up_to_date: usize,
    pub artifacts: Vec<PathBuf>,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

/// Builds targets against one resolved configuration
#[derive(Debug, Clone)]
pub struct TaskOrchestrator {
    root: PathBuf,
    config: Arc<ResolvedConfig>,
    layout: BuildLayout,
    runner: ProcessRunner,
    jobs: usize,
}

impl TaskOrchestrator {
    /// Orchestrator for the project at `root`; commands run in `root`
    pub fn new(
        root: impl Into<PathBuf>,
        config: Arc<ResolvedConfig>,
        layout: BuildLayout,
        runner: ProcessRunner,
    ) -> Self {
        Self {
            root: root.into(),
            config,
            layout,
            runner,
            jobs: 1,
        }
    }

    /// Compile up to `jobs` sources of a target at once
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    pub fn layout(&self) -> &BuildLayout {
        &self.layout
    }

    /// Configuration with the target's overrides applied
    pub fn target_config(&self, target: &TargetSpec) -> ResolvedConfig {
        let mut overrides = target.options_for(self.config.platform);
        let lib_dir = self.layout.lib_dir().to_string_lossy().into_owned();
        if !overrides.lib_paths.contains(&lib_dir) {
            overrides.lib_paths.push(lib_dir);
        }
        self.config.with_target_overrides(&overrides)
    }

    /// Work out what building `target` involves without running anything
    pub fn plan(&self, target: &TargetSpec, config: &ResolvedConfig) -> BuildResult<Vec<CompileTask>> {
        let obj_dir = self.layout.obj_dir(&target.name);
        let mut tasks = Vec::with_capacity(target.sources.len());

        for source in &target.sources {
            let source_path = self.root.join(source);
            if !source_path.is_file() {
                return Err(BuildError::source_not_found(&target.name, source));
            }

            let role = compile_role(source)?;
            let object = obj_dir.join(object_name(source, &config.patterns.object_ext));
            if let Some(other) = tasks.iter().find(|t: &&CompileTask| t.object == object) {
                return Err(BuildError::InvalidTarget(format!(
                    "{} and {} of target '{}' both compile to {}",
                    other.source.display(),
                    source.display(),
                    target.name,
                    object.display()
                )));
            }
            let command = CompileCommand::new(role, source, &object)
                .render(config.role(role), &config.patterns)?;
            let staleness = staleness::check(&source_path, &object);

            tasks.push(CompileTask {
                source: source.clone(),
                object,
                role,
                command,
                staleness,
            });
        }

        Ok(tasks)
    }

    /// Build one target
    pub fn build_target(&self, target: &TargetSpec) -> BuildResult<TargetReport> {
        let start = Instant::now();
        target.validate()?;

        let config = self.target_config(target);
        let obj_dir = self.layout.obj_dir(&target.name);
        fs::create_dir_all(&obj_dir).map_err(|e| BuildError::io(&obj_dir, e))?;

        let tasks = self.plan(target, &config)?;
        let stale: Vec<&CompileTask> = tasks.iter().filter(|t| t.is_stale()).collect();
        for task in tasks.iter().filter(|t| !t.is_stale()) {
            tracing::debug!(target_name = %target.name, source = %task.source.display(), "up to date");
        }

        if self.jobs > 1 && stale.len() > 1 {
            self.compile_parallel(&target.name, &stale)?;
        } else {
            self.compile_sequential(&target.name, &stale)?;
        }

        let artifacts = self.link(target, &config, &obj_dir)?;

        Ok(TargetReport {
            name: target.name.clone(),
            kind: target.kind,
            compiled: stale.len(),
            up_to_date: tasks.len() - stale.len(),
            artifacts,
            duration: start.elapsed(),
        })
    }

    fn compile_one(&self, target: &str, task: &CompileTask) -> BuildResult<ProcessOutput> {
        tracing::info!(
            target_name = target,
            source = %task.source.display(),
            reason = task.staleness.reason(),
            "compiling"
        );
        self.runner.run(&task.command, &self.root)
    }

    fn check_compile(target: &str, task: &CompileTask, output: ProcessOutput) -> BuildResult<()> {
        if output.success() {
            Ok(())
        } else {
            tracing::warn!(target_name = target, source = %task.source.display(), "compilation failed");
            Err(BuildError::compile_failed(target, &task.source, output.diagnostics()))
        }
    }

    fn compile_sequential(&self, target: &str, tasks: &[&CompileTask]) -> BuildResult<()> {
        for task in tasks {
            let output = self.compile_one(target, task)?;
            Self::check_compile(target, task, output)?;
        }
        Ok(())
    }

    fn compile_parallel(&self, target: &str, tasks: &[&CompileTask]) -> BuildResult<()> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| BuildError::Io(std::io::Error::other(e.to_string())))?;

        let abort = AtomicBool::new(false);
        let results: Vec<Option<BuildResult<ProcessOutput>>> = pool.install(|| {
            tasks
                .par_iter()
                .map(|task| {
                    // No new compiles after a failure; running ones finish
                    if abort.load(Ordering::SeqCst) {
                        return None;
                    }
                    let result = self.compile_one(target, task);
                    if !matches!(&result, Ok(output) if output.success()) {
                        abort.store(true, Ordering::SeqCst);
                    }
                    Some(result)
                })
                .collect()
        });

        // Report the first failure in declaration order
        for (task, result) in tasks.iter().zip(results) {
            if let Some(result) = result {
                Self::check_compile(target, task, result?)?;
            }
        }
        Ok(())
    }

    fn link(&self, target: &TargetSpec, config: &ResolvedConfig, obj_dir: &Path) -> BuildResult<Vec<PathBuf>> {
        let strategy = strategy_for(target.kind);
        let objects: Vec<PathBuf> = GlobPattern::parse(&config.patterns.object_glob)?
            .expand(obj_dir)
            .into_iter()
            .filter(|p| p.is_file())
            .collect();

        let outputs = strategy.outputs(target, config, &self.layout)?;
        let command = strategy.command(&objects, &outputs, config)?;
        strategy.prepare(&outputs)?;

        tracing::info!(
            target_name = %target.name,
            kind = %target.kind,
            output = %outputs.primary.display(),
            objects = objects.len(),
            "linking"
        );
        let output = self.runner.run(&command, &self.root)?;
        if !output.success() {
            tracing::warn!(target_name = %target.name, "{} step failed", target.kind);
            return Err(strategy.failure(&target.name, output.diagnostics()));
        }

        Ok(outputs.paths())
    }
}
