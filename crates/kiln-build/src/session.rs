//! Build sessions
//!
//! A [`BuildSession`] ties a project root to its persisted configuration,
//! output layout and command log, and builds a list of targets one after
//! another. A failing target does not stop the others; the summary records
//! every outcome.

use crate::build_order::TargetGraph;
use crate::error::{BuildError, BuildResult};
use crate::layout::BuildLayout;
use crate::log::BuildLog;
use crate::orchestrator::{TargetReport, TaskOrchestrator};
use crate::process::ProcessRunner;
use kiln_config::{ArtifactKind, ConfigCache, Platform, ResolvedConfig, TargetSpec};
use std::collections::HashSet;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Pick targets by name and kind, with the libraries they link, in build order
///
/// An empty `names` list selects every target. Unknown names are an error.
/// Library targets named in a selected target's `libs` on `platform` are
/// added even when the name or kind filter leaves them out.
pub fn select_targets<'a>(
    targets: &'a [TargetSpec],
    names: &[String],
    kind: Option<ArtifactKind>,
    platform: Platform,
) -> BuildResult<Vec<&'a TargetSpec>> {
    if let Some(unknown) = names.iter().find(|n| !targets.iter().any(|t| &t.name == *n)) {
        return Err(BuildError::target_not_found(unknown.as_str()));
    }

    let roots: Vec<&TargetSpec> = targets
        .iter()
        .filter(|t| names.is_empty() || names.contains(&t.name))
        .filter(|t| kind.map_or(true, |k| t.kind == k))
        .collect();

    let graph = TargetGraph::new(targets, platform);
    graph.order(&graph.closure(&roots))
}

fn serialize_error<S: Serializer>(error: &BuildError, serializer: S) -> Result<S::Ok, S::Error> {
    let mut state = serializer.serialize_struct("BuildError", 2)?;
    state.serialize_field("kind", error.kind())?;
    state.serialize_field("message", &error.to_string())?;
    state.end()
}

/// Outcome of one target
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum TargetOutcome {
    Built(TargetReport),
    Failed {
        name: String,
        kind: ArtifactKind,
        #[serde(serialize_with = "serialize_error")]
        error: BuildError,
    },
}

impl TargetOutcome {
    pub fn name(&self) -> &str {
        match self {
            Self::Built(report) => &report.name,
            Self::Failed { name, .. } => name,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Built(_))
    }

    pub fn error(&self) -> Option<&BuildError> {
        match self {
            Self::Built(_) => None,
            Self::Failed { error, .. } => Some(error),
        }
    }
}

/// Outcomes of a whole build, in build order
#[derive(Debug, Default, Serialize)]
pub struct BuildSummary {
    pub outcomes: Vec<TargetOutcome>,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

impl BuildSummary {
    /// True when every target built
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(TargetOutcome::is_success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &TargetOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn outcome(&self, name: &str) -> Option<&TargetOutcome> {
        self.outcomes.iter().find(|o| o.name() == name)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// A configured project ready to build
#[derive(Debug)]
pub struct BuildSession {
    root: PathBuf,
    config: Arc<ResolvedConfig>,
    layout: BuildLayout,
    runner: ProcessRunner,
    jobs: usize,
}

impl BuildSession {
    /// Open the configuration persisted in `<root>/<build_dir>` and log
    /// commands to its build log
    pub fn open(root: impl Into<PathBuf>, build_dir: &Path) -> BuildResult<Self> {
        let root = root.into();
        let layout = BuildLayout::new(root.join(build_dir));
        let config = ConfigCache::new(layout.root()).get()?;
        let log = BuildLog::open(layout.log_path())?;
        let runner = ProcessRunner::new().with_log(Arc::new(log));

        tracing::debug!(
            root = %root.display(),
            selection = %format!("{}-{} ({})", config.platform, config.compiler, config.flavor),
            "opened build session"
        );

        Ok(Self {
            root,
            config,
            layout,
            runner,
            jobs: 1,
        })
    }

    /// Session over an already loaded configuration
    pub fn new(root: impl Into<PathBuf>, config: Arc<ResolvedConfig>, layout: BuildLayout) -> Self {
        Self {
            root: root.into(),
            config,
            layout,
            runner: ProcessRunner::new(),
            jobs: 1,
        }
    }

    /// Replace the process runner
    pub fn with_runner(mut self, runner: ProcessRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn layout(&self) -> &BuildLayout {
        &self.layout
    }

    pub fn runner(&self) -> &ProcessRunner {
        &self.runner
    }

    pub fn orchestrator(&self) -> TaskOrchestrator {
        TaskOrchestrator::new(
            self.root.clone(),
            Arc::clone(&self.config),
            self.layout.clone(),
            self.runner.clone(),
        )
        .with_jobs(self.jobs)
    }

    /// Build `targets` in order; every target is attempted
    ///
    /// `targets` is expected in the order [`select_targets`] returns. A
    /// target whose library dependency failed is not built and fails with
    /// [`BuildError::DependencyFailed`].
    pub fn build(&self, targets: &[&TargetSpec]) -> BuildSummary {
        let start = Instant::now();
        let orchestrator = self.orchestrator();
        let graph = TargetGraph::new(targets.iter().copied(), self.config.platform);
        let mut failed: HashSet<&str> = HashSet::new();
        let mut summary = BuildSummary::default();

        for target in targets {
            let broken = graph
                .dependencies(target)
                .into_iter()
                .find(|d| failed.contains(d.name.as_str()));
            let result = match broken {
                Some(dependency) => Err(BuildError::DependencyFailed {
                    target: target.name.clone(),
                    dependency: dependency.name.clone(),
                }),
                None => orchestrator.build_target(target),
            };

            let outcome = match result {
                Ok(report) => {
                    tracing::info!(
                        target_name = %report.name,
                        compiled = report.compiled,
                        up_to_date = report.up_to_date,
                        "built"
                    );
                    TargetOutcome::Built(report)
                }
                Err(error) => {
                    tracing::warn!(target_name = %target.name, kind = error.kind(), "target failed");
                    failed.insert(target.name.as_str());
                    TargetOutcome::Failed {
                        name: target.name.clone(),
                        kind: target.kind,
                        error,
                    }
                }
            };
            summary.outcomes.push(outcome);
        }

        summary.duration = start.elapsed();
        summary
    }
}
