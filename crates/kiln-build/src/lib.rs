//! kiln build execution
//!
//! Turns a resolved configuration and a list of targets into compiler,
//! archiver and linker runs:
//! - Typed command builders per toolchain role
//! - Timestamp-based staleness checks for incremental rebuilds
//! - Shell process execution with an append-only build log
//! - Static library, shared library and program strategies
//! - Per-target orchestration with optional parallel compiles
//! - Library-dependency build order between targets
//! - Glob-based cleaning and documentation generation

pub mod artifact;
pub mod build_order;
pub mod clean;
pub mod command;
pub mod docs;
pub mod error;
pub mod glob;
pub mod layout;
pub mod log;
pub mod orchestrator;
pub mod process;
pub mod session;
pub mod staleness;

// Re-export main types
pub use artifact::{strategy_for, ArtifactOutputs, ArtifactStrategy, Program, SharedLib, StaticLib};
pub use build_order::TargetGraph;
pub use clean::{CleanReport, Cleaner};
pub use command::{ArchiveCommand, CompileCommand, LinkCommand};
pub use docs::DocsGenerator;
pub use error::{BuildError, BuildResult};
pub use glob::GlobPattern;
pub use layout::{object_name, BuildLayout};
pub use log::{BuildLog, LOG_FILE_NAME};
pub use orchestrator::{compile_role, CompileTask, TargetReport, TaskOrchestrator};
pub use process::{CommandRunner, ProcessOutput, ProcessRunner, ShellRunner};
pub use session::{select_targets, BuildSession, BuildSummary, TargetOutcome};
pub use staleness::Staleness;
