//! Build command - compile and link the selected targets

use super::{relative, Location};
use anyhow::{bail, Context, Result};
use kiln_build::{select_targets, BuildSession, TargetOutcome};
use kiln_config::ArtifactKind;

/// Build command arguments
#[derive(Debug, Default)]
pub struct BuildArgs {
    /// Target names; empty means every target
    pub targets: Vec<String>,
    /// Only targets of this kind
    pub kind: Option<ArtifactKind>,
    /// Parallel compile jobs
    pub jobs: Option<usize>,
    /// JSON output
    pub json: bool,
}

/// Run the build command
pub fn run(location: &Location, args: BuildArgs) -> Result<()> {
    let ctx = location.open()?;
    let build_dir = location.build_dir(&ctx);
    let jobs = args.jobs.unwrap_or_else(|| ctx.default_jobs());

    let session = BuildSession::open(&ctx.root, &build_dir)?.with_jobs(jobs);
    let selected = select_targets(
        &ctx.project.targets,
        &args.targets,
        args.kind,
        session.config().platform,
    )?;
    if selected.is_empty() && !args.json {
        println!("No targets to build");
        return Ok(());
    }

    let summary = session.build(&selected);

    if args.json {
        println!("{}", summary.to_json().context("Failed to serialize the build summary")?);
    } else {
        for outcome in &summary.outcomes {
            match outcome {
                TargetOutcome::Built(report) => {
                    let artifacts: Vec<String> = report
                        .artifacts
                        .iter()
                        .map(|p| relative(p, &ctx.root).display().to_string())
                        .collect();
                    println!(
                        "   Built {} ({}): {} compiled, {} up to date -> {}",
                        report.name,
                        report.kind,
                        report.compiled,
                        report.up_to_date,
                        artifacts.join(", ")
                    );
                }
                TargetOutcome::Failed { name, error, .. } => {
                    eprintln!("  Failed {}: {}", name, error);
                }
            }
        }
        println!("Finished in {:.2}s", summary.duration.as_secs_f64());
    }

    if !summary.is_success() {
        let failed: Vec<&str> = summary.failed().map(TargetOutcome::name).collect();
        bail!(
            "{} of {} targets failed: {}",
            failed.len(),
            summary.outcomes.len(),
            failed.join(", ")
        );
    }
    Ok(())
}
