//! Docs command - run the documentation generator

use super::Location;
use anyhow::{Context, Result};
use kiln_build::{BuildLog, DocsGenerator, ProcessRunner};
use std::sync::Arc;

/// Run the docs command
pub fn run(location: &Location) -> Result<()> {
    let ctx = location.open()?;
    let docs = ctx
        .project
        .docs
        .as_ref()
        .context("kiln.toml has no [docs] table")?;

    let build_path = ctx.build_path(&location.build_dir(&ctx));
    let log = BuildLog::in_build_dir(&build_path)?;
    let runner = ProcessRunner::new().with_log(Arc::new(log));

    DocsGenerator::from_config(docs).run(&runner, &ctx.root)?;
    println!("Documentation generated with {}", docs.generator);
    Ok(())
}
