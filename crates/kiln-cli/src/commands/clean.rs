//! Clean command - remove build outputs by named glob groups

use super::{relative, Location};
use anyhow::{bail, Result};
use kiln_build::Cleaner;

/// Run the clean command
pub fn run(location: &Location, group: Option<&str>, dry_run: bool) -> Result<()> {
    let ctx = location.open()?;
    let build_dir = location.build_dir(&ctx);
    let groups = ctx.project.clean_groups(relative(&build_dir, &ctx.root));

    let patterns: Vec<String> = match group {
        Some(name) => match groups.group(name) {
            Some(globs) => globs.to_vec(),
            None => {
                let known: Vec<&str> = groups.names().collect();
                bail!("Unknown clean group '{}' (available: {})", name, known.join(", "));
            }
        },
        None => groups.groups.values().flatten().cloned().collect(),
    };

    let report = Cleaner::new(&ctx.root).with_dry_run(dry_run).clean(&patterns)?;

    let verb = if dry_run { "Would remove" } else { "Removed" };
    for path in &report.removed {
        println!("{} {}", verb, relative(path, &ctx.root).display());
    }
    if report.removed.is_empty() {
        println!("Nothing to clean");
    }
    Ok(())
}
