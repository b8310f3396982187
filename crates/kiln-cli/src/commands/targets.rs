//! Targets command - list declared targets

use super::Location;
use anyhow::Result;

/// Run the targets command
pub fn run(location: &Location, json: bool) -> Result<()> {
    let ctx = location.open()?;
    let targets = &ctx.project.targets;

    if json {
        println!("{}", serde_json::to_string_pretty(targets)?);
        return Ok(());
    }

    if targets.is_empty() {
        println!("No targets declared in {}", kiln_config::PROJECT_FILE_NAME);
        return Ok(());
    }

    let width = targets.iter().map(|t| t.name.len()).max().unwrap_or(0);
    for target in targets {
        let version = target
            .version
            .as_deref()
            .map(|v| format!(" v{}", v))
            .unwrap_or_default();
        println!(
            "{:<width$}  {:<10}  {} source{}{}",
            target.name,
            target.kind.name(),
            target.sources.len(),
            if target.sources.len() == 1 { "" } else { "s" },
            version,
            width = width
        );
    }
    Ok(())
}
