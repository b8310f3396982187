//! Configure command - resolve the toolchain and persist it

use super::{relative, Location};
use anyhow::{Context, Result};
use kiln_config::{InstallOverrides, Role, SelectionRequest};

/// Configure command arguments
#[derive(Debug, Default)]
pub struct ConfigureArgs {
    /// Selection given on the command line
    pub selection: SelectionRequest,
    /// Install directory overrides
    pub install: InstallOverrides,
    /// Apply CC, CXX, AR, LD and the *FLAGS variables
    pub use_env: bool,
}

/// Run the configure command
pub fn run(location: &Location, args: ConfigureArgs) -> Result<()> {
    let ctx = location.open()?;
    let env = SelectionRequest::from_env().context("Invalid KILN_PLATFORM, KILN_COMPILER or KILN_FLAVOR")?;
    let selection = ctx.selection(args.selection, env);
    let build_dir = location.build_dir(&ctx);

    let mut resolver = ctx.resolver(selection, &build_dir, args.install);
    if args.use_env {
        resolver = resolver.with_process_env();
    }

    tracing::info!(%selection, "configuring");
    let config = resolver
        .resolve()
        .with_context(|| format!("Failed to configure for {}", selection))?;
    let path = config
        .save_to_dir(&ctx.build_path(&build_dir))
        .context("Failed to write the build configuration")?;

    println!(
        "Configured {} {} for {}",
        config.product.name, config.product.version, selection
    );
    for role in Role::all() {
        println!("  {:<7} {}", role.name(), config.role(role).program);
    }
    println!("  prefix  {}", config.install.prefix.display());
    println!("Wrote {}", relative(&path, &ctx.root).display());
    Ok(())
}
