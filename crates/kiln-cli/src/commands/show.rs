//! Show-config command - print the stored build configuration

use super::Location;
use anyhow::{Context, Result};
use kiln_config::{ResolvedConfig, Role};

/// Run the show-config command
pub fn run(location: &Location, json: bool) -> Result<()> {
    let ctx = location.open()?;
    let build_path = ctx.build_path(&location.build_dir(&ctx));
    let config = ResolvedConfig::load_from_dir(&build_path)
        .context("Project is not configured (run `kiln configure` first)")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("{} {}", config.product.name, config.product.version);
    println!(
        "  selection   {}-{} ({})",
        config.platform, config.compiler, config.flavor
    );
    println!("  build dir   {}", config.build_dir.display());
    println!("  prefix      {}", config.install.prefix.display());
    println!("  bindir      {}", config.install.bindir.display());
    println!("  libdir      {}", config.install.libdir.display());
    println!("  includedir  {}", config.install.includedir.display());
    println!("  docdir      {}", config.install.docdir.display());

    for role in Role::all() {
        let settings = config.role(role);
        println!();
        println!("[{}] {}", role.name(), settings.program);
        println!("  template  {}", settings.template);
        let options = &settings.options;
        for (label, values) in [
            ("flags", &options.flags),
            ("cppflags", &options.cppflags),
            ("defines", &options.defines),
            ("includes", &options.includes),
            ("ldflags", &options.ldflags),
            ("lib paths", &options.lib_paths),
            ("libs", &options.libs),
            ("std libs", &settings.std_libs),
        ] {
            if !values.is_empty() {
                println!("  {:<9} {}", label, values.join(" "));
            }
        }
    }
    Ok(())
}
