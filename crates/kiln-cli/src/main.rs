use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use kiln_config::{ArtifactKind, Compiler, Flavor, Platform};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

/// kiln: configure and build native C and C++ projects.
///
/// kiln resolves a toolchain configuration once (`kiln configure`), stores it
/// in the build directory, and then compiles and links the targets declared
/// in kiln.toml, recompiling only sources whose object files are out of date.
///
/// EXAMPLES:
///     kiln configure                         Configure for the host toolchain
///     kiln configure --flavor release        Optimized build
///     kiln build                             Build every target
///     kiln build mathlib -j 8                Build one target, 8 compile jobs
///     kiln clean                             Remove build outputs
///
/// ENVIRONMENT VARIABLES:
///     KILN_PLATFORM, KILN_COMPILER, KILN_FLAVOR   Selection defaults for configure
///     CC, CXX, AR, LD                             Toolchain programs for configure
///     CFLAGS, CXXFLAGS, CPPFLAGS, LDFLAGS         Extra flags for configure
///     KILN_BUILD_DIR                              Build directory
///     KILN_JSON                                   Set to 'true' for JSON output
///     KILN_LOG                                    Log filter (e.g. 'debug')
#[derive(Parser)]
#[command(name = "kiln")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to kiln.toml or its directory (default: search upward)
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    /// Build directory, relative to the project root
    #[arg(long, global = true, env = "KILN_BUILD_DIR")]
    build_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the toolchain and write the build configuration
    ///
    /// Layers the built-in defaults, the platform/compiler profile, the
    /// flavor, the environment and the project's [toolchain] table, locates
    /// every program and writes <build-dir>/kiln-config.json.
    ///
    /// EXAMPLES:
    ///     kiln configure
    ///     kiln configure --compiler gcc --flavor debugoptimized
    ///     kiln configure --platform windows --compiler clang-cl
    ///     kiln configure --prefix /opt/orion --libdir lib64
    Configure {
        /// Target platform (linux, darwin, freebsd, windows)
        #[arg(long)]
        platform: Option<Platform>,
        /// Compiler family (clang, gcc, clang-cl)
        #[arg(long)]
        compiler: Option<Compiler>,
        /// Build flavor (debug, debugoptimized, release, minsize)
        #[arg(long)]
        flavor: Option<Flavor>,
        /// Installation prefix
        #[arg(long)]
        prefix: Option<PathBuf>,
        /// Program directory (relative paths are under the prefix)
        #[arg(long)]
        bindir: Option<PathBuf>,
        /// Library directory
        #[arg(long)]
        libdir: Option<PathBuf>,
        /// Header directory
        #[arg(long)]
        includedir: Option<PathBuf>,
        /// Documentation directory
        #[arg(long)]
        docdir: Option<PathBuf>,
        /// Ignore CC, CXX, AR, LD and the *FLAGS variables
        #[arg(long)]
        no_env: bool,
    },

    /// Compile and link targets
    ///
    /// EXAMPLES:
    ///     kiln build
    ///     kiln build mathlib tool
    ///     kiln build --kind static-lib
    ///     kiln build -j 8 --json
    #[command(visible_alias = "b")]
    Build {
        /// Targets to build (default: all)
        targets: Vec<String>,
        /// Only build targets of this kind (static-lib, shared-lib, program)
        #[arg(long)]
        kind: Option<ArtifactKind>,
        /// Parallel compile jobs per target
        #[arg(long, short = 'j')]
        jobs: Option<usize>,
        /// Print the build summary as JSON
        #[arg(long, env = "KILN_JSON")]
        json: bool,
    },

    /// Remove build outputs
    ///
    /// Without a group every clean group in kiln.toml is removed; a project
    /// without [clean] groups removes the build directory.
    Clean {
        /// Clean group to remove
        group: Option<String>,
        /// List what would be removed
        #[arg(long)]
        dry_run: bool,
    },

    /// Run the documentation generator from [docs]
    Docs,

    /// List the targets declared in kiln.toml
    Targets {
        #[arg(long, env = "KILN_JSON")]
        json: bool,
    },

    /// Show the stored build configuration
    ShowConfig {
        #[arg(long, env = "KILN_JSON")]
        json: bool,
    },

    /// Generate shell completions
    ///
    /// EXAMPLES:
    ///     kiln completions bash > ~/.local/share/bash-completion/completions/kiln
    ///     kiln completions zsh > ~/.zfunc/_kiln
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(verbose: bool, quiet: bool) {
    // Explicit flags win over KILN_LOG
    let filter = if verbose {
        EnvFilter::new("debug")
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::try_from_env("KILN_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let location = commands::Location {
        project: cli.project,
        build_dir: cli.build_dir,
    };

    match cli.command {
        Commands::Configure {
            platform,
            compiler,
            flavor,
            prefix,
            bindir,
            libdir,
            includedir,
            docdir,
            no_env,
        } => {
            let args = commands::configure::ConfigureArgs {
                selection: kiln_config::SelectionRequest {
                    platform,
                    compiler,
                    flavor,
                },
                install: kiln_config::InstallOverrides {
                    prefix,
                    bindir,
                    libdir,
                    includedir,
                    docdir,
                },
                use_env: !no_env,
            };
            commands::configure::run(&location, args)?;
        }
        Commands::Build {
            targets,
            kind,
            jobs,
            json,
        } => {
            let args = commands::build::BuildArgs {
                targets,
                kind,
                jobs,
                json,
            };
            commands::build::run(&location, args)?;
        }
        Commands::Clean { group, dry_run } => {
            commands::clean::run(&location, group.as_deref(), dry_run)?;
        }
        Commands::Docs => {
            commands::docs::run(&location)?;
        }
        Commands::Targets { json } => {
            commands::targets::run(&location, json)?;
        }
        Commands::ShowConfig { json } => {
            commands::show::run(&location, json)?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_build_arguments() {
        let cli = Cli::parse_from(["kiln", "build", "mathlib", "tool", "-j", "4", "--kind", "static"]);
        match cli.command {
            Commands::Build {
                targets,
                kind,
                jobs,
                json,
            } => {
                assert_eq!(targets, vec!["mathlib", "tool"]);
                assert_eq!(kind, Some(ArtifactKind::StaticLib));
                assert_eq!(jobs, Some(4));
                assert!(!json);
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_configure_arguments() {
        let cli = Cli::parse_from([
            "kiln",
            "configure",
            "--platform",
            "windows",
            "--compiler",
            "msvc",
            "--flavor",
            "minsize",
            "--prefix",
            "/opt/orion",
        ]);
        match cli.command {
            Commands::Configure {
                platform,
                compiler,
                flavor,
                prefix,
                ..
            } => {
                assert_eq!(platform, Some(Platform::Windows));
                assert_eq!(compiler, Some(Compiler::ClangCl));
                assert_eq!(flavor, Some(Flavor::MinSize));
                assert_eq!(prefix, Some(PathBuf::from("/opt/orion")));
            }
            _ => panic!("Expected Configure command"),
        }
    }

    #[test]
    fn test_bad_flavor_is_rejected() {
        assert!(Cli::try_parse_from(["kiln", "configure", "--flavor", "fast"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["kiln", "build", "--build-dir", "out", "-v"]);
        assert_eq!(cli.build_dir, Some(PathBuf::from("out")));
        assert!(cli.verbose);
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["kiln", "-v", "-q", "build"]).is_err());
    }

    #[test]
    fn test_completions_bash() {
        let cli = Cli::parse_from(["kiln", "completions", "bash"]);
        match cli.command {
            Commands::Completions { shell } => assert_eq!(shell, Shell::Bash),
            _ => panic!("Expected Completions command"),
        }
    }
}
