/// Documentation generation through an external tool
use crate::command::shell_quote;
use crate::error::{BuildError, BuildResult};
use crate::process::ProcessRunner;
use kiln_config::{DocsConfig, Vars};
use std::path::{Path, PathBuf};

/// Command template for the generator
pub const DOCS_TEMPLATE: &str = "${PROGRAM} ${CONFIG}";

/// Runs `<generator> <config-file>` from the project root
#[derive(Debug, Clone)]
pub struct DocsGenerator {
    generator: String,
    config: PathBuf,
}

impl DocsGenerator {
    pub fn new(generator: impl Into<String>, config: impl Into<PathBuf>) -> Self {
        Self {
            generator: generator.into(),
            config: config.into(),
        }
    }

    /// Generator described by the project's `[docs]` table
    pub fn from_config(docs: &DocsConfig) -> Self {
        Self::new(docs.generator.clone(), docs.config.clone())
    }

    /// Rendered command line
    pub fn command(&self) -> BuildResult<String> {
        let vars = Vars::new()
            .with("PROGRAM", shell_quote(&self.generator))
            .with("CONFIG", shell_quote(&self.config.to_string_lossy()));
        Ok(kiln_config::template::render(DOCS_TEMPLATE, &vars)?)
    }

    /// Run the generator in `root`
    pub fn run(&self, runner: &ProcessRunner, root: &Path) -> BuildResult<()> {
        let config = root.join(&self.config);
        if !config.is_file() {
            return Err(BuildError::io(
                config,
                std::io::Error::from(std::io::ErrorKind::NotFound),
            ));
        }

        let command = self.command()?;
        tracing::info!(generator = %self.generator, "generating documentation");
        let output = runner.run(&command, root)?;
        if output.success() {
            Ok(())
        } else {
            Err(BuildError::DocsFailed {
                diagnostics: output.diagnostics(),
            })
        }
    }
}
