//! Typed command builders
//!
//! One builder per toolchain role shape. Each validates its inputs, formats
//! per-item switches (`-I<dir>`, `-D<name>`, library switches) through the
//! configured patterns, and fills the role template. Path values are quoted
//! for the shell when needed; user flags are passed through verbatim.

use crate::error::{BuildError, BuildResult};
use kiln_config::{NamingPatterns, ResolvedRole, Role, TemplateError, Vars};
use std::path::{Path, PathBuf};

/// Quote a value for the platform shell if it contains anything unusual
pub fn shell_quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value.chars().all(|c| {
            c.is_ascii_alphanumeric()
                || matches!(c, '_' | '-' | '.' | '/' | ':' | '=' | '+' | ',' | '@' | '%')
                || (cfg!(windows) && c == '\\')
        });
    if plain {
        return value.to_string();
    }

    if cfg!(windows) {
        format!("\"{}\"", value.replace('"', "\\\""))
    } else {
        format!("'{}'", value.replace('\'', "'\\''"))
    }
}

fn path_arg(path: &Path) -> String {
    shell_quote(&path.to_string_lossy())
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths.iter().map(|p| path_arg(p)).collect::<Vec<_>>().join(" ")
}

fn join_verbatim(values: &[String]) -> String {
    values.join(" ")
}

fn join_switches<F>(values: &[String], format: F) -> Result<String, TemplateError>
where
    F: Fn(&str) -> Result<String, TemplateError>,
{
    let rendered = values
        .iter()
        .map(|v| format(v).map(|s| shell_quote(&s)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rendered.join(" "))
}

/// Collapse runs of spaces left by empty placeholders, outside quotes
///
/// Inside double quotes a backslash escapes the next character, so `\"`
/// does not end the quoted span.
pub fn tidy(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut last_space = true;

    for c in line.chars() {
        match quote {
            Some(q) => {
                out.push(c);
                if escaped {
                    escaped = false;
                } else if q == '"' && c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
                last_space = false;
            }
            None if c == ' ' => {
                if !last_space {
                    out.push(c);
                }
                last_space = true;
            }
            None => {
                if c == '\'' || c == '"' {
                    quote = Some(c);
                }
                out.push(c);
                last_space = false;
            }
        }
    }

    out.trim_end().to_string()
}

fn render(role: Role, settings: &ResolvedRole, vars: &Vars) -> BuildResult<String> {
    let template = settings.template()?;
    template.check_allowed(role.placeholders())?;
    Ok(tidy(&template.render(vars)?))
}

fn base_vars(settings: &ResolvedRole) -> Vars {
    Vars::new().with("PROGRAM", shell_quote(&settings.program))
}

/// Compile one source file into one object file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileCommand {
    pub role: Role,
    pub source: PathBuf,
    pub object: PathBuf,
}

impl CompileCommand {
    pub fn new(role: Role, source: impl Into<PathBuf>, object: impl Into<PathBuf>) -> Self {
        Self {
            role,
            source: source.into(),
            object: object.into(),
        }
    }

    fn validate(&self) -> BuildResult<()> {
        if !self.role.is_compile() {
            return Err(BuildError::InvalidTarget(format!(
                "{} cannot compile {}",
                self.role,
                self.source.display()
            )));
        }
        if self.source.as_os_str().is_empty() || self.object.as_os_str().is_empty() {
            return Err(BuildError::InvalidTarget(
                "compile command needs a source and an object path".to_string(),
            ));
        }
        Ok(())
    }

    /// Placeholder values for the compile template
    pub fn vars(&self, settings: &ResolvedRole, patterns: &NamingPatterns) -> BuildResult<Vars> {
        self.validate()?;
        let options = &settings.options;
        Ok(base_vars(settings)
            .with("FLAGS", join_verbatim(&options.flags))
            .with("CPPFLAGS", join_verbatim(&options.cppflags))
            .with("DEFINES", join_switches(&options.defines, |d| patterns.define_switch(d))?)
            .with("INCLUDES", join_switches(&options.includes, |i| patterns.include_switch(i))?)
            .with("SRC", path_arg(&self.source))
            .with("OUT", path_arg(&self.object)))
    }

    /// Render the command line
    pub fn render(&self, settings: &ResolvedRole, patterns: &NamingPatterns) -> BuildResult<String> {
        let vars = self.vars(settings, patterns)?;
        render(self.role, settings, &vars)
    }
}

/// Archive object files into a static library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveCommand {
    pub objects: Vec<PathBuf>,
    pub output: PathBuf,
}

impl ArchiveCommand {
    pub fn new(objects: Vec<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            objects,
            output: output.into(),
        }
    }

    pub fn vars(&self, settings: &ResolvedRole) -> BuildResult<Vars> {
        if self.objects.is_empty() {
            return Err(BuildError::InvalidTarget(format!(
                "nothing to archive into {}",
                self.output.display()
            )));
        }
        Ok(base_vars(settings)
            .with("OBJS", join_paths(&self.objects))
            .with("OUT", path_arg(&self.output)))
    }

    pub fn render(&self, settings: &ResolvedRole) -> BuildResult<String> {
        let vars = self.vars(settings)?;
        render(Role::Ar, settings, &vars)
    }
}

/// Link object files into a shared library or program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCommand {
    pub role: Role,
    pub objects: Vec<PathBuf>,
    pub output: PathBuf,
    /// Import library written alongside a shared library
    pub import_lib: Option<PathBuf>,
    /// Libraries linked after the requested ones
    pub std_libs: Vec<String>,
}

impl LinkCommand {
    pub fn new(role: Role, objects: Vec<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            role,
            objects,
            output: output.into(),
            import_lib: None,
            std_libs: Vec::new(),
        }
    }

    pub fn with_import_lib(mut self, import_lib: Option<PathBuf>) -> Self {
        self.import_lib = import_lib;
        self
    }

    pub fn with_std_libs(mut self, std_libs: Vec<String>) -> Self {
        self.std_libs = std_libs;
        self
    }

    pub fn vars(&self, settings: &ResolvedRole, patterns: &NamingPatterns) -> BuildResult<Vars> {
        if !matches!(self.role, Role::Shlink | Role::Link) {
            return Err(BuildError::InvalidTarget(format!("{} does not link", self.role)));
        }
        if self.objects.is_empty() {
            return Err(BuildError::InvalidTarget(format!(
                "nothing to link into {}",
                self.output.display()
            )));
        }

        let options = &settings.options;
        let libs = kiln_config::options::merge_unique(&options.libs, &self.std_libs);

        let mut vars = base_vars(settings)
            .with("LDFLAGS", join_verbatim(&options.ldflags))
            .with("LIBPATHS", join_switches(&options.lib_paths, |p| patterns.lib_path_switch(p))?)
            .with("LIBS", join_switches(&libs, |l| patterns.lib_switch(l))?)
            .with("OBJS", join_paths(&self.objects))
            .with("OUT", path_arg(&self.output));
        if let Some(import_lib) = &self.import_lib {
            vars.set("IMPLIB", path_arg(import_lib));
        }
        Ok(vars)
    }

    pub fn render(&self, settings: &ResolvedRole, patterns: &NamingPatterns) -> BuildResult<String> {
        let vars = self.vars(settings, patterns)?;
        render(self.role, settings, &vars)
    }
}
