//! Command and name templates
//!
//! Templates reference named values as `${NAME}`; `$$` produces a literal `$`.
//! Rendering is pure substitution: every referenced name must be supplied,
//! and a missing one is an error rather than an empty string.

use std::collections::BTreeMap;
use thiserror::Error;

/// Template parsing and rendering errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unresolved placeholder '${{{name}}}' in template \"{template}\"")]
    Unresolved { name: String, template: String },

    #[error("unterminated placeholder at offset {offset} in template \"{template}\"")]
    Unterminated { offset: usize, template: String },

    #[error("invalid placeholder name '{name}' in template \"{template}\"")]
    InvalidName { name: String, template: String },

    #[error("placeholder '${{{name}}}' is not available here (allowed: {allowed})")]
    NotAllowed { name: String, allowed: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

/// Values substituted into a template, keyed by placeholder name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vars {
    values: BTreeMap<String, String>,
}

impl Vars {
    /// Create an empty value map
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value (builder style)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Look up a value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Names of all supplied values
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl Template {
    /// Parse a template string
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(pos) = rest.find('$') {
            literal.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];

            if let Some(stripped) = after.strip_prefix('$') {
                literal.push('$');
                offset += pos + 2;
                rest = stripped;
                continue;
            }

            let Some(body) = after.strip_prefix('{') else {
                // A lone '$' is literal text (shell variables, `$ORIGIN`)
                literal.push('$');
                offset += pos + 1;
                rest = after;
                continue;
            };

            let Some(end) = body.find('}') else {
                return Err(TemplateError::Unterminated {
                    offset: offset + pos,
                    template: source.to_string(),
                });
            };

            let name = &body[..end];
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(TemplateError::InvalidName {
                    name: name.to_string(),
                    template: source.to_string(),
                });
            }

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Placeholder(name.to_string()));

            let consumed = pos + 2 + end + 1;
            offset += consumed;
            rest = &rest[consumed..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// The original template text
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Placeholder names in first-use order, without repeats
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Placeholder(name) = segment {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Check that the template only references names from `allowed`
    pub fn check_allowed(&self, allowed: &[&str]) -> Result<(), TemplateError> {
        for name in self.placeholders() {
            if !allowed.contains(&name) {
                return Err(TemplateError::NotAllowed {
                    name: name.to_string(),
                    allowed: allowed.join(", "),
                });
            }
        }
        Ok(())
    }

    /// Substitute every placeholder
    pub fn render(&self, vars: &Vars) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = vars.get(name).ok_or_else(|| TemplateError::Unresolved {
                        name: name.clone(),
                        template: self.source.clone(),
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

/// Parse and render in one step
pub fn render(template: &str, vars: &Vars) -> Result<String, TemplateError> {
    Template::parse(template)?.render(vars)
}

/// Render a one-value pattern such as `-I${VALUE}` or `lib${NAME}.a`
pub fn render_one(pattern: &str, name: &str, value: &str) -> Result<String, TemplateError> {
    render(pattern, &Vars::new().with(name, value))
}
