//! Configuration layers
//!
//! A [`ConfigLayer`] is one partial slice of the toolchain configuration:
//! common defaults, a platform/compiler profile, a flavor overlay, the
//! environment, or the project's `[toolchain]` tables. Layers are merged in
//! order; scalars are replaced by the later layer, option lists are appended
//! and deduplicated.

use crate::options::{merge_unique, OptionSet};
use crate::Role;
use serde::{Deserialize, Serialize};

/// Partial configuration for one toolchain role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleLayer {
    /// Program name or path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,

    /// Command template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    /// Default options
    #[serde(default, skip_serializing_if = "OptionSet::is_empty")]
    pub options: OptionSet,

    /// Libraries always linked by this role
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub std_libs: Vec<String>,
}

impl RoleLayer {
    /// Create a role layer with a program and template
    pub fn tool(program: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            program: Some(program.into()),
            template: Some(template.into()),
            ..Default::default()
        }
    }

    /// Create a role layer that only carries options
    pub fn with_options(options: OptionSet) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Set the always-linked libraries (builder style)
    pub fn with_std_libs<I, S>(mut self, libs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.std_libs.extend(libs.into_iter().map(Into::into));
        self
    }

    /// Merge `over` on top of `self`
    pub fn merge(&self, over: &RoleLayer) -> RoleLayer {
        RoleLayer {
            program: over.program.clone().or_else(|| self.program.clone()),
            template: over.template.clone().or_else(|| self.template.clone()),
            options: self.options.merge(&over.options),
            std_libs: merge_unique(&self.std_libs, &over.std_libs),
        }
    }

    /// Check whether the layer carries nothing
    pub fn is_empty(&self) -> bool {
        self.program.is_none()
            && self.template.is_none()
            && self.options.is_empty()
            && self.std_libs.is_empty()
    }
}

/// Partial naming and switch patterns
///
/// Artifact patterns use `${NAME}` (and `${VERSION}` for versioned shared
/// libraries); switch patterns use `${VALUE}`. An empty string disables an
/// optional pattern (`import_lib`, `shared_lib_versioned`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_lib: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_lib: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_lib_versioned: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_lib: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_ext: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_glob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub define: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lib: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lib_path: Option<String>,
}

macro_rules! last_wins {
    ($base:expr, $over:expr, $($field:ident),+ $(,)?) => {
        PatternLayer {
            $($field: $over.$field.clone().or_else(|| $base.$field.clone()),)+
        }
    };
}

impl PatternLayer {
    /// Merge `over` on top of `self`
    pub fn merge(&self, over: &PatternLayer) -> PatternLayer {
        last_wins!(
            self,
            over,
            static_lib,
            shared_lib,
            shared_lib_versioned,
            import_lib,
            program,
            object_ext,
            object_glob,
            define,
            include,
            lib,
            lib_path,
        )
    }

    /// Check whether the layer carries nothing
    pub fn is_empty(&self) -> bool {
        *self == PatternLayer::default()
    }
}

/// One layer of toolchain configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    #[serde(default, skip_serializing_if = "RoleLayer::is_empty")]
    pub cc: RoleLayer,
    #[serde(default, skip_serializing_if = "RoleLayer::is_empty")]
    pub cxx: RoleLayer,
    #[serde(default, skip_serializing_if = "RoleLayer::is_empty")]
    pub ar: RoleLayer,
    #[serde(default, skip_serializing_if = "RoleLayer::is_empty")]
    pub shlink: RoleLayer,
    #[serde(default, skip_serializing_if = "RoleLayer::is_empty")]
    pub link: RoleLayer,
    #[serde(default, skip_serializing_if = "PatternLayer::is_empty")]
    pub patterns: PatternLayer,
}

impl ConfigLayer {
    /// Create an empty layer
    pub fn new() -> Self {
        Self::default()
    }

    /// Access the layer for a role
    pub fn role(&self, role: Role) -> &RoleLayer {
        match role {
            Role::Cc => &self.cc,
            Role::Cxx => &self.cxx,
            Role::Ar => &self.ar,
            Role::Shlink => &self.shlink,
            Role::Link => &self.link,
        }
    }

    /// Mutable access to the layer for a role
    pub fn role_mut(&mut self, role: Role) -> &mut RoleLayer {
        match role {
            Role::Cc => &mut self.cc,
            Role::Cxx => &mut self.cxx,
            Role::Ar => &mut self.ar,
            Role::Shlink => &mut self.shlink,
            Role::Link => &mut self.link,
        }
    }

    /// Set the layer for a role (builder style)
    pub fn with_role(mut self, role: Role, layer: RoleLayer) -> Self {
        *self.role_mut(role) = layer;
        self
    }

    /// Set the pattern layer (builder style)
    pub fn with_patterns(mut self, patterns: PatternLayer) -> Self {
        self.patterns = patterns;
        self
    }

    /// Merge `over` on top of `self`
    pub fn merge(&self, over: &ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            cc: self.cc.merge(&over.cc),
            cxx: self.cxx.merge(&over.cxx),
            ar: self.ar.merge(&over.ar),
            shlink: self.shlink.merge(&over.shlink),
            link: self.link.merge(&over.link),
            patterns: self.patterns.merge(&over.patterns),
        }
    }

    /// Merge a sequence of layers, first to last
    pub fn stack<'a>(layers: impl IntoIterator<Item = &'a ConfigLayer>) -> ConfigLayer {
        layers
            .into_iter()
            .fold(ConfigLayer::new(), |acc, layer| acc.merge(layer))
    }

    /// Check whether the layer carries nothing
    pub fn is_empty(&self) -> bool {
        Role::all().iter().all(|r| self.role(*r).is_empty()) && self.patterns.is_empty()
    }
}
