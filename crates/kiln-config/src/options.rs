//! Toolchain option sets
//!
//! An [`OptionSet`] holds the array-valued options of one toolchain role.
//! Merging appends the more specific set and removes duplicates, keeping the
//! first occurrence of every value.

use serde::{Deserialize, Serialize};

/// Array-valued options for one toolchain role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionSet {
    /// Compiler flags (CFLAGS / CXXFLAGS)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,

    /// Preprocessor flags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cppflags: Vec<String>,

    /// Macro definitions, without the define switch (`NDEBUG`, `VERSION=2`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defines: Vec<String>,

    /// Include directories, without the include switch
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,

    /// Linker flags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ldflags: Vec<String>,

    /// Library search directories, without the search-path switch
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lib_paths: Vec<String>,

    /// Library names, without the link switch
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub libs: Vec<String>,
}

impl OptionSet {
    /// Create an empty option set
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a new set with `over` merged on top of `self`
    pub fn merge(&self, over: &OptionSet) -> OptionSet {
        OptionSet {
            flags: merge_unique(&self.flags, &over.flags),
            cppflags: merge_unique(&self.cppflags, &over.cppflags),
            defines: merge_unique(&self.defines, &over.defines),
            includes: merge_unique(&self.includes, &over.includes),
            ldflags: merge_unique(&self.ldflags, &over.ldflags),
            lib_paths: merge_unique(&self.lib_paths, &over.lib_paths),
            libs: merge_unique(&self.libs, &over.libs),
        }
    }

    /// Merge `over` into `self` in place
    pub fn merge_from(&mut self, over: &OptionSet) {
        *self = self.merge(over);
    }

    /// Check whether every list is empty
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
            && self.cppflags.is_empty()
            && self.defines.is_empty()
            && self.includes.is_empty()
            && self.ldflags.is_empty()
            && self.lib_paths.is_empty()
            && self.libs.is_empty()
    }

    /// Builder-style helper for flags
    pub fn with_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags.extend(flags.into_iter().map(Into::into));
        self
    }

    /// Builder-style helper for defines
    pub fn with_defines<I, S>(mut self, defines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.defines.extend(defines.into_iter().map(Into::into));
        self
    }

    /// Builder-style helper for include directories
    pub fn with_includes<I, S>(mut self, includes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes.extend(includes.into_iter().map(Into::into));
        self
    }

    /// Builder-style helper for linker flags
    pub fn with_ldflags<I, S>(mut self, ldflags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ldflags.extend(ldflags.into_iter().map(Into::into));
        self
    }

    /// Builder-style helper for libraries
    pub fn with_libs<I, S>(mut self, libs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.libs.extend(libs.into_iter().map(Into::into));
        self
    }

    /// Builder-style helper for library search directories
    pub fn with_lib_paths<I, S>(mut self, lib_paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lib_paths.extend(lib_paths.into_iter().map(Into::into));
        self
    }
}

/// Concatenate two lists and drop repeated values, keeping first-seen order
pub fn merge_unique(base: &[String], extra: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(base.len() + extra.len());
    for value in base.iter().chain(extra) {
        if !merged.contains(value) {
            merged.push(value.clone());
        }
    }
    merged
}
