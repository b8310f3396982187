//! Target build order from library dependencies
//!
//! A target depends on every declared library target named in its `libs`
//! (for the configured platform). Libraries are built before the targets
//! linking them; independent targets keep their declaration order.

use crate::error::{BuildError, BuildResult};
use kiln_config::{ArtifactKind, Platform, TargetSpec};
use std::collections::HashSet;

/// Library dependencies between a set of targets
#[derive(Debug, Clone)]
pub struct TargetGraph<'a> {
    targets: Vec<&'a TargetSpec>,
    platform: Platform,
}

impl<'a> TargetGraph<'a> {
    /// Graph over `targets`, in declaration order
    pub fn new(targets: impl IntoIterator<Item = &'a TargetSpec>, platform: Platform) -> Self {
        Self {
            targets: targets.into_iter().collect(),
            platform,
        }
    }

    pub fn targets(&self) -> &[&'a TargetSpec] {
        &self.targets
    }

    /// Library targets of this graph that `target` links against
    ///
    /// Names that match no library target are system libraries. A target
    /// never depends on itself.
    pub fn dependencies(&self, target: &TargetSpec) -> Vec<&'a TargetSpec> {
        let libs = target.options_for(self.platform).libs;
        self.targets
            .iter()
            .copied()
            .filter(|t| t.name != target.name)
            .filter(|t| matches!(t.kind, ArtifactKind::StaticLib | ArtifactKind::SharedLib))
            .filter(|t| libs.contains(&t.name))
            .collect()
    }

    /// `roots` plus everything they depend on, in declaration order
    pub fn closure(&self, roots: &[&TargetSpec]) -> Vec<&'a TargetSpec> {
        let mut wanted: HashSet<&str> = HashSet::new();
        let mut pending: Vec<&TargetSpec> = roots.to_vec();

        while let Some(target) = pending.pop() {
            if !wanted.insert(target.name.as_str()) {
                continue;
            }
            pending.extend(self.dependencies(target));
        }

        self.targets
            .iter()
            .copied()
            .filter(|t| wanted.contains(t.name.as_str()))
            .collect()
    }

    /// Order `selected` so every target follows the libraries it links
    ///
    /// Each step takes the first target in declaration order whose
    /// dependencies are already placed. Dependencies outside `selected` are
    /// treated as already built.
    pub fn order(&self, selected: &[&'a TargetSpec]) -> BuildResult<Vec<&'a TargetSpec>> {
        let in_set: HashSet<&str> = selected.iter().map(|t| t.name.as_str()).collect();
        let mut placed: HashSet<&str> = HashSet::new();
        let mut remaining: Vec<&'a TargetSpec> = selected.to_vec();
        let mut ordered = Vec::with_capacity(selected.len());

        while !remaining.is_empty() {
            let ready = remaining.iter().position(|t| {
                self.dependencies(t)
                    .iter()
                    .all(|d| placed.contains(d.name.as_str()) || !in_set.contains(d.name.as_str()))
            });

            match ready {
                Some(index) => {
                    let target = remaining.remove(index);
                    placed.insert(target.name.as_str());
                    ordered.push(target);
                }
                None => {
                    let names: Vec<&str> = remaining.iter().map(|t| t.name.as_str()).collect();
                    return Err(BuildError::DependencyCycle(names.join(", ")));
                }
            }
        }

        Ok(ordered)
    }
}
