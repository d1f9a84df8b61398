use std::collections::BTreeSet;

use crate::ext::HostPathExt;

/// Paths committed to the tree during one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Added paths whose parent was not added in the same pass; redrawing
    /// these covers every addition.
    pub fn top_level_added(&self) -> impl Iterator<Item = &str> {
        top_level(&self.added)
    }

    pub fn top_level_removed(&self) -> impl Iterator<Item = &str> {
        top_level(&self.removed)
    }
}

fn top_level(paths: &BTreeSet<String>) -> impl Iterator<Item = &str> {
    paths
        .iter()
        .map(String::as_str)
        .filter(move |path| !paths.contains(path.parent_path()))
}
