use std::collections::BTreeSet;

use super::DiskSnapshot;
use crate::ext::HostPathExt;
use crate::storage::EntryKind;
use crate::tree::TreeIndex;

/// Paths to add and remove to bring the tree in line with a disk snapshot.
/// A path whose kind changed on disk appears in both sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    /// Sorted by ascending depth, so parents come before their children.
    pub to_add: Vec<(String, EntryKind)>,
    pub to_remove: BTreeSet<String>,
}

impl Diff {
    pub fn between(disk: &DiskSnapshot, tree: &TreeIndex) -> Self {
        let to_remove = tree
            .entries()
            .filter(|(path, kind)| disk.get(*path) != Some(kind))
            .map(|(path, _)| path.to_string())
            .collect();

        let mut to_add: Vec<_> = disk
            .iter()
            .filter(|(path, kind)| tree.lookup(path).map(|node| node.entry_kind()) != Some(**kind))
            .map(|(path, kind)| (path.clone(), *kind))
            .collect();
        to_add.sort_by(|(a, _), (b, _)| a.depth().cmp(&b.depth()).then_with(|| a.cmp(b)));

        Self { to_add, to_remove }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}
