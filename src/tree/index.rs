use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use snafu::prelude::*;
use tracing::debug;

use super::{Node, NodeData, NodeId, NodeKind};
use crate::ext::HostPathExt;
use crate::storage::EntryKind;

/// Flat path table plus the folder hierarchy built on top of it.
///
/// A path is in the table iff it is reachable from the tracked root through
/// `children`, and every node's `parent` names the folder that lists it.
#[derive(Debug, Clone)]
pub struct TreeIndex {
    root: String,
    nodes: HashMap<String, Node>,
    next_id: u64,
}

impl TreeIndex {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            nodes: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn root_path(&self) -> &str {
        &self.root
    }

    /// The tracked root node, absent while the root does not exist on disk.
    pub fn root(&self) -> Option<&Node> {
        self.nodes.get(&self.root)
    }

    pub fn lookup(&self, path: &str) -> Option<&Node> {
        self.nodes.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn all_paths(&self) -> BTreeSet<String> {
        self.nodes.keys().cloned().collect()
    }

    /// Every tracked path with its kind, straight from the flat table.
    pub fn entries(&self) -> impl Iterator<Item = (&str, EntryKind)> {
        self.nodes
            .iter()
            .map(|(path, node)| (path.as_str(), node.entry_kind()))
    }

    /// Children of a tracked folder in display order.
    pub fn children(&self, path: &str) -> Option<impl Iterator<Item = &Node>> {
        let node = self.nodes.get(path)?;
        Some(
            node.children()
                .iter()
                .filter_map(|child| self.nodes.get(child)),
        )
    }

    pub fn parent(&self, path: &str) -> Option<&Node> {
        let parent = self.nodes.get(path)?.parent()?;
        self.nodes.get(parent)
    }

    /// Registers a path under its already tracked parent, keeping the parent's
    /// children sorted. The tracked root is registered without a parent.
    pub fn insert(&mut self, path: &str, data: NodeData) -> Result<NodeId, TreeError> {
        ensure!(
            path.is_within(&self.root),
            OutsideRootSnafu {
                path,
                root: self.root.as_str(),
            }
        );
        ensure!(!self.nodes.contains_key(path), AlreadyTrackedSnafu { path });

        let name = path.file_name();
        let entry_kind = data.entry_kind();

        let parent = if path == self.root {
            ensure!(entry_kind == EntryKind::Folder, RootNotFolderSnafu { path });
            None
        } else {
            let parent_path = path.parent_path();
            let parent = self.nodes.get(parent_path).context(MissingParentSnafu {
                path,
                parent: parent_path,
            })?;
            let NodeKind::Folder { children } = &parent.kind else {
                return ParentNotFolderSnafu {
                    path,
                    parent: parent_path,
                }
                .fail();
            };
            let position = children.partition_point(|child_path| {
                self.nodes.get(child_path).is_some_and(|child| {
                    child_order(child.entry_kind(), child.name(), entry_kind, name).is_lt()
                })
            });
            Some((parent_path.to_string(), position))
        };

        if let Some((parent_path, position)) = &parent {
            if let Some(Node {
                kind: NodeKind::Folder { children },
                ..
            }) = self.nodes.get_mut(parent_path)
            {
                children.insert(*position, path.to_string());
            }
        }

        let id = NodeId(self.next_id);
        self.next_id += 1;

        let kind = match data {
            NodeData::Folder => NodeKind::Folder {
                children: Vec::new(),
            },
            NodeData::File(meta) => NodeKind::File(meta),
        };
        self.nodes.insert(
            path.to_string(),
            Node {
                id,
                path: path.to_string(),
                name: name.to_string(),
                parent: parent.map(|(parent_path, _)| parent_path),
                kind,
            },
        );
        debug!("Registered {} '{}' as {}", entry_kind, path, id);

        Ok(id)
    }

    /// Detaches a path from its parent and drops it from the table together
    /// with its whole subtree. Returns the removed paths, descendants first.
    pub fn remove(&mut self, path: &str) -> Result<Vec<String>, TreeError> {
        let node = self.nodes.get(path).context(NotTrackedSnafu { path })?;

        if let Some(parent_path) = node.parent.clone() {
            if let Some(Node {
                kind: NodeKind::Folder { children },
                ..
            }) = self.nodes.get_mut(&parent_path)
            {
                children.retain(|child| child != path);
            }
        }

        let mut removed = Vec::new();
        self.remove_subtree(path, &mut removed);
        debug!("Unregistered '{}' ({} paths)", path, removed.len());

        Ok(removed)
    }

    /// Drops every node. Ids keep counting so they are never reused.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    fn remove_subtree(&mut self, path: &str, removed: &mut Vec<String>) {
        let children = self
            .nodes
            .get(path)
            .map(|node| node.children().to_vec())
            .unwrap_or_default();
        for child in children {
            self.remove_subtree(&child, removed);
        }
        if self.nodes.remove(path).is_some() {
            removed.push(path.to_string());
        }
    }

    /// Checks every structural invariant, returning the first violation.
    #[cfg(test)]
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut reachable = BTreeSet::new();
        if let Some(root) = self.root() {
            if root.parent().is_some() {
                return Err("root has a parent".to_string());
            }
            let mut stack = vec![root.path().to_string()];
            while let Some(path) = stack.pop() {
                if !reachable.insert(path.clone()) {
                    return Err(format!("'{path}' reachable twice"));
                }
                let Some(node) = self.nodes.get(&path) else {
                    return Err(format!("dangling child '{path}'"));
                };
                let mut previous: Option<&Node> = None;
                for child in node.children() {
                    let Some(child_node) = self.nodes.get(child) else {
                        return Err(format!("dangling child '{child}' under '{path}'"));
                    };
                    if child_node.parent() != Some(path.as_str()) {
                        return Err(format!("'{child}' does not point back to '{path}'"));
                    }
                    if let Some(before) = previous {
                        let order = child_order(
                            before.entry_kind(),
                            before.name(),
                            child_node.entry_kind(),
                            child_node.name(),
                        );
                        if !order.is_lt() {
                            return Err(format!("children of '{path}' out of order"));
                        }
                    }
                    previous = Some(child_node);
                    stack.push(child.clone());
                }
            }
        }
        if reachable != self.all_paths() {
            return Err("table and hierarchy disagree".to_string());
        }
        Ok(())
    }
}

/// Folders before files, then case-insensitive name order with the exact name
/// as tie-break.
fn child_order(a_kind: EntryKind, a_name: &str, b_kind: EntryKind, b_name: &str) -> Ordering {
    a_kind
        .cmp(&b_kind)
        .then_with(|| a_name.to_lowercase().cmp(&b_name.to_lowercase()))
        // Names equal but for case: lowercase first
        .then_with(|| b_name.cmp(a_name))
}

#[derive(Debug, Snafu)]
pub enum TreeError {
    #[snafu(display("Cannot register '{}': parent '{}' is not tracked", path, parent))]
    MissingParent { path: String, parent: String },
    #[snafu(display("Cannot register '{}': parent '{}' is a file", path, parent))]
    ParentNotFolder { path: String, parent: String },
    #[snafu(display("Path '{}' is already tracked", path))]
    AlreadyTracked { path: String },
    #[snafu(display("Path '{}' is not tracked", path))]
    NotTracked { path: String },
    #[snafu(display("Path '{}' lies outside the tracked root '{}'", path, root))]
    OutsideRoot { path: String, root: String },
    #[snafu(display("Tracked root '{}' must be a folder", path))]
    RootNotFolder { path: String },
}
