use derive_more::Display;

use crate::ext::HostPathExt;
use crate::storage::{EntryKind, Stat};

/// Identity of a node, unique for the lifetime of its [`TreeIndex`](super::TreeIndex).
/// A path that is removed and later re-added gets a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("#{_0}")]
pub struct NodeId(pub(super) u64);

/// File metadata captured once when the file is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    pub size: u64,
    pub modified_time: u64,
    pub created_time: u64,
    pub basename: String,
    pub extension: String,
}

impl FileMeta {
    pub fn from_stat(path: &str, stat: &Stat) -> Self {
        Self {
            size: stat.size,
            modified_time: stat.modified_time,
            created_time: stat.created_time,
            basename: path.basename().to_string(),
            extension: path.extension().to_string(),
        }
    }
}

/// What to register for a new path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Folder,
    File(FileMeta),
}

impl NodeData {
    pub fn entry_kind(&self) -> EntryKind {
        match self {
            NodeData::Folder => EntryKind::Folder,
            NodeData::File(_) => EntryKind::File,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Child paths, kept sorted folders first, then by name.
    Folder { children: Vec<String> },
    File(FileMeta),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub(super) id: NodeId,
    pub(super) path: String,
    pub(super) name: String,
    pub(super) parent: Option<String>,
    pub(super) kind: NodeKind,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the containing folder; `None` for the tracked root.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn entry_kind(&self) -> EntryKind {
        match self.kind {
            NodeKind::Folder { .. } => EntryKind::Folder,
            NodeKind::File(_) => EntryKind::File,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder { .. })
    }

    /// Child paths in display order. Empty for files.
    pub fn children(&self) -> &[String] {
        match &self.kind {
            NodeKind::Folder { children } => children,
            NodeKind::File(_) => &[],
        }
    }

    pub fn file_meta(&self) -> Option<&FileMeta> {
        match &self.kind {
            NodeKind::File(meta) => Some(meta),
            NodeKind::Folder { .. } => None,
        }
    }
}
