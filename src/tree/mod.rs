//! In-memory mirror of the tracked subtree.
//!
//! The [`TreeIndex`] owns every [`Node`] through a flat path table. Folders
//! refer to their children, and children to their parent, by path key into
//! that table, so the hierarchy carries no ownership cycles.

mod index;
mod node;
mod render;

pub use index::{TreeError, TreeIndex};
pub use node::{FileMeta, Node, NodeData, NodeId, NodeKind};
