//! Disk-to-tree reconciliation: scan the tracked root, diff the snapshot
//! against the [`TreeIndex`](crate::tree::TreeIndex), apply the difference.

mod change_set;
mod diff;
mod reconciler;
mod scanner;

pub use change_set::ChangeSet;
pub use diff::Diff;
pub use reconciler::{MetadataError, PassReport, ReconcileError, Reconciler};
pub use scanner::{DiskSnapshot, Scan, scan_tree};
