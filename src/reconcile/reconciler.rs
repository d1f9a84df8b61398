use std::cell::RefCell;

use snafu::prelude::*;
use tracing::{debug, info, warn};

use super::{ChangeSet, Diff, DiskSnapshot, Scan, scan_tree};
use crate::ext::HostPathExt;
use crate::storage::{EntryKind, StorageAdapter, StorageError};
use crate::tree::{FileMeta, NodeData, TreeError, TreeIndex};

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Whether the tracked root existed when the pass scanned it.
    pub root_present: bool,
    /// Mutations committed to the tree.
    pub changes: ChangeSet,
    /// Additions whose parent was not tracked; retried next pass.
    pub deferred: Vec<String>,
    /// Additions dropped because their metadata could not be read.
    pub skipped: Vec<String>,
}

/// Brings a [`TreeIndex`] in line with the tracked root on storage.
///
/// The reconciler is the only writer of the tree. It never holds a borrow of
/// the tree across a storage call, so readers can inspect the tree while a
/// pass is suspended on I/O.
#[derive(Debug)]
pub struct Reconciler<S> {
    storage: S,
    root: String,
}

impl<S: StorageAdapter> Reconciler<S> {
    pub fn new(storage: S, root: impl Into<String>) -> Self {
        Self {
            storage,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Runs one pass: scan, diff, then apply removals and additions.
    ///
    /// A scan failure aborts the pass before the tree is touched. Failures for
    /// single paths are logged and recorded in the report instead.
    pub async fn reconcile(&self, tree: &RefCell<TreeIndex>) -> Result<PassReport, ReconcileError> {
        let scan = scan_tree(&self.storage, &self.root)
            .await
            .context(ScanSnafu { root: self.root.as_str() })?;

        let (disk, root_present) = match scan {
            Scan::RootAbsent => (DiskSnapshot::new(), false),
            Scan::Present(snapshot) => (snapshot, true),
        };

        let diff = Diff::between(&disk, &tree.borrow());
        let mut report = PassReport {
            root_present,
            ..PassReport::default()
        };
        if diff.is_empty() {
            debug!("No changes under '{}'", self.root);
            return Ok(report);
        }
        debug!(
            "Diff for '{}': {} to add, {} to remove",
            self.root,
            diff.to_add.len(),
            diff.to_remove.len()
        );

        self.apply_removals(&diff, tree, &mut report);
        self.apply_additions(diff, tree, &mut report).await;

        if !report.changes.is_empty() {
            info!(
                "Reconciled '{}': {} added, {} removed",
                self.root,
                report.changes.added.len(),
                report.changes.removed.len()
            );
        }
        Ok(report)
    }

    fn apply_removals(&self, diff: &Diff, tree: &RefCell<TreeIndex>, report: &mut PassReport) {
        let mut tree = tree.borrow_mut();
        for path in &diff.to_remove {
            match tree.remove(path) {
                Ok(removed) => report.changes.removed.extend(removed),
                // Already gone with a removed ancestor
                Err(TreeError::NotTracked { .. }) => {
                    debug!("'{}' was removed with its parent", path);
                }
                Err(e) => warn!("Failed to remove '{}': {}", path, e),
            }
        }
    }

    async fn apply_additions(&self, diff: Diff, tree: &RefCell<TreeIndex>, report: &mut PassReport) {
        for (path, kind) in diff.to_add {
            if path != self.root && !tree.borrow().contains(path.parent_path()) {
                debug!("Deferring '{}' until its parent is tracked", path);
                report.deferred.push(path);
                continue;
            }

            let data = match self.load_node_data(&path, kind).await {
                Ok(data) => data,
                Err(e) => {
                    warn!("Skipping '{}': {}", path, e);
                    report.skipped.push(path);
                    continue;
                }
            };

            let result = tree.borrow_mut().insert(&path, data);
            match result {
                Ok(_) => {
                    report.changes.added.insert(path);
                }
                Err(TreeError::MissingParent { .. }) => {
                    debug!("Deferring '{}' until its parent is tracked", path);
                    report.deferred.push(path);
                }
                Err(TreeError::AlreadyTracked { .. }) => {
                    debug!("'{}' is already tracked", path);
                }
                Err(e) => {
                    warn!("Failed to register '{}': {}", path, e);
                    report.skipped.push(path);
                }
            }
        }
    }

    async fn load_node_data(&self, path: &str, kind: EntryKind) -> Result<NodeData, MetadataError> {
        let stat = self
            .storage
            .stat(path)
            .await
            .context(StatSnafu { path })?
            .context(MissingSnafu { path })?;

        ensure!(
            stat.kind == kind,
            KindChangedSnafu {
                path,
                listed: kind,
                found: stat.kind,
            }
        );

        Ok(match kind {
            EntryKind::Folder => NodeData::Folder,
            EntryKind::File => NodeData::File(FileMeta::from_stat(path, &stat)),
        })
    }
}

#[derive(Debug, Snafu)]
pub enum ReconcileError {
    #[snafu(display("Failed to scan tracked root '{}'", root))]
    ScanError { root: String, source: StorageError },
}

/// Why a single discovered path could not be registered.
#[derive(Debug, Snafu)]
pub enum MetadataError {
    #[snafu(display("Failed to read metadata for '{}'", path))]
    StatError { path: String, source: StorageError },
    #[snafu(display("No metadata available for '{}'", path))]
    Missing { path: String },
    #[snafu(display("'{}' was listed as a {} but is now a {}", path, listed, found))]
    KindChanged {
        path: String,
        listed: EntryKind,
        found: EntryKind,
    },
}
