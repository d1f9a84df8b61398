use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::storage::{EntryKind, StorageAdapter, StorageError};

/// Every path under the tracked root, the root included, with its kind.
pub type DiskSnapshot = BTreeMap<String, EntryKind>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scan {
    /// The root does not exist, or is not a folder.
    RootAbsent,
    Present(DiskSnapshot),
}

/// Walks `root` through the adapter and collects every file and folder below
/// it. Any storage failure aborts the whole scan.
pub async fn scan_tree<S: StorageAdapter>(storage: &S, root: &str) -> Result<Scan, StorageError> {
    if !storage.exists(root).await? {
        debug!("Tracked root '{}' does not exist", root);
        return Ok(Scan::RootAbsent);
    }
    match storage.stat(root).await? {
        Some(stat) if stat.kind == EntryKind::Folder => {}
        Some(_) => {
            warn!("Tracked root '{}' is not a folder", root);
            return Ok(Scan::RootAbsent);
        }
        None => return Ok(Scan::RootAbsent),
    }

    let mut snapshot = DiskSnapshot::new();
    snapshot.insert(root.to_string(), EntryKind::Folder);

    let mut pending = vec![root.to_string()];
    while let Some(dir) = pending.pop() {
        let listing = storage.list(&dir).await?;
        for file in listing.files {
            snapshot.insert(file, EntryKind::File);
        }
        for folder in listing.folders {
            snapshot.insert(folder.clone(), EntryKind::Folder);
            pending.push(folder);
        }
    }

    debug!("Scanned {} paths under '{}'", snapshot.len(), root);
    Ok(Scan::Present(snapshot))
}
