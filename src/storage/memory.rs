use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Error, ErrorKind};

use futures_channel::oneshot;

use super::{EntryKind, Listing, Stat, StorageAdapter, StorageError};
use crate::ext::HostPathExt;

/// In-memory storage for tests, with failure injection and a gate that
/// suspends the next listing until released.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<BTreeMap<String, Stat>>,
    unavailable: Cell<bool>,
    hidden_stats: RefCell<BTreeSet<String>>,
    exists_calls: Cell<usize>,
    list_gate: RefCell<Option<oneshot::Receiver<()>>>,
    clock: Cell<u64>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a folder and any missing ancestors.
    pub fn add_folder(&self, path: &str) {
        self.add_ancestors(path);
        self.put(path, EntryKind::Folder, 0);
    }

    /// Adds a file and any missing ancestor folders.
    pub fn add_file(&self, path: &str, size: u64) {
        self.add_ancestors(path);
        self.put(path, EntryKind::File, size);
    }

    /// Removes a path and everything below it.
    pub fn remove(&self, path: &str) {
        self.entries
            .borrow_mut()
            .retain(|entry, _| !entry.as_str().is_within(path));
    }

    /// Makes every call fail until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.set(unavailable);
    }

    /// Makes `stat` report the path as gone while listings still show it.
    pub fn hide_stat(&self, path: &str) {
        self.hidden_stats.borrow_mut().insert(path.to_string());
    }

    pub fn reveal_stat(&self, path: &str) {
        self.hidden_stats.borrow_mut().remove(path);
    }

    /// Number of scans started; every scan begins with one `exists` call.
    pub fn exists_calls(&self) -> usize {
        self.exists_calls.get()
    }

    /// Suspends the next `list` call until the returned sender fires or is
    /// dropped.
    pub fn gate_next_list(&self) -> oneshot::Sender<()> {
        let (sender, receiver) = oneshot::channel();
        *self.list_gate.borrow_mut() = Some(receiver);
        sender
    }

    fn put(&self, path: &str, kind: EntryKind, size: u64) {
        let time = self.clock.get() + 1;
        self.clock.set(time);
        self.entries.borrow_mut().insert(
            path.to_string(),
            Stat {
                kind,
                size,
                modified_time: time,
                created_time: time,
            },
        );
    }

    fn add_ancestors(&self, path: &str) {
        let mut ancestors = Vec::new();
        let mut current = path.parent_path();
        while !current.is_empty() {
            ancestors.push(current.to_string());
            current = current.parent_path();
        }
        for ancestor in ancestors.into_iter().rev() {
            let missing = !self.entries.borrow().contains_key(&ancestor);
            if missing {
                self.put(&ancestor, EntryKind::Folder, 0);
            }
        }
    }

    fn check_available(&self, path: &str) -> Result<(), StorageError> {
        if self.unavailable.get() {
            return Err(StorageError::IoError {
                path: path.to_string(),
                source: Error::other("storage unavailable"),
            });
        }
        Ok(())
    }
}

impl StorageAdapter for MemoryStorage {
    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        self.exists_calls.set(self.exists_calls.get() + 1);
        self.check_available(path)?;
        Ok(self.entries.borrow().contains_key(path))
    }

    async fn list(&self, dir: &str) -> Result<Listing, StorageError> {
        let gate = self.list_gate.borrow_mut().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.check_available(dir)?;

        let entries = self.entries.borrow();
        match entries.get(dir) {
            Some(stat) if stat.kind == EntryKind::Folder => {}
            _ => {
                return Err(StorageError::IoError {
                    path: dir.to_string(),
                    source: Error::from(ErrorKind::NotFound),
                });
            }
        }

        let mut listing = Listing::default();
        for (path, stat) in entries.iter() {
            if path.as_str() == dir || path.as_str().parent_path() != dir {
                continue;
            }
            match stat.kind {
                EntryKind::Folder => listing.folders.push(path.clone()),
                EntryKind::File => listing.files.push(path.clone()),
            }
        }
        Ok(listing)
    }

    async fn stat(&self, path: &str) -> Result<Option<Stat>, StorageError> {
        self.check_available(path)?;
        if self.hidden_stats.borrow().contains(path) {
            return Ok(None);
        }
        Ok(self.entries.borrow().get(path).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn add_file_creates_ancestors() {
        let storage = MemoryStorage::new();
        storage.add_file(".claude/a/b.md", 3);

        block_on(async {
            assert!(storage.exists(".claude").await.unwrap());
            assert!(storage.exists(".claude/a").await.unwrap());
            let listing = storage.list(".claude").await.unwrap();
            assert_eq!(listing.folders, vec![".claude/a".to_string()]);
            assert!(listing.files.is_empty());
        });
    }

    #[test]
    fn remove_drops_subtree() {
        let storage = MemoryStorage::new();
        storage.add_file(".claude/a/b.md", 3);
        storage.add_file(".claude/ab.md", 3);
        storage.remove(".claude/a");

        block_on(async {
            assert!(!storage.exists(".claude/a/b.md").await.unwrap());
            assert!(storage.exists(".claude/ab.md").await.unwrap());
        });
    }

    #[test]
    fn unavailable_storage_fails_every_call() {
        let storage = MemoryStorage::new();
        storage.add_folder(".claude");
        storage.set_unavailable(true);

        block_on(async {
            assert!(storage.exists(".claude").await.is_err());
            assert!(storage.list(".claude").await.is_err());
            assert!(storage.stat(".claude").await.is_err());
        });
    }
}
