use std::rc::Rc;

use derive_more::Display;
use snafu::Snafu;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub enum EntryKind {
    #[display("folder")]
    Folder,
    #[display("file")]
    File,
}

/// Direct children of a directory, split by kind. Entries are full host paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub files: Vec<String>,
    pub folders: Vec<String>,
}

/// Metadata for a single path. Times are milliseconds since the unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    pub kind: EntryKind,
    pub size: u64,
    pub modified_time: u64,
    pub created_time: u64,
}

/// Storage the engine reads from. Implementations never see writes from the
/// engine; files in the tracked subtree are created and deleted by other
/// processes.
#[allow(async_fn_in_trait)]
pub trait StorageAdapter {
    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Lists the direct children of `dir`. Fails if `dir` is not a readable
    /// directory.
    async fn list(&self, dir: &str) -> Result<Listing, StorageError>;

    /// Returns `None` when the path is gone.
    async fn stat(&self, path: &str) -> Result<Option<Stat>, StorageError>;
}

impl<T: StorageAdapter> StorageAdapter for Rc<T> {
    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        self.as_ref().exists(path).await
    }

    async fn list(&self, dir: &str) -> Result<Listing, StorageError> {
        self.as_ref().list(dir).await
    }

    async fn stat(&self, path: &str) -> Result<Option<Stat>, StorageError> {
        self.as_ref().stat(path).await
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StorageError {
    #[snafu(display("Storage call failed for '{}'", path))]
    IoError {
        path: String,
        source: std::io::Error,
    },
}
