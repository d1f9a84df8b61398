use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use compio::fs;
use snafu::ResultExt;
use tracing::debug;

use super::adapter::IoSnafu;
use super::{EntryKind, Listing, Stat, StorageAdapter, StorageError};
use crate::ext::{AsyncTryFrom, AsyncTryInto, SystemTimeExt, join_host_path};

/// Storage adapter over the local filesystem, resolving host paths against
/// `base`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base: PathBuf,
}

impl LocalStorage {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn resolve(&self, path: &str) -> PathBuf {
        if path.is_empty() {
            self.base.clone()
        } else {
            self.base.join(path)
        }
    }
}

impl<'a> AsyncTryFrom<&'a Path> for Stat {
    type Error = io::Error;

    async fn async_try_from(path: &'a Path) -> Result<Self, Self::Error> {
        // Symlinks are never descended into: a link to a file reports the
        // target, anything else reports the link itself as a file.
        let link = path.symlink_metadata()?;
        let metadata = if link.file_type().is_symlink() {
            match path.metadata() {
                Ok(target) if target.is_file() => target,
                _ => link,
            }
        } else {
            link
        };

        let kind = if metadata.is_dir() {
            EntryKind::Folder
        } else {
            EntryKind::File
        };
        let modified_time = metadata
            .modified()
            .map(|time| time.to_unix_millis())
            .unwrap_or(0);
        // Not every filesystem records a birth time
        let created_time = metadata
            .created()
            .map(|time| time.to_unix_millis())
            .unwrap_or(modified_time);
        let size = match kind {
            EntryKind::Folder => 0,
            EntryKind::File => metadata.len(),
        };

        Ok(Stat {
            kind,
            size,
            modified_time,
            created_time,
        })
    }
}

/// Reads one directory. Runs on a blocking thread.
fn read_listing(resolved: &Path, dir: &str) -> io::Result<Listing> {
    let mut listing = Listing::default();
    for entry in std::fs::read_dir(resolved)? {
        let entry = entry?;

        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                debug!("Skipping non UTF-8 entry {:?} in '{}'", raw, dir);
                continue;
            }
        };

        let file_type = entry.file_type()?;
        if file_type.is_symlink() && std::fs::metadata(entry.path()).is_err() {
            debug!("Skipping dangling symlink '{}' in '{}'", name, dir);
            continue;
        }

        let path = join_host_path(dir, &name);
        if file_type.is_dir() {
            listing.folders.push(path);
        } else {
            listing.files.push(path);
        }
    }

    listing.files.sort();
    listing.folders.sort();
    Ok(listing)
}

impl StorageAdapter for LocalStorage {
    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        match fs::metadata(self.resolve(path)).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).context(IoSnafu { path }),
        }
    }

    async fn list(&self, dir: &str) -> Result<Listing, StorageError> {
        let resolved = self.resolve(dir);
        let host_dir = dir.to_string();
        compio::runtime::spawn_blocking(move || read_listing(&resolved, &host_dir))
            .await
            .unwrap_or_else(|_| Err(io::Error::other("directory listing panicked")))
            .context(IoSnafu { path: dir })
    }

    async fn stat(&self, path: &str) -> Result<Option<Stat>, StorageError> {
        let resolved = self.resolve(path);
        let result: Result<Stat, _> = resolved.as_path().async_try_into().await;
        match result {
            Ok(stat) => Ok(Some(stat)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context(IoSnafu { path }),
        }
    }
}
