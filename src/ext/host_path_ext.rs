//! Helpers for host paths: slash-separated strings relative to the host root.
//!
//! The empty string is the host root itself and is never tracked.

const SEPARATOR: char = '/';

/// Joins a directory path and an entry name, treating `""` as the host root.
pub fn join_host_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}{SEPARATOR}{name}")
    }
}

pub trait HostPathExt {
    /// Path of the containing directory, `""` for top-level entries.
    fn parent_path(&self) -> &str;
    /// Final path segment.
    fn file_name(&self) -> &str;
    /// Number of separators in the path.
    fn depth(&self) -> usize;
    /// True for `root` itself and anything below it.
    fn is_within(&self, root: &str) -> bool;
    /// Text after the last `.` of the name, empty when there is none.
    fn extension(&self) -> &str;
    /// Name with its trailing `.ext` removed.
    fn basename(&self) -> &str;
}

impl HostPathExt for str {
    fn parent_path(&self) -> &str {
        match self.rfind(SEPARATOR) {
            Some(idx) => &self[..idx],
            None => "",
        }
    }

    fn file_name(&self) -> &str {
        match self.rfind(SEPARATOR) {
            Some(idx) => &self[idx + 1..],
            None => self,
        }
    }

    fn depth(&self) -> usize {
        self.matches(SEPARATOR).count()
    }

    fn is_within(&self, root: &str) -> bool {
        self == root
            || (self.len() > root.len()
                && self.starts_with(root)
                && self[root.len()..].starts_with(SEPARATOR))
    }

    fn extension(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(idx) => &name[idx + 1..],
            None => "",
        }
    }

    fn basename(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            // A trailing dot has no extension to strip
            Some(idx) if idx + 1 < name.len() => &name[..idx],
            _ => name,
        }
    }
}
