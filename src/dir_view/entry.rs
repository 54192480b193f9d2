//! Entry model and sort policies for a directory view.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// One filesystem object (file or directory) tracked in a directory view.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Absolute path; the unique key within a snapshot.
    pub path: PathBuf,
    /// Last path segment.
    pub name: String,
    /// Whether this is a directory.
    pub is_dir: bool,
    /// File size in bytes; always 0 for directories.
    pub size: u64,
    /// Last modification time, when the filesystem reports one.
    pub modified: Option<SystemTime>,
    /// File extension, without the dot.
    pub extension: Option<String>,
    /// Dotfile convention: the name starts with '.'.
    pub is_hidden: bool,
}

impl Entry {
    /// Stat `path` and build an entry.
    ///
    /// Returns `None` when the object vanished or has no representable name,
    /// so callers can drop stale events without special-casing races.
    pub fn from_path(path: &Path) -> Option<Self> {
        let metadata = std::fs::metadata(path).ok()?;
        let name = path.file_name()?.to_string_lossy().into_owned();
        let is_dir = metadata.is_dir();

        Some(Self {
            size: if is_dir { 0 } else { metadata.len() },
            modified: metadata.modified().ok(),
            extension: path.extension().map(|e| e.to_string_lossy().into_owned()),
            is_hidden: name.starts_with('.'),
            is_dir,
            name,
            path: path.to_path_buf(),
        })
    }
}

/// Attribute a snapshot is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Size,
    Modified,
    Extension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Comparator plus direction used to order a snapshot for display.
///
/// Directories always sort before files. Flipping the direction reverses the
/// directory group and the file group independently; the directories-first
/// partition itself never flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortPolicy {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortPolicy {
    fn default() -> Self {
        Self {
            key: SortKey::Name,
            direction: SortDirection::Ascending,
        }
    }
}

impl SortPolicy {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Compare two entries by the sort key alone, ignoring direction and the
    /// directory/file partition.
    pub fn compare_key(&self, a: &Entry, b: &Entry) -> Ordering {
        match self.key {
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::Size => a.size.cmp(&b.size),
            SortKey::Modified => a.modified.cmp(&b.modified),
            SortKey::Extension => a.extension.cmp(&b.extension),
        }
    }

    /// Order `entries` for display: directories first, each group sorted by
    /// the key, each group reversed when descending.
    pub fn sort(&self, entries: &mut Vec<Entry>) {
        let (mut dirs, mut files): (Vec<Entry>, Vec<Entry>) =
            entries.drain(..).partition(|e| e.is_dir);

        dirs.sort_by(|a, b| self.compare_key(a, b));
        files.sort_by(|a, b| self.compare_key(a, b));

        if self.direction == SortDirection::Descending {
            dirs.reverse();
            files.reverse();
        }

        entries.extend(dirs);
        entries.extend(files);
    }
}
