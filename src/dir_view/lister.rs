//! Directory listing behind an async seam.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::dir_view::entry::Entry;

/// Errors from producing a full directory listing.
#[derive(Debug, Error)]
pub enum ListError {
    #[error("directory {path} cannot be read: {source}")]
    NotReadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("listing was cancelled")]
    Cancelled,
}

/// Produces the full set of entries for one directory level.
#[async_trait]
pub trait DirectoryLister: Send + Sync {
    async fn list(&self, path: &Path) -> Result<Vec<Entry>, ListError>;
}

/// `std::fs`-backed lister; the blocking `read_dir` walk runs off the
/// runtime's worker threads.
#[derive(Debug, Clone, Default)]
pub struct FsDirectoryLister {
    show_hidden: bool,
}

impl FsDirectoryLister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Include dotfiles in listings.
    pub fn show_hidden(mut self, show: bool) -> Self {
        self.show_hidden = show;
        self
    }
}

#[async_trait]
impl DirectoryLister for FsDirectoryLister {
    async fn list(&self, path: &Path) -> Result<Vec<Entry>, ListError> {
        let path = path.to_path_buf();
        let show_hidden = self.show_hidden;

        tokio::task::spawn_blocking(move || list_dir(&path, show_hidden))
            .await
            .map_err(|_| ListError::Cancelled)?
    }
}

fn list_dir(path: &Path, show_hidden: bool) -> Result<Vec<Entry>, ListError> {
    let read = std::fs::read_dir(path).map_err(|source| ListError::NotReadable {
        path: path.to_path_buf(),
        source,
    })?;

    let mut entries = Vec::new();
    for dirent in read.filter_map(|e| e.ok()) {
        // An entry can vanish between the readdir and the stat; skip it.
        let Some(entry) = Entry::from_path(&dirent.path()) else {
            continue;
        };
        if !show_hidden && entry.is_hidden {
            continue;
        }
        entries.push(entry);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let listed = FsDirectoryLister::new().list(dir.path()).await.unwrap();
        let mut names: Vec<_> = listed.iter().map(|e| e.name.clone()).collect();
        names.sort();

        assert_eq!(names, ["a.txt", "sub"]);
        let sub = listed.iter().find(|e| e.name == "sub").unwrap();
        assert!(sub.is_dir);
        assert_eq!(sub.size, 0);
    }

    #[tokio::test]
    async fn hides_dotfiles_unless_asked() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".secret"), b"s").unwrap();
        std::fs::write(dir.path().join("plain.txt"), b"p").unwrap();

        let hidden = FsDirectoryLister::new().list(dir.path()).await.unwrap();
        assert_eq!(hidden.len(), 1);
        assert_eq!(hidden[0].name, "plain.txt");

        let shown = FsDirectoryLister::new()
            .show_hidden(true)
            .list(dir.path())
            .await
            .unwrap();
        assert_eq!(shown.len(), 2);
    }

    #[tokio::test]
    async fn missing_directory_is_not_readable() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("nope");

        let err = FsDirectoryLister::new().list(&gone).await.unwrap_err();
        assert!(matches!(err, ListError::NotReadable { .. }));
    }
}
