//! In-memory snapshot of one directory level and the event-fold logic.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::dir_view::entry::{Entry, SortPolicy};

/// Kind of change notification folded into a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Created,
    Deleted,
    Modified,
    RenamedIn,
    RenamedOut,
}

/// A change notification queued for the next batch.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEvent {
    pub kind: EventKind,
    pub path: PathBuf,
}

impl PendingEvent {
    pub fn new(kind: EventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// Resolve this event against the filesystem into a snapshot operation.
    ///
    /// Returns `None` when the event can only be dropped: an insert or
    /// refresh whose target vanished before the batch ran.
    pub fn resolve(&self) -> Option<ResolvedEvent> {
        match self.kind {
            EventKind::Created | EventKind::RenamedIn => {
                Entry::from_path(&self.path).map(ResolvedEvent::Upsert)
            }
            EventKind::Deleted | EventKind::RenamedOut => {
                Some(ResolvedEvent::Remove(self.path.clone()))
            }
            EventKind::Modified => Entry::from_path(&self.path).map(ResolvedEvent::Refresh),
        }
    }
}

/// A pending event with its filesystem state already captured, ready to be
/// applied to a snapshot without touching storage again.
#[derive(Debug, Clone)]
pub enum ResolvedEvent {
    /// Insert, or replace the entry already stored under the same path.
    Upsert(Entry),
    /// Remove by path; absent paths are a no-op.
    Remove(PathBuf),
    /// Replace in place only if the path is present.
    Refresh(Entry),
}

/// The ordered, duplicate-free set of entries currently shown for one
/// directory. Owned exclusively by one reconciler; replaced wholesale on
/// navigation.
#[derive(Debug, Default)]
pub struct Snapshot {
    entries: Vec<Entry>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.position(path).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Read-only copy handed to presenters on each publish.
    pub fn to_shared(&self) -> Arc<[Entry]> {
        Arc::from(self.entries.as_slice())
    }

    fn position(&self, path: &Path) -> Option<usize> {
        self.entries.iter().position(|e| e.path == path)
    }

    /// Insert `entry`, replacing any entry already stored under its path.
    pub fn insert_or_replace(&mut self, entry: Entry) {
        match self.position(&entry.path) {
            Some(ix) => self.entries[ix] = entry,
            None => self.entries.push(entry),
        }
    }

    /// Remove the entry at `path`. Returns whether anything was removed;
    /// removing an absent path is a no-op.
    pub fn remove(&mut self, path: &Path) -> bool {
        match self.position(path) {
            Some(ix) => {
                self.entries.remove(ix);
                true
            }
            None => false,
        }
    }

    /// Replace the entry under `entry.path` in place, if present.
    pub fn refresh(&mut self, entry: Entry) -> bool {
        match self.position(&entry.path) {
            Some(ix) => {
                self.entries[ix] = entry;
                true
            }
            None => false,
        }
    }

    /// Fold a batch of resolved events, in arrival order. The last event for
    /// a path wins, since each step fully re-evaluates position by path.
    pub fn apply(&mut self, events: impl IntoIterator<Item = ResolvedEvent>) {
        for event in events {
            match event {
                ResolvedEvent::Upsert(entry) => self.insert_or_replace(entry),
                ResolvedEvent::Remove(path) => {
                    self.remove(&path);
                }
                ResolvedEvent::Refresh(entry) => {
                    self.refresh(entry);
                }
            }
        }
    }

    pub fn sort(&mut self, policy: &SortPolicy) {
        policy.sort(&mut self.entries);
    }
}
