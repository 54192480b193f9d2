//! Directory-view engine.
//!
//! - [`entry`]: entry model and sort policies
//! - [`snapshot`]: the per-directory snapshot and event-fold logic
//! - [`reconciler`]: debounced reconciliation of snapshots with change events
//! - [`lister`]: full directory listings behind an async seam
//! - [`watcher`]: notify-backed change notifications for one directory level
//! - [`search`]: cancellable, throttled filename search

pub mod entry;
pub mod lister;
pub mod reconciler;
pub mod search;
pub mod snapshot;
pub mod watcher;

pub use entry::{Entry, SortDirection, SortKey, SortPolicy};
pub use lister::{DirectoryLister, FsDirectoryLister, ListError};
pub use reconciler::{
    DirectoryReconciler, ReconcileError, ReconcilerBuilder, SnapshotUpdate, DEFAULT_DEBOUNCE,
};
pub use search::{
    search_index, search_walk, EntryIndex, InMemoryEntryIndex, SearchError, SearchOptions,
    SearchSession, EMIT_INTERVAL,
};
pub use snapshot::{EventKind, PendingEvent, ResolvedEvent, Snapshot};
pub use watcher::{watch_directory, EventSink, WatchError, WatchHandle};
