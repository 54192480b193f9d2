//! dirview
//!
//! A directory-view engine for file-manager frontends: it keeps an ordered,
//! de-duplicated snapshot of one directory's entries consistent under a
//! stream of asynchronous, best-effort filesystem change notifications,
//! without re-listing the directory on every event.
//!
//! ```text
//! Filesystem change
//!        ↓
//! watch_directory (notify, non-recursive)
//!        ↓
//! DirectoryReconciler::apply_event   [enqueue only, any thread]
//!        ↓  (debounced batches)
//! Snapshot::apply + SortPolicy::sort
//!        ↓
//! broadcast::send(SnapshotUpdate)
//!        ↓
//! DirectoryPane render callback      [read-only entry list]
//! ```
//!
//! Bulk updates go through [`DirectoryReconciler::load`], which lists the
//! directory via a [`dir_view::DirectoryLister`] and is last-call-wins when
//! navigations race. Filename search ([`dir_view::search_walk`],
//! [`dir_view::search_index`]) streams throttled partial results and is
//! cancellable at every file boundary.
//!
//! [`DirectoryReconciler::load`]: dir_view::DirectoryReconciler::load

pub mod dir_view;
pub mod jobs;
pub mod search_history;
pub mod ui;

use std::path::Path;
use std::sync::Arc;

use dir_view::{watch_directory, DirectoryReconciler, WatchError, WatchHandle};

/// Re-exports for convenience.
pub mod prelude {
    pub use crate::attach_watcher;
    pub use crate::dir_view::{
        search_index, search_walk, DirectoryLister, DirectoryReconciler, Entry, EntryIndex,
        EventKind, FsDirectoryLister, InMemoryEntryIndex, ListError, ReconcileError,
        ReconcilerBuilder, SearchOptions, SearchSession, SnapshotUpdate, SortDirection, SortKey,
        SortPolicy, WatchError, WatchHandle,
    };
    pub use crate::jobs::JobStore;
    pub use crate::search_history::SearchHistory;
    pub use crate::ui::{DirectoryPane, DirectoryPaneBuilder, ListViewHandle};
}

/// Start watching `path` and feed every change notification into the
/// reconciler's event queue.
///
/// A watch failure degrades to "no live updates": the already-loaded list
/// stays valid and the caller decides whether to surface the error.
pub fn attach_watcher(
    reconciler: &DirectoryReconciler,
    path: &Path,
) -> Result<WatchHandle, WatchError> {
    let reconciler = reconciler.clone();
    watch_directory(
        path,
        Arc::new(move |kind, event_path| reconciler.apply_event(kind, event_path)),
    )
}
