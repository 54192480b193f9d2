//! Reconciles a directory snapshot with asynchronous change notifications.
//!
//! One reconciler owns exactly one [`Snapshot`] at a time, for one directory
//! path. Bulk updates come from a [`DirectoryLister`]; incremental updates
//! arrive as change events, are debounced into batches, folded into the
//! snapshot, re-sorted, and published to subscribers as read-only lists.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;

use crate::dir_view::entry::{Entry, SortPolicy};
use crate::dir_view::lister::{DirectoryLister, ListError};
use crate::dir_view::snapshot::{EventKind, PendingEvent, Snapshot};

/// Delay between the first event of a burst and the batch that folds it in.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    List(#[from] ListError),

    /// The load was superseded by a newer navigation. Never user-visible;
    /// callers discard it silently.
    #[error("load superseded by a newer navigation")]
    Cancelled,
}

/// A freshly published view of one directory. Entries are shared read-only;
/// presenters must not mutate what they are handed.
#[derive(Debug, Clone)]
pub struct SnapshotUpdate {
    pub dir: PathBuf,
    pub entries: Arc<[Entry]>,
}

/// Debounce/coalesce state machine for the pending-event queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchPhase {
    /// No pending events, no task scheduled.
    Idle,
    /// Events queued; a delayed processing task is pending.
    Scheduled,
    /// A batch is currently being applied.
    Processing,
}

struct State {
    dir: Option<PathBuf>,
    snapshot: Snapshot,
    pending: Vec<PendingEvent>,
    phase: BatchPhase,
    sort: SortPolicy,
    /// Bumped by every `load`; stale listings and stale batch tasks observe
    /// the change and discard their work.
    epoch: u64,
}

struct Inner {
    state: Mutex<State>,
    publisher: broadcast::Sender<SnapshotUpdate>,
    lister: Arc<dyn DirectoryLister>,
    debounce: Duration,
    runtime: tokio::runtime::Handle,
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &State) {
        let Some(dir) = &state.dir else {
            return;
        };
        let update = SnapshotUpdate {
            dir: dir.clone(),
            entries: state.snapshot.to_shared(),
        };
        if self.publisher.send(update).is_err() {
            tracing::trace!("no snapshot subscribers");
        }
    }
}

/// Builder with the reconciler's tunables. Must be built inside a Tokio
/// runtime; the reconciler captures the runtime handle so events can be
/// enqueued from non-runtime threads (the OS watcher's callback thread).
pub struct ReconcilerBuilder {
    lister: Arc<dyn DirectoryLister>,
    debounce: Duration,
    buffer_size: usize,
    sort: SortPolicy,
}

impl ReconcilerBuilder {
    pub fn new(lister: Arc<dyn DirectoryLister>) -> Self {
        Self {
            lister,
            debounce: DEFAULT_DEBOUNCE,
            buffer_size: 256,
            sort: SortPolicy::default(),
        }
    }

    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn sort_policy(mut self, sort: SortPolicy) -> Self {
        self.sort = sort;
        self
    }

    pub fn build(self) -> (DirectoryReconciler, broadcast::Receiver<SnapshotUpdate>) {
        let (publisher, receiver) = broadcast::channel(self.buffer_size);
        let inner = Inner {
            state: Mutex::new(State {
                dir: None,
                snapshot: Snapshot::new(),
                pending: Vec::new(),
                phase: BatchPhase::Idle,
                sort: self.sort,
                epoch: 0,
            }),
            publisher,
            lister: self.lister,
            debounce: self.debounce,
            runtime: tokio::runtime::Handle::current(),
        };
        (
            DirectoryReconciler {
                inner: Arc::new(inner),
            },
            receiver,
        )
    }
}

/// Maintains an ordered, de-duplicated view of the entries in one directory,
/// folding in a stream of possibly-noisy change notifications without
/// re-reading the directory on every event.
#[derive(Clone)]
pub struct DirectoryReconciler {
    inner: Arc<Inner>,
}

impl DirectoryReconciler {
    pub fn subscribe(&self) -> broadcast::Receiver<SnapshotUpdate> {
        self.inner.publisher.subscribe()
    }

    pub fn current_dir(&self) -> Option<PathBuf> {
        self.inner.lock_state().dir.clone()
    }

    /// Read-only copy of the current snapshot.
    pub fn entries(&self) -> Arc<[Entry]> {
        self.inner.lock_state().snapshot.to_shared()
    }

    pub fn sort_policy(&self) -> SortPolicy {
        self.inner.lock_state().sort
    }

    /// Navigate to `path`: cancel any in-flight load or queued events for the
    /// previous directory, list `path` in full, install the sorted listing
    /// and publish it.
    ///
    /// Concurrent loads are last-call-wins: a superseded call returns
    /// [`ReconcileError::Cancelled`] and its listing is discarded even if it
    /// completes later. A `NotReadable` failure clears the snapshot so the
    /// caller shows an empty/error state, never a stale list.
    pub async fn load(
        &self,
        path: impl Into<PathBuf>,
        sort: SortPolicy,
    ) -> Result<(), ReconcileError> {
        let path = path.into();
        let epoch = {
            let mut state = self.inner.lock_state();
            state.epoch += 1;
            state.pending.clear();
            // A scheduled batch task observes the epoch change and exits.
            state.phase = BatchPhase::Idle;
            state.dir = Some(path.clone());
            state.sort = sort;
            state.epoch
        };

        let listed = self.inner.lister.list(&path).await;

        let mut state = self.inner.lock_state();
        if state.epoch != epoch {
            tracing::debug!("discarding superseded listing of {}", path.display());
            return Err(ReconcileError::Cancelled);
        }
        match listed {
            Ok(entries) => {
                let mut snapshot = Snapshot::from_entries(entries);
                snapshot.sort(&state.sort);
                state.snapshot = snapshot;
                self.inner.publish(&state);
                Ok(())
            }
            Err(err) => {
                state.snapshot.clear();
                Err(err.into())
            }
        }
    }

    /// Re-list the current directory with the current sort policy.
    pub async fn refresh(&self) -> Result<(), ReconcileError> {
        let (dir, sort) = {
            let state = self.inner.lock_state();
            match &state.dir {
                Some(dir) => (dir.clone(), state.sort),
                None => return Ok(()),
            }
        };
        self.load(dir, sort).await
    }

    /// Enqueue a change notification. Never blocks and never touches the
    /// snapshot directly; a debounced batch task folds queued events in.
    ///
    /// Events for paths that are not immediate children of the watched
    /// directory are ignored (the watch is one directory level deep).
    pub fn apply_event(&self, kind: EventKind, path: impl Into<PathBuf>) {
        let path = path.into();
        let mut state = self.inner.lock_state();
        let Some(dir) = &state.dir else {
            return;
        };
        if path.parent() != Some(dir.as_path()) {
            tracing::trace!(
                "ignoring event outside {}: {}",
                dir.display(),
                path.display()
            );
            return;
        }

        state.pending.push(PendingEvent::new(kind, path));
        if state.phase == BatchPhase::Idle {
            state.phase = BatchPhase::Scheduled;
            let inner = Arc::clone(&self.inner);
            let epoch = state.epoch;
            self.inner
                .runtime
                .spawn(async move { process_batches(inner, epoch).await });
        }
    }

    /// Re-sort the existing snapshot in place and publish it. Does not touch
    /// the filesystem.
    pub fn set_sort_policy(&self, sort: SortPolicy) {
        let mut state = self.inner.lock_state();
        state.sort = sort;
        state.snapshot.sort(&sort);
        self.inner.publish(&state);
    }
}

/// The delayed batch task: wait out the debounce, then drain-and-apply until
/// the queue stays empty. Sustained bursts are handled as repeated short
/// batches, so no single pass grows unbounded.
async fn process_batches(inner: Arc<Inner>, epoch: u64) {
    tokio::time::sleep(inner.debounce).await;

    loop {
        let batch = {
            let mut state = inner.lock_state();
            if state.epoch != epoch {
                return;
            }
            if state.pending.is_empty() {
                state.phase = BatchPhase::Idle;
                return;
            }
            state.phase = BatchPhase::Processing;
            std::mem::take(&mut state.pending)
        };

        // Resolve against the filesystem outside the lock. A failure drops
        // only that event; the rest of the batch still applies.
        let mut resolved = Vec::with_capacity(batch.len());
        for event in &batch {
            match event.resolve() {
                Some(op) => resolved.push(op),
                None => tracing::debug!(
                    "dropping {:?} for vanished path {}",
                    event.kind,
                    event.path.display()
                ),
            }
        }

        let mut state = inner.lock_state();
        if state.epoch != epoch {
            return;
        }
        state.snapshot.apply(resolved);
        let sort = state.sort;
        state.snapshot.sort(&sort);
        inner.publish(&state);
        // Loop back for anything that arrived while this batch was applied;
        // the empty-queue check above returns the machine to Idle.
    }
}
