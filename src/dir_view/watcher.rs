//! Live change notifications for a single directory level.
//!
//! Wraps `notify` behind the crate's own event kinds so the reconciler's
//! batching and sorting logic stays independent of the OS notification
//! mechanism and can be driven by a synthetic source in tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind as NotifyKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;

use crate::dir_view::snapshot::EventKind;

/// Errors from starting or maintaining a directory watch. Callers degrade to
/// "no live updates" rather than failing the initial listing.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to create watcher: {0}")]
    Creation(#[from] notify::Error),

    #[error("failed to watch {path}: {source}")]
    WatchPath {
        path: PathBuf,
        source: notify::Error,
    },
}

/// Callback invoked for each translated change notification. Delivered on the
/// watcher's own thread; implementations must only enqueue.
pub type EventSink = Arc<dyn Fn(EventKind, PathBuf) + Send + Sync>;

/// Keeps a directory watch alive. Stopping (or dropping) it unwatches.
pub struct WatchHandle {
    watcher: RecommendedWatcher,
    path: PathBuf,
    stopped: bool,
}

impl WatchHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        if let Err(err) = self.watcher.unwatch(&self.path) {
            tracing::debug!("unwatch {} failed: {}", self.path.display(), err);
        }
        self.stopped = true;
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Start watching one directory level (non-recursive), delivering translated
/// events to `sink`. The stream is best-effort: the OS may drop, duplicate,
/// or coalesce events.
pub fn watch_directory(path: &Path, sink: EventSink) -> Result<WatchHandle, WatchError> {
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                for (kind, path) in translate(&event) {
                    sink(kind, path);
                }
            }
            Err(err) => tracing::warn!("watch stream error: {err}"),
        },
        Config::default(),
    )?;

    watcher
        .watch(path, RecursiveMode::NonRecursive)
        .map_err(|source| WatchError::WatchPath {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!("watching {}", path.display());

    Ok(WatchHandle {
        watcher,
        path: path.to_path_buf(),
        stopped: false,
    })
}

/// Translate a raw notify event into per-path change kinds.
fn translate(event: &Event) -> Vec<(EventKind, PathBuf)> {
    match event.kind {
        NotifyKind::Create(_) => tag_all(event, EventKind::Created),
        NotifyKind::Remove(_) => tag_all(event, EventKind::Deleted),
        NotifyKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            tag_all(event, EventKind::RenamedOut)
        }
        NotifyKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            tag_all(event, EventKind::RenamedIn)
        }
        NotifyKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            // Paths arrive as [from, to].
            let mut out = Vec::with_capacity(2);
            if let Some(from) = event.paths.first() {
                out.push((EventKind::RenamedOut, from.clone()));
            }
            if let Some(to) = event.paths.get(1) {
                out.push((EventKind::RenamedIn, to.clone()));
            }
            out
        }
        NotifyKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| {
                if p.exists() {
                    (EventKind::RenamedIn, p.clone())
                } else {
                    (EventKind::RenamedOut, p.clone())
                }
            })
            .collect(),
        NotifyKind::Modify(_) => tag_all(event, EventKind::Modified),
        NotifyKind::Access(_) => Vec::new(),
        NotifyKind::Other | NotifyKind::Any => event
            .paths
            .iter()
            .map(|p| {
                if p.exists() {
                    (EventKind::Modified, p.clone())
                } else {
                    (EventKind::Deleted, p.clone())
                }
            })
            .collect(),
    }
}

fn tag_all(event: &Event, kind: EventKind) -> Vec<(EventKind, PathBuf)> {
    event.paths.iter().map(|p| (kind, p.clone())).collect()
}
