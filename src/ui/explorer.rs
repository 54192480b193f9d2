//! Directory pane that renders published snapshots.
//!
//! The pane listens on the reconciler's broadcast channel and hands each
//! freshly sorted entry list to a render callback. It never mutates what it
//! receives; snapshots are shared read-only.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};

use crate::dir_view::entry::Entry;
use crate::dir_view::reconciler::SnapshotUpdate;

/// Callback invoked with each freshly published, sorted entry list.
pub type RenderCallback = Box<dyn Fn(&Path, &[Entry]) + Send + Sync>;

/// Callback invoked when the directory cannot be displayed.
pub type ErrorCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Display state of the list view.
#[derive(Debug, Clone, Default)]
pub struct ListViewState {
    pub dir: Option<PathBuf>,
    pub entries: Vec<Entry>,
    pub selected: Option<PathBuf>,
    /// Set when the directory could not be read; no list is rendered.
    pub error: Option<String>,
}

/// Cloneable handle to the list view, usable from listener tasks.
#[derive(Clone, Default)]
pub struct ListViewHandle {
    state: Arc<RwLock<ListViewState>>,
    render_cb: Option<Arc<RenderCallback>>,
    error_cb: Option<Arc<ErrorCallback>>,
}

impl ListViewHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_render_callback(&mut self, cb: RenderCallback) {
        self.render_cb = Some(Arc::new(cb));
    }

    pub fn set_error_callback(&mut self, cb: ErrorCallback) {
        self.error_cb = Some(Arc::new(cb));
    }

    /// Install a published snapshot and render it. A selection pointing at an
    /// entry that no longer exists is dropped.
    pub async fn show_snapshot(&self, update: &SnapshotUpdate) {
        {
            let mut state = self.state.write().await;
            state.dir = Some(update.dir.clone());
            state.entries = update.entries.to_vec();
            state.error = None;
            if let Some(selected) = &state.selected {
                if !update.entries.iter().any(|e| &e.path == selected) {
                    state.selected = None;
                }
            }
        }

        if let Some(cb) = &self.render_cb {
            cb(&update.dir, &update.entries);
        }
    }

    /// Switch to the cannot-access state: no list is shown until the next
    /// successful load.
    pub async fn show_error(&self, message: &str) {
        {
            let mut state = self.state.write().await;
            state.entries.clear();
            state.selected = None;
            state.error = Some(message.to_string());
        }

        if let Some(cb) = &self.error_cb {
            cb(message);
        }
    }

    pub async fn selected(&self) -> Option<PathBuf> {
        self.state.read().await.selected.clone()
    }

    pub async fn set_selected(&self, path: Option<PathBuf>) {
        self.state.write().await.selected = path;
    }

    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    pub async fn entries(&self) -> Vec<Entry> {
        self.state.read().await.entries.clone()
    }
}

/// Presenter component: one pane per visible directory view.
pub struct DirectoryPane {
    view: ListViewHandle,
    listener: Option<tokio::task::JoinHandle<()>>,
}

impl DirectoryPane {
    pub fn new() -> Self {
        Self {
            view: ListViewHandle::new(),
            listener: None,
        }
    }

    pub fn view(&self) -> &ListViewHandle {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ListViewHandle {
        &mut self.view
    }

    /// Start consuming published snapshots from `rx`.
    pub fn attach(&mut self, rx: broadcast::Receiver<SnapshotUpdate>) {
        let view = self.view.clone();
        let handle = tokio::spawn(async move {
            Self::listener_loop(view, rx).await;
        });
        self.listener = Some(handle);
    }

    async fn listener_loop(view: ListViewHandle, mut rx: broadcast::Receiver<SnapshotUpdate>) {
        loop {
            match rx.recv().await {
                Ok(update) => {
                    tracing::debug!(
                        "pane received {} entries for {}",
                        update.entries.len(),
                        update.dir.display()
                    );
                    view.show_snapshot(&update).await;
                }
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    // Every publish carries the whole list, so the next
                    // received snapshot catches the view up on its own.
                    tracing::warn!("pane lagged behind by {count} snapshots");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("snapshot channel closed, stopping pane listener");
                    break;
                }
            }
        }
    }

    pub async fn stop(&mut self) {
        if let Some(handle) = self.listener.take() {
            handle.abort();
            let _ = handle.await;
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listener
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Default for DirectoryPane {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder wiring render/error callbacks before the pane starts listening.
pub struct DirectoryPaneBuilder {
    render_cb: Option<RenderCallback>,
    error_cb: Option<ErrorCallback>,
}

impl DirectoryPaneBuilder {
    pub fn new() -> Self {
        Self {
            render_cb: None,
            error_cb: None,
        }
    }

    pub fn on_render(mut self, cb: RenderCallback) -> Self {
        self.render_cb = Some(cb);
        self
    }

    pub fn on_error(mut self, cb: ErrorCallback) -> Self {
        self.error_cb = Some(cb);
        self
    }

    pub fn build(self) -> DirectoryPane {
        let mut pane = DirectoryPane::new();
        if let Some(cb) = self.render_cb {
            pane.view_mut().set_render_callback(cb);
        }
        if let Some(cb) = self.error_cb {
            pane.view_mut().set_error_callback(cb);
        }
        pane
    }
}

impl Default for DirectoryPaneBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn update(dir: &str, names: &[&str]) -> SnapshotUpdate {
        let entries: Vec<Entry> = names
            .iter()
            .map(|name| Entry {
                path: PathBuf::from(format!("{dir}/{name}")),
                name: name.to_string(),
                is_dir: false,
                size: 0,
                modified: None,
                extension: None,
                is_hidden: false,
            })
            .collect();
        SnapshotUpdate {
            dir: PathBuf::from(dir),
            entries: Arc::from(entries.as_slice()),
        }
    }

    #[tokio::test]
    async fn listener_renders_published_snapshots() {
        let (tx, rx) = broadcast::channel::<SnapshotUpdate>(16);
        let rendered = Arc::new(AtomicUsize::new(0));
        let rendered_in_cb = Arc::clone(&rendered);

        let mut pane = DirectoryPaneBuilder::new()
            .on_render(Box::new(move |_dir, entries| {
                rendered_in_cb.store(entries.len(), Ordering::SeqCst);
            }))
            .build();
        pane.attach(rx);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(pane.is_listening());

        tx.send(update("/view", &["a.txt", "b.txt"])).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(rendered.load(Ordering::SeqCst), 2);
        assert_eq!(pane.view().entries().await.len(), 2);

        pane.stop().await;
        assert!(!pane.is_listening());
    }

    #[tokio::test]
    async fn stale_selection_is_dropped_on_update() {
        let view = ListViewHandle::new();
        view.show_snapshot(&update("/view", &["keep.txt", "gone.txt"]))
            .await;
        view.set_selected(Some(PathBuf::from("/view/gone.txt"))).await;

        view.show_snapshot(&update("/view", &["keep.txt"])).await;
        assert_eq!(view.selected().await, None);

        view.set_selected(Some(PathBuf::from("/view/keep.txt"))).await;
        view.show_snapshot(&update("/view", &["keep.txt"])).await;
        assert_eq!(view.selected().await, Some(PathBuf::from("/view/keep.txt")));
    }

    #[tokio::test]
    async fn error_state_clears_the_list() {
        let errors = Arc::new(AtomicUsize::new(0));
        let errors_in_cb = Arc::clone(&errors);

        let mut view = ListViewHandle::new();
        view.set_error_callback(Box::new(move |_message| {
            errors_in_cb.fetch_add(1, Ordering::SeqCst);
        }));

        view.show_snapshot(&update("/view", &["a.txt"])).await;
        view.show_error("permission denied").await;

        assert!(view.entries().await.is_empty());
        assert_eq!(view.error().await.as_deref(), Some("permission denied"));
        assert_eq!(errors.load(Ordering::SeqCst), 1);

        view.show_snapshot(&update("/view", &["a.txt"])).await;
        assert_eq!(view.error().await, None);
    }
}
