//! Cancellable, throttled filename search.
//!
//! Two modes share the same streaming contract: a recursive directory walk,
//! and a lookup against an [`EntryIndex`]. Partial result lists are emitted
//! at a bounded rate so a scan over a large tree cannot saturate the
//! consumer with thousands of individual matches; the accumulated set is
//! always emitted once more when the search finishes or is cancelled.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::dir_view::entry::Entry;

/// Minimum interval between partial-result emissions.
pub const EMIT_INTERVAL: Duration = Duration::from_millis(300);

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("index query failed: {0}")]
    Index(String),
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub show_hidden: bool,
    /// Stop after this many matches.
    pub limit: Option<usize>,
    pub emit_interval: Duration,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            show_hidden: false,
            limit: None,
            emit_interval: EMIT_INTERVAL,
        }
    }
}

/// Handle to a running search. Cancelling stops the producer at the next
/// file or directory boundary; results already emitted are the caller's to
/// discard, they are never retracted.
pub struct SearchSession {
    cancel: Arc<AtomicBool>,
}

impl SearchSession {
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

/// Index-backed lookup, the fast-search path. Stands in for a platform file
/// index; implementations do their own filtering and bounding.
#[async_trait]
pub trait EntryIndex: Send + Sync {
    async fn query(
        &self,
        name_contains: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Entry>, SearchError>;
}

/// Walk the tree under `root` for names containing `query`, case-insensitive.
///
/// A matching directory is itself a result and is still descended into; its
/// children may match independently. Partial lists stream on the returned
/// receiver, throttled to one emission per `emit_interval`.
pub fn search_walk(
    root: impl Into<PathBuf>,
    query: impl Into<String>,
    options: SearchOptions,
) -> (SearchSession, mpsc::Receiver<Vec<Entry>>) {
    let root = root.into();
    let needle = query.into().to_lowercase();
    let cancel = Arc::new(AtomicBool::new(false));
    let session = SearchSession {
        cancel: Arc::clone(&cancel),
    };
    let (tx, rx) = mpsc::channel(32);

    tokio::task::spawn_blocking(move || walk(root, needle, options, cancel, tx));
    (session, rx)
}

/// Query `index` for `query`, streaming matches with the same throttle as
/// the walk.
pub fn search_index(
    index: Arc<dyn EntryIndex>,
    query: impl Into<String>,
    options: SearchOptions,
) -> (SearchSession, mpsc::Receiver<Vec<Entry>>) {
    let query = query.into();
    let cancel = Arc::new(AtomicBool::new(false));
    let session = SearchSession {
        cancel: Arc::clone(&cancel),
    };
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        let mut results: Vec<Entry> = Vec::new();
        let mut last_emit: Option<Instant> = None;

        match index.query(&query, options.limit).await {
            Ok(matches) => {
                for entry in matches {
                    if cancel.load(Ordering::Relaxed) {
                        break;
                    }
                    results.push(entry);
                    if at_limit(&results, &options) {
                        break;
                    }
                    let now = Instant::now();
                    if emit_due(last_emit, now, options.emit_interval) {
                        if tx.send(results.clone()).await.is_err() {
                            break;
                        }
                        last_emit = Some(now);
                    }
                }
            }
            Err(err) => tracing::warn!("index search failed: {err}"),
        }

        let _ = tx.send(results).await;
    });
    (session, rx)
}

fn walk(
    root: PathBuf,
    needle: String,
    options: SearchOptions,
    cancel: Arc<AtomicBool>,
    tx: mpsc::Sender<Vec<Entry>>,
) {
    let mut results: Vec<Entry> = Vec::new();
    let mut last_emit: Option<Instant> = None;
    // Explicit work-stack: no call recursion, so pathological directory
    // depths cannot overflow the stack, and cancellation is a flag check.
    let mut stack = vec![root];

    'outer: while let Some(dir) = stack.pop() {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        let read = match std::fs::read_dir(&dir) {
            Ok(read) => read,
            Err(err) => {
                tracing::debug!("skipping unreadable {}: {}", dir.display(), err);
                continue;
            }
        };

        for dirent in read.filter_map(|e| e.ok()) {
            if cancel.load(Ordering::Relaxed) {
                break 'outer;
            }
            let Some(entry) = Entry::from_path(&dirent.path()) else {
                continue;
            };
            if !options.show_hidden && entry.is_hidden {
                continue;
            }

            let is_dir = entry.is_dir;
            let path = entry.path.clone();
            if entry.name.to_lowercase().contains(&needle) {
                results.push(entry);
                if at_limit(&results, &options) {
                    break 'outer;
                }
                let now = Instant::now();
                if emit_due(last_emit, now, options.emit_interval) {
                    if tx.blocking_send(results.clone()).is_err() {
                        break 'outer;
                    }
                    last_emit = Some(now);
                }
            }
            if is_dir {
                stack.push(path);
            }
        }
    }

    let _ = tx.blocking_send(results);
}

fn at_limit(results: &[Entry], options: &SearchOptions) -> bool {
    options.limit.is_some_and(|limit| results.len() >= limit)
}

fn emit_due(last_emit: Option<Instant>, now: Instant, interval: Duration) -> bool {
    last_emit.map_or(true, |t| now.duration_since(t) >= interval)
}

/// A simple in-memory name index, for tests and for hosts without a
/// system-provided file index.
#[derive(Default)]
pub struct InMemoryEntryIndex {
    entries: std::sync::Mutex<Vec<Entry>>,
}

impl InMemoryEntryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, entry: Entry) {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(entry);
    }
}

#[async_trait]
impl EntryIndex for InMemoryEntryIndex {
    async fn query(
        &self,
        name_contains: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Entry>, SearchError> {
        let needle = name_contains.to_lowercase();
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut matches: Vec<Entry> = entries
            .iter()
            .filter(|e| e.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        if let Some(limit) = limit {
            matches.truncate(limit);
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    async fn collect_final(mut rx: mpsc::Receiver<Vec<Entry>>) -> Vec<Entry> {
        let mut last = Vec::new();
        while let Some(batch) = rx.recv().await {
            last = batch;
        }
        last
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("a.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("sub").join("b.txt"), b"x").unwrap();
        dir
    }

    #[tokio::test]
    async fn walk_matches_are_case_insensitive_and_recursive() {
        let dir = fixture();
        let (_session, rx) = search_walk(dir.path(), "A", SearchOptions::default());

        let results = collect_final(rx).await;
        let mut paths: Vec<&Path> = results.iter().map(|e| e.path.as_path()).collect();
        paths.sort();

        assert_eq!(
            paths,
            [
                dir.path().join("a.txt").as_path(),
                dir.path().join("sub").join("a.txt").as_path(),
            ]
        );
    }

    #[tokio::test]
    async fn matching_directory_is_a_result_and_still_descended() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("cat")).unwrap();
        std::fs::write(dir.path().join("cat").join("catalog.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("cat").join("other.txt"), b"x").unwrap();

        let (_session, rx) = search_walk(dir.path(), "cat", SearchOptions::default());
        let results = collect_final(rx).await;
        let mut names: Vec<&str> = results.iter().map(|e| e.name.as_str()).collect();
        names.sort();

        assert_eq!(names, ["cat", "catalog.txt"]);
    }

    #[tokio::test]
    async fn hidden_entries_are_skipped_by_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".hidden-match.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("match.txt"), b"x").unwrap();

        let (_session, rx) = search_walk(dir.path(), "match", SearchOptions::default());
        let results = collect_final(rx).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "match.txt");
    }

    #[tokio::test]
    async fn limit_caps_the_result_set() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..10 {
            std::fs::write(dir.path().join(format!("match-{i}.txt")), b"x").unwrap();
        }

        let options = SearchOptions {
            limit: Some(3),
            ..SearchOptions::default()
        };
        let (_session, rx) = search_walk(dir.path(), "match", options);
        let results = collect_final(rx).await;

        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn cancelled_walk_still_emits_a_final_list_promptly() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..50 {
            let sub = dir.path().join(format!("sub-{i}"));
            std::fs::create_dir(&sub).unwrap();
            for j in 0..20 {
                std::fs::write(sub.join(format!("file-{j}.txt")), b"x").unwrap();
            }
        }

        let (session, rx) = search_walk(dir.path(), "file", SearchOptions::default());
        session.cancel();

        let results = tokio::time::timeout(Duration::from_secs(2), collect_final(rx))
            .await
            .expect("cancelled walk did not finish promptly");
        assert!(results.len() <= 1000);
        assert!(session.is_cancelled());
    }

    #[tokio::test]
    async fn index_search_streams_matches_with_limit() {
        let index = Arc::new(InMemoryEntryIndex::new());
        for i in 0..5 {
            index.insert(Entry {
                path: PathBuf::from(format!("/idx/report-{i}.pdf")),
                name: format!("report-{i}.pdf"),
                is_dir: false,
                size: 1,
                modified: None,
                extension: Some("pdf".into()),
                is_hidden: false,
            });
        }

        let options = SearchOptions {
            limit: Some(2),
            ..SearchOptions::default()
        };
        let (_session, rx) = search_index(index, "REPORT", options);
        let results = collect_final(rx).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|e| e.name.starts_with("report-")));
    }
}
