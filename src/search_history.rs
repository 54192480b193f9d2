//! Persisted search history, most recent first.

use std::fs;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const MAX_HISTORY: usize = 10;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history file I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("history file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    queries: Vec<String>,
}

/// Recent search queries, deduplicated and capped at ten, written through to
/// a JSON file on every change.
#[derive(Debug)]
pub struct SearchHistory {
    path: PathBuf,
    queries: Vec<String>,
}

impl SearchHistory {
    /// Load history from `path`; an absent file starts an empty history.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let path = path.into();
        let queries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str::<HistoryFile>(&raw)?.queries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self { path, queries })
    }

    /// Most recent first.
    pub fn entries(&self) -> &[String] {
        &self.queries
    }

    /// Record a query. A repeat moves to the front instead of duplicating;
    /// blank queries are ignored.
    pub fn add(&mut self, query: &str) -> Result<(), HistoryError> {
        if query.trim().is_empty() {
            return Ok(());
        }
        self.queries.retain(|q| q != query);
        self.queries.insert(0, query.to_string());
        self.queries.truncate(MAX_HISTORY);
        self.save()
    }

    pub fn remove(&mut self, query: &str) -> Result<(), HistoryError> {
        let before = self.queries.len();
        self.queries.retain(|q| q != query);
        if self.queries.len() != before {
            self.save()?;
        }
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), HistoryError> {
        self.queries.clear();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self) -> Result<(), HistoryError> {
        let raw = serde_json::to_string(&HistoryFile {
            queries: self.queries.clone(),
        })?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}
