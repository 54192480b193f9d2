//! Bookkeeping for batch file-operation jobs.
//!
//! A job launched against many paths (compress, extract, copy, delete) gets
//! an opaque id; the worker retrieves the path list by id instead of having
//! it threaded through every hop. Each path may carry an optional display
//! name, used when an archive entry lands under a different name than its
//! source file.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use uuid::Uuid;

#[derive(Debug, Default)]
pub struct JobStore {
    jobs: Mutex<HashMap<Uuid, Vec<(PathBuf, Option<String>)>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Vec<(PathBuf, Option<String>)>>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_files_for_job(&self, files: impl IntoIterator<Item = PathBuf>) -> Uuid {
        self.add_file_pairs_for_job(files.into_iter().map(|path| (path, None)))
    }

    pub fn add_file_pairs_for_job(
        &self,
        files: impl IntoIterator<Item = (PathBuf, Option<String>)>,
    ) -> Uuid {
        let job_id = Uuid::new_v4();
        self.lock().insert(job_id, files.into_iter().collect());
        job_id
    }

    pub fn get_files_for_job(&self, job_id: Uuid) -> Vec<PathBuf> {
        self.get_file_pairs_for_job(job_id)
            .into_iter()
            .map(|(path, _)| path)
            .collect()
    }

    pub fn get_file_for_job(&self, job_id: Uuid) -> Option<PathBuf> {
        self.get_files_for_job(job_id).into_iter().next()
    }

    pub fn get_file_pairs_for_job(&self, job_id: Uuid) -> Vec<(PathBuf, Option<String>)> {
        self.lock().get(&job_id).cloned().unwrap_or_default()
    }

    pub fn delete_files_for_job(&self, job_id: Uuid) {
        self.lock().remove(&job_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_round_trip_by_job_id() {
        let store = JobStore::new();
        let job_id = store.add_files_for_job([
            PathBuf::from("/data/one.txt"),
            PathBuf::from("/data/two.txt"),
        ]);

        assert_eq!(
            store.get_files_for_job(job_id),
            [PathBuf::from("/data/one.txt"), PathBuf::from("/data/two.txt")]
        );
        assert_eq!(
            store.get_file_for_job(job_id),
            Some(PathBuf::from("/data/one.txt"))
        );
    }

    #[test]
    fn pairs_keep_their_display_names() {
        let store = JobStore::new();
        let job_id = store.add_file_pairs_for_job([
            (PathBuf::from("/data/a.zip"), Some("renamed.zip".to_string())),
            (PathBuf::from("/data/b.zip"), None),
        ]);

        let pairs = store.get_file_pairs_for_job(job_id);
        assert_eq!(pairs[0].1.as_deref(), Some("renamed.zip"));
        assert_eq!(pairs[1].1, None);
    }

    #[test]
    fn deleted_and_unknown_jobs_are_empty() {
        let store = JobStore::new();
        let job_id = store.add_files_for_job([PathBuf::from("/data/one.txt")]);

        store.delete_files_for_job(job_id);
        assert!(store.get_files_for_job(job_id).is_empty());
        assert!(store.get_files_for_job(Uuid::new_v4()).is_empty());
    }
}
