//! Directory pre-creation and the bounded extraction scheduler.
//!
//! The only ordering guarantee in the whole pipeline lives here: every
//! directory entry is created synchronously, up front, before any file task
//! is spawned. Archive listings may order directories after the files inside
//! them, and two workers must never race to create a shared parent, so the
//! barrier is a single-threaded pass.
//!
//! After the barrier, one task per file entry is spawned into a [`JoinSet`]
//! and throttled by a semaphore of `workers` permits. Tasks are independent;
//! outcomes are drained in completion order, not submission order.

use std::fs;
use std::io;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::archive::{ArchiveReader, Entry, ExtractError};

/// Terminal result of one extraction task.
#[derive(Debug)]
pub struct TaskOutcome {
    pub entry_name: String,
    /// `None` on success, the captured failure otherwise.
    pub error: Option<ExtractError>,
}

/// Totals for one extraction run.
#[derive(Debug, Clone, Copy)]
pub struct ExtractSummary {
    /// Tasks submitted (file entries; directory entries are not tasks).
    pub total: usize,
    pub failed: usize,
}

/// Create the destination root and every directory entry beneath it.
///
/// Idempotent: existing directories are not an error, and running this twice
/// over the same destination changes nothing. Directory names that would
/// resolve outside the root are skipped with a warning. Any other I/O error
/// is fatal, since every subsequent file write depends on the tree existing.
pub fn create_directories(entries: &[Entry], dest_root: &Path) -> io::Result<()> {
    fs::create_dir_all(dest_root)?;
    for entry in entries.iter().filter(|e| e.is_dir) {
        match entry.resolved_path(dest_root) {
            Some(path) => fs::create_dir_all(&path)?,
            None => warn!(name = %entry.name, "skipping directory entry with unsafe path"),
        }
    }
    Ok(())
}

/// Fan out one task per file entry across a pool of `workers`, fan the
/// outcomes back in, and invoke `on_outcome` for each as it completes.
///
/// All tasks are submitted before the drain starts; the semaphore, not
/// submission, bounds concurrency. A failed entry never blocks or cancels
/// the others, and a panicked task is surfaced as a failed outcome rather
/// than lost.
pub async fn extract_archive<R, F>(
    reader: Arc<R>,
    dest_root: &Path,
    workers: NonZeroUsize,
    mut on_outcome: F,
) -> ExtractSummary
where
    R: ArchiveReader + ?Sized + 'static,
    F: FnMut(&TaskOutcome),
{
    let semaphore = Arc::new(Semaphore::new(workers.get()));
    let mut tasks: JoinSet<TaskOutcome> = JoinSet::new();

    for entry in reader.entries().iter().filter(|e| !e.is_dir).cloned() {
        let semaphore = Arc::clone(&semaphore);
        let reader = Arc::clone(&reader);
        let dest_root = dest_root.to_path_buf();
        tasks.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                // The semaphore is never closed; this arm is unreachable in
                // practice but must not panic a worker.
                Err(_) => {
                    return TaskOutcome {
                        entry_name: entry.name,
                        error: Some(ExtractError::Other("worker pool shut down".to_string())),
                    };
                }
            };
            let error = reader.extract_entry(&entry, &dest_root).await.err();
            TaskOutcome {
                entry_name: entry.name,
                error,
            }
        });
    }

    let total = tasks.len();
    debug!(total, workers = workers.get(), "submitted extraction tasks");

    let mut failed = 0;
    while let Some(joined) = tasks.join_next().await {
        let outcome = joined.unwrap_or_else(|e| TaskOutcome {
            entry_name: "<unknown entry>".to_string(),
            error: Some(ExtractError::Other(format!("extraction task panicked: {e}"))),
        });
        if outcome.error.is_some() {
            failed += 1;
        }
        on_outcome(&outcome);
    }

    ExtractSummary { total, failed }
}
