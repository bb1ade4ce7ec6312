//! Bounded batches and on-disk progress for long data transforms.
//!
//! A progress log is a plain text file with one processed key per line,
//! appended after each committed batch. A retried run loads it and skips the
//! keys it lists; the file is removed once the migration completes.

use crate::error::{MigrateError, MigrateResult};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use wm_db::{transaction, Database};

pub struct ProgressLog {
    path: PathBuf,
    done: HashSet<String>,
}

impl ProgressLog {
    /// Open (or start) the progress log of `migration` under `dir`.
    pub fn open(dir: &Path, migration: &str) -> MigrateResult<Self> {
        let path = dir.join(format!("{migration}.progress"));
        let done = match fs::read_to_string(&path) {
            Ok(content) => content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => return Err(progress_error(&path, e)),
        };
        if !done.is_empty() {
            log::info!(
                "[{migration}] Resuming, {} record(s) already processed",
                done.len()
            );
        }
        Ok(Self { path, done })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_done(&self, key: &str) -> bool {
        self.done.contains(key)
    }

    pub fn done_count(&self) -> usize {
        self.done.len()
    }

    /// Append `keys` to the log and flush it.
    pub fn mark_done<I, S>(&mut self, keys: I) -> MigrateResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| progress_error(&self.path, e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| progress_error(&self.path, e))?;

        for key in keys {
            let key = key.into();
            writeln!(file, "{key}").map_err(|e| progress_error(&self.path, e))?;
            self.done.insert(key);
        }
        file.sync_data().map_err(|e| progress_error(&self.path, e))?;
        Ok(())
    }

    /// Delete the log once the migration has finished.
    pub fn finish(self) -> MigrateResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(progress_error(&self.path, e)),
        }
    }
}

fn progress_error(path: &Path, source: std::io::Error) -> MigrateError {
    MigrateError::Progress {
        path: path.display().to_string(),
        source,
    }
}

/// Process `items` in chunks of `batch_size`, one transaction per chunk.
///
/// Items whose key is already in `progress` are skipped. After a chunk
/// commits, its keys are appended to the log. Returns the number of items
/// processed in this run.
pub fn run_batches<T, K, F>(
    db: &dyn Database,
    items: &[T],
    batch_size: usize,
    progress: &mut ProgressLog,
    key: K,
    mut body: F,
) -> MigrateResult<usize>
where
    K: Fn(&T) -> String,
    F: FnMut(&dyn Database, &[&T]) -> MigrateResult<()>,
{
    let pending: Vec<&T> = items.iter().filter(|i| !progress.is_done(&key(i))).collect();
    let batch_size = batch_size.max(1);

    let mut processed = 0;
    for chunk in pending.chunks(batch_size) {
        transaction(db, |tx| body(tx, chunk))?;
        progress.mark_done(chunk.iter().map(|i| key(i)))?;
        processed += chunk.len();
        log::debug!("Processed {processed}/{} record(s)", pending.len());
    }
    Ok(processed)
}

#[cfg(test)]
#[path = "batch_test.rs"]
mod tests;
