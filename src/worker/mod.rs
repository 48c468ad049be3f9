//! The per-thread conversion loop
//!
//! A [`Worker`] pulls items from a [`WorkSource`] one at a time, converts
//! each, and sends exactly one [`Outcome`] per item. Nothing that goes wrong
//! with a single item (I/O error, converter error, converter panic) leaves
//! the loop.

use crossbeam::channel::Sender;
use std::any::Any;
use std::fs;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::convert::{ConversionError, Converter};
use crate::discovery::{WorkItem, ensure_dir};
use crate::error::ItemError;
use crate::parallel::WorkQueue;
use crate::report::Outcome;

/// Where a worker gets its items from
pub trait WorkSource {
    /// Next item to process, `None` when the worker should stop
    fn next_item(&mut self) -> Option<WorkItem>;

    /// Called after the outcome for the last item has been reported
    fn item_done(&mut self) {}

    /// Called when the worker stops before the source is exhausted
    fn abandon(&mut self) {}
}

/// A static batch owned by one worker
impl WorkSource for std::vec::IntoIter<WorkItem> {
    fn next_item(&mut self) -> Option<WorkItem> {
        self.next()
    }
}

impl WorkSource for &WorkQueue {
    fn next_item(&mut self) -> Option<WorkItem> {
        self.pop()
    }

    fn item_done(&mut self) {
        self.task_done();
    }

    fn abandon(&mut self) {
        let discarded = self.discard_remaining();
        if discarded > 0 {
            tracing::warn!("Discarded {} queued items", discarded);
        }
    }
}

/// Marks the current item done when dropped
struct ItemDone<'s, S: WorkSource>(&'s mut S);

impl<S: WorkSource> Drop for ItemDone<'_, S> {
    fn drop(&mut self) {
        self.0.item_done();
    }
}

/// Per-worker counters returned when the loop ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub worker_id: usize,
    pub processed: usize,
    pub failed: usize,
}

pub struct Worker<'a, C: ?Sized> {
    id: usize,
    converter: &'a C,
}

impl<'a, C: Converter + ?Sized> Worker<'a, C> {
    pub fn new(id: usize, converter: &'a C) -> Self {
        Self { id, converter }
    }

    /// Process items until the source is exhausted
    pub fn run<S: WorkSource>(&self, mut source: S, outcomes: &Sender<Outcome>) -> WorkerStats {
        let mut stats = WorkerStats {
            worker_id: self.id,
            ..WorkerStats::default()
        };
        tracing::debug!("Worker {} started", self.id);

        while let Some(item) = source.next_item() {
            // Releases the item even if this thread unwinds before reporting
            let done = ItemDone(&mut source);
            let outcome = self.process(item);

            stats.processed += 1;
            if !outcome.success {
                stats.failed += 1;
            }

            let sent = outcomes.send(outcome).is_ok();
            drop(done);
            if !sent {
                tracing::warn!("Worker {}: result receiver dropped, stopping", self.id);
                source.abandon();
                break;
            }
        }

        tracing::debug!(
            "Worker {} finished: {} items, {} failed",
            self.id,
            stats.processed,
            stats.failed
        );
        stats
    }

    /// Convert a single item into its outcome
    pub fn process(&self, item: WorkItem) -> Outcome {
        match self.convert_item(&item) {
            Ok(bytes_written) => {
                tracing::debug!(
                    "[worker-{}] {} -> {}",
                    self.id,
                    item.input().display(),
                    item.output().display()
                );
                Outcome::converted(item, self.id, bytes_written)
            }
            Err(err) => {
                tracing::warn!("[worker-{}] {}", self.id, err);
                Outcome::failed(item, Some(self.id), err)
            }
        }
    }

    fn convert_item(&self, item: &WorkItem) -> Result<u64, ItemError> {
        let input = fs::read(item.input()).map_err(|source| ItemError::Read {
            path: item.input().to_path_buf(),
            source,
        })?;

        let converted = panic::catch_unwind(AssertUnwindSafe(|| self.converter.convert(&input)))
            .unwrap_or_else(|payload| Err(ConversionError::Other(panic_message(payload))))
            .map_err(|source| ItemError::Transform {
                path: item.input().to_path_buf(),
                source,
            })?;

        write_output(item.output(), &converted).map_err(|source| ItemError::Write {
            path: item.output().to_path_buf(),
            source,
        })?;

        Ok(converted.len() as u64)
    }
}

/// Write the whole output or nothing at all
///
/// The bytes go to a hidden sibling file that is renamed over `path` once
/// complete, so an existing output is always a finished one. The parent is
/// created here if the preparer did not.
fn write_output(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = match staging_file(parent) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            ensure_dir(parent)?;
            staging_file(parent)?
        }
        result => result?,
    };

    staged.write_all(contents)?;
    staged.flush()?;
    // On failure the staging file is removed when dropped
    staged.persist(path).map_err(|err| err.error)?;
    Ok(())
}

fn staging_file(dir: &Path) -> io::Result<NamedTempFile> {
    tempfile::Builder::new()
        .prefix(".batchconv-")
        .tempfile_in(dir)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let detail = if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    };
    format!("converter panicked: {detail}")
}
