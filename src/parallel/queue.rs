//! Shared work queue for the dynamic distribution strategy
//!
//! All items are enqueued before any worker starts and the producing side is
//! closed immediately, so a worker that finds the queue empty knows no more
//! work will ever arrive. Completion is tracked separately from emptiness:
//! [`WorkQueue::join`] returns only once every dequeued item has been marked
//! done, not merely taken.

use crossbeam::channel::{Receiver, RecvTimeoutError, unbounded};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

use crate::discovery::WorkItem;

/// Multi-consumer FIFO of work items with a "all items done" signal
pub struct WorkQueue {
    receiver: Receiver<WorkItem>,
    idle_timeout: Duration,
    /// Items not yet marked done
    pending: Mutex<usize>,
    drained: Condvar,
    dequeued: AtomicUsize,
}

impl WorkQueue {
    /// Load every item up front and close the queue for writing
    pub fn preloaded(items: Vec<WorkItem>, idle_timeout: Duration) -> Self {
        let (sender, receiver) = unbounded();

        let mut enqueued = 0;
        for item in items {
            if sender.send(item).is_err() {
                break; // Receiver dropped
            }
            enqueued += 1;
        }
        drop(sender);

        Self {
            receiver,
            idle_timeout,
            pending: Mutex::new(enqueued),
            drained: Condvar::new(),
            dequeued: AtomicUsize::new(0),
        }
    }

    /// Take the next item, or `None` once the queue is drained
    ///
    /// Each item is handed to exactly one caller. Waits at most the idle
    /// timeout for an item to show up.
    pub fn pop(&self) -> Option<WorkItem> {
        match self.receiver.recv_timeout(self.idle_timeout) {
            Ok(item) => {
                self.dequeued.fetch_add(1, Ordering::Relaxed);
                Some(item)
            }
            Err(RecvTimeoutError::Disconnected) => None,
            Err(RecvTimeoutError::Timeout) => {
                tracing::debug!("Work queue idle for {:?}, stopping", self.idle_timeout);
                None
            }
        }
    }

    /// Mark one previously popped item as fully processed
    pub fn task_done(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.drained.notify_all();
        }
    }

    /// Block until every enqueued item has been marked done
    pub fn join(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        while *pending > 0 {
            pending = self
                .drained
                .wait(pending)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Drop every item still waiting and mark it done, returning how many
    ///
    /// Used when the run is being abandoned so that [`join`](Self::join)
    /// does not wait on items nobody will take.
    pub fn discard_remaining(&self) -> usize {
        let mut discarded = 0;
        while self.receiver.try_recv().is_ok() {
            discarded += 1;
            self.task_done();
        }
        discarded
    }

    /// Items still waiting to be popped
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Items not yet marked done, queued or in progress
    pub fn pending(&self) -> usize {
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Total items handed out so far
    pub fn dequeued(&self) -> usize {
        self.dequeued.load(Ordering::Relaxed)
    }
}
