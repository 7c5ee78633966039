//! Shared FIFO queues between the enumerator, the probe workers and the aggregator.
//!
//! # Design
//! - A single mutex guards each queue; `pop` hands every item to exactly one caller.
//! - A poisoned lock is recovered rather than propagated: the queue holds plain data
//!   and no invariant spans a panicking critical section.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use pathmap_fsops::RelativePath;
use tracing::error;

use crate::outcome::ProbeOutcome;

/// Pending relative paths for the current target.
pub type ProbeQueue = WorkQueue<RelativePath>;

/// Completed probe outcomes across all targets.
pub type ResultQueue = WorkQueue<ProbeOutcome>;

/// Thread-safe FIFO queue.
#[derive(Debug)]
pub struct WorkQueue<T> {
    items: Mutex<VecDeque<T>>,
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WorkQueue<T> {
    /// Create an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }

    /// Append one item.
    pub fn push(&self, item: T) {
        self.lock().push_back(item);
    }

    /// Append every item from `items`, preserving order.
    pub fn extend<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.lock().extend(items);
    }

    /// Remove and return the oldest item, or `None` when the queue is empty.
    pub fn pop(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Remove every queued item in FIFO order.
    pub fn drain(&self) -> Vec<T> {
        self.lock().drain(..).collect()
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` when nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        match self.items.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("work queue mutex poisoned; continuing with recovered guard");
                poisoned.into_inner()
            }
        }
    }
}
