//! Deduplicating, priority-ordered refresh queue.
//!
//! Tasks are ordered by `(priority, enqueued_at, sequence)` ascending, so
//! equal priorities drain oldest-first. At most one pending task per key:
//! enqueuing a key that is already pending is a no-op. The queue is the
//! only structure shared between lookups and workers, guarded by its own
//! internal mutex; workers park on a `Notify` until work arrives.

use docvault_core::key::CacheKey;
use docvault_core::task::RefreshTask;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::sync::Mutex;
use tokio::sync::Notify;
use tracing::{debug, warn};

struct QueuedTask {
    task: RefreshTask,
    seq: u64,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for QueuedTask {}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.task.priority, self.task.enqueued_at, self.seq).cmp(&(
            other.task.priority,
            other.task.enqueued_at,
            other.seq,
        ))
    }
}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

struct QueueInner {
    heap: BinaryHeap<Reverse<QueuedTask>>,
    pending: HashSet<CacheKey>,
    seq: u64,
}

/// The shared refresh queue.
pub struct RefreshQueue {
    inner: Mutex<QueueInner>,
    notify: Notify,
    max_depth: usize,
}

impl RefreshQueue {
    /// Create a queue holding at most `max_depth` pending tasks.
    pub fn new(max_depth: usize) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                heap: BinaryHeap::new(),
                pending: HashSet::new(),
                seq: 0,
            }),
            notify: Notify::new(),
            max_depth,
        }
    }

    /// Add a task unless its key is already pending or the queue is full.
    ///
    /// Returns whether the task was actually added. Deduplication is
    /// mandatory: two concurrent stale hits for the same key produce one
    /// pending task, and the queue length is unchanged by the second.
    pub fn enqueue(&self, task: RefreshTask) -> bool {
        let mut inner = self.inner.lock().unwrap();

        if inner.pending.contains(&task.key) {
            debug!(key = %task.key, "Refresh already pending, skipping enqueue");
            return false;
        }
        if inner.heap.len() >= self.max_depth {
            warn!(key = %task.key, depth = self.max_depth, "Refresh queue full, dropping task");
            return false;
        }

        inner.pending.insert(task.key.clone());
        inner.seq += 1;
        let seq = inner.seq;
        inner.heap.push(Reverse(QueuedTask { task, seq }));
        drop(inner);

        self.notify.notify_one();
        true
    }

    /// Extract the highest-priority task, if any.
    ///
    /// The sole extraction primitive: the key leaves the pending set here,
    /// so a later stale hit for the same key may enqueue again.
    pub fn try_dequeue(&self) -> Option<RefreshTask> {
        let mut inner = self.inner.lock().unwrap();
        let Reverse(queued) = inner.heap.pop()?;
        inner.pending.remove(&queued.task.key);
        Some(queued.task)
    }

    /// Wait for the next task, parking until one is enqueued.
    pub async fn next(&self) -> RefreshTask {
        loop {
            if let Some(task) = self.try_dequeue() {
                return task;
            }
            self.notify.notified().await;
        }
    }

    /// Number of pending tasks.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
