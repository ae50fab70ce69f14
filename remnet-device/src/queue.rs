use std::{
    collections::VecDeque,
    sync::atomic::{AtomicU64, Ordering},
};

use parking_lot::Mutex;
use tracing::warn;

/// The default maximum number of frames waiting to be handed to the simulation.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// A bounded FIFO handing items from a producer thread to the simulation thread.
///
/// When the queue is full the newest arrival is dropped; items already queued are never
/// evicted and the producer never blocks. Every operation holds the lock only for the
/// push or pop itself, items are released after the lock has been let go.
#[derive(Debug)]
pub struct HandoffQueue<T> {
    capacity: usize,
    items: Mutex<VecDeque<T>>,
    /// Number of items dropped because the queue was full.
    dropped: AtomicU64,
}

impl<T> HandoffQueue<T> {
    /// Creates an empty queue holding at most `capacity` items.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_QUEUE_CAPACITY))),
            dropped: AtomicU64::new(0),
        }
    }

    /// Appends `item`, or drops it if the queue is full. Returns `true` if it was queued.
    pub fn enqueue(&self, item: T) -> bool {
        let mut items = self.items.lock();
        if items.len() >= self.capacity {
            drop(items);

            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(capacity = self.capacity, dropped, "queue full, dropping frame");
            return false;
        }

        items.push_back(item);
        true
    }

    /// Pops the oldest item.
    pub fn dequeue(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Removes and releases every queued item, returning how many there were.
    pub fn drain(&self) -> usize {
        let items = std::mem::take(&mut *self.items.lock());
        items.len()
    }

    /// Number of items currently queued.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Maximum number of queued items.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total number of items dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
