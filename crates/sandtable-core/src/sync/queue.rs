use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Fixed-capacity FIFO with blocking, time-bounded insertion.
///
/// Producers block while the queue is full, which is how a slow consumer
/// throttles its producers. Items are only appended and removed, never
/// iterated from another thread.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    items: Mutex<VecDeque<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Create an empty queue holding at most `capacity` items (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity,
        }
    }

    /// Maximum number of items
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items currently queued
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Append an item, waiting up to `timeout` for a free slot.
    ///
    /// Hands the item back if the queue stayed full for the whole wait.
    pub fn push_timeout(&self, item: T, timeout: Duration) -> Result<(), T> {
        let deadline = Instant::now() + timeout;
        let mut items = self.items.lock();

        while items.len() >= self.capacity {
            if self.not_full.wait_until(&mut items, deadline).timed_out() {
                if items.len() >= self.capacity {
                    return Err(item);
                }
                break;
            }
        }

        items.push_back(item);
        drop(items);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Append an item only if a slot is free right now
    pub fn try_push(&self, item: T) -> Result<(), T> {
        self.push_timeout(item, Duration::ZERO)
    }

    /// Remove the oldest item without waiting
    pub fn try_pop(&self) -> Option<T> {
        let item = self.items.lock().pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Remove the oldest item, waiting up to `timeout` for one to arrive
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut items = self.items.lock();

        while items.is_empty() {
            if self.not_empty.wait_until(&mut items, deadline).timed_out() {
                break;
            }
        }

        let item = items.pop_front();
        drop(items);
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Drop every queued item, returning how many were removed
    pub fn clear(&self) -> usize {
        let removed = {
            let mut items = self.items.lock();
            let removed = items.len();
            items.clear();
            removed
        };
        self.not_full.notify_all();
        removed
    }
}
