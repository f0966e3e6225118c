//! Bounded, never-blocking queues between capture and egress
//!
//! Audio uses drop-oldest with a small capacity: newer speech matters more
//! than a backlog in a live conversation. Video keeps only the latest frame.

use std::collections::VecDeque;

use super::payload::TimestampedPayload;

/// What to evict when a deposit finds the queue full
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPolicy {
    /// Discard the single oldest entry
    DropOldest,
    /// Discard whatever is queued; capacity is always 1
    LatestOnly,
}

/// FIFO with a fixed capacity and an eviction policy
#[derive(Debug)]
pub struct BoundedQueue<T> {
    items: VecDeque<T>,
    capacity: usize,
    policy: DropPolicy,
    drop_count: u64,
}

impl<T> BoundedQueue<T> {
    /// Drop-oldest queue; a zero capacity is raised to 1
    pub fn drop_oldest(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            policy: DropPolicy::DropOldest,
            drop_count: 0,
        }
    }

    /// Latest-only queue of capacity 1
    pub fn latest_only() -> Self {
        Self {
            items: VecDeque::with_capacity(1),
            capacity: 1,
            policy: DropPolicy::LatestOnly,
            drop_count: 0,
        }
    }

    /// Insert `item`, evicting per policy when full.
    ///
    /// Returns the evicted entry, if any. Never blocks.
    pub fn try_deposit(&mut self, item: T) -> Option<T> {
        let dropped = if self.items.len() >= self.capacity {
            match self.policy {
                DropPolicy::DropOldest => self.items.pop_front(),
                DropPolicy::LatestOnly => {
                    let newest = self.items.pop_back();
                    self.items.clear();
                    newest
                }
            }
        } else {
            None
        };

        if dropped.is_some() {
            self.drop_count += 1;
        }

        self.items.push_back(item);
        dropped
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Take everything currently queued, oldest first
    pub fn drain_available(&mut self) -> Vec<T> {
        self.items.drain(..).collect()
    }

    /// Discard the backlog at a turn boundary. Not counted as drops.
    pub fn clear(&mut self) -> usize {
        let discarded = self.items.len();
        self.items.clear();
        discarded
    }

    /// Count an item discarded downstream (e.g. over its age budget)
    pub fn record_drop(&mut self) {
        self.drop_count += 1;
    }

    pub fn drop_count(&self) -> u64 {
        self.drop_count
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Microphone chunks awaiting egress
pub type AudioQueue = BoundedQueue<TimestampedPayload>;

/// Screen frame awaiting egress
pub type VideoQueue = BoundedQueue<TimestampedPayload>;
