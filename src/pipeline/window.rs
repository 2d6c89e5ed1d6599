//! Rolling window of the most recent sample batches for one machine.

use std::collections::VecDeque;

use crate::config::defaults::WINDOW_DEPTH;
use crate::types::{RawBatch, RawSample};

/// FIFO of at most `capacity` batches; the oldest batch is evicted on overflow.
///
/// Owned by exactly one worker, so there is no interior locking.
#[derive(Debug, Clone)]
pub struct WindowBuffer {
    batches: VecDeque<RawBatch>,
    capacity: usize,
}

impl WindowBuffer {
    /// A capacity of 0 is bumped to 1; the window always holds the newest batch.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            batches: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert the newest batch, evicting the oldest when full.
    pub fn append(&mut self, batch: RawBatch) {
        if self.batches.len() >= self.capacity {
            self.batches.pop_front();
        }
        self.batches.push_back(batch);
    }

    /// All buffered samples, oldest batch first, arrival order within a batch.
    pub fn snapshot(&self) -> Vec<RawSample> {
        let mut out = Vec::with_capacity(self.sample_count());
        for batch in &self.batches {
            out.extend_from_slice(batch);
        }
        out
    }

    /// Buffered batches.
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.batches.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Buffered samples across all batches.
    pub fn sample_count(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }

    pub fn clear(&mut self) {
        self.batches.clear();
    }
}

impl Default for WindowBuffer {
    fn default() -> Self {
        Self::new(WINDOW_DEPTH)
    }
}
