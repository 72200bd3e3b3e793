use std::collections::VecDeque;

/// Bounded FIFO buffer; appending past capacity evicts the oldest entry
#[derive(Debug, Clone)]
pub struct EventBuffer<T> {
    /// Internal storage, oldest at the front
    buffer: VecDeque<T>,
    /// Maximum capacity
    capacity: usize,
    /// Number of entries evicted since creation
    evicted: u64,
}

impl<T: Clone> EventBuffer<T> {
    /// Create a buffer holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            evicted: 0,
        }
    }

    /// Append an entry, evicting the oldest when full
    pub fn append(&mut self, event: T) {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
            self.evicted += 1;
        }
        self.buffer.push_back(event);
    }

    /// Owned copy of the current contents in insertion order
    pub fn snapshot(&self) -> Vec<T> {
        self.buffer.iter().cloned().collect()
    }

    /// Owned copy of the last `limit` entries, oldest first
    pub fn recent(&self, limit: usize) -> Vec<T> {
        let skip = self.buffer.len().saturating_sub(limit);
        self.buffer.iter().skip(skip).cloned().collect()
    }

    pub fn latest(&self) -> Option<&T> {
        self.buffer.back()
    }

    /// The value stored immediately before the latest one
    pub fn previous(&self) -> Option<&T> {
        let len = self.buffer.len();
        if len < 2 {
            None
        } else {
            self.buffer.get(len - 2)
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}
