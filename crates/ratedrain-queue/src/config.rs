//! Configuration for queue construction.

use crate::error::QueueError;

/// Default number of buffered items.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Configuration for a bounded queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl QueueConfig {
    /// Creates a configuration holding at most `capacity` items.
    ///
    /// A zero capacity would make every `send()` wait forever, so it is rejected.
    pub fn new(capacity: usize) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::ZeroCapacity);
        }
        Ok(Self { capacity })
    }

    /// Maximum number of buffered items.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
