//! Error types for queue operations.

use std::fmt;
use thiserror::Error;

/// Errors that can occur in queue operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The queue has been closed for new items.
    #[error("queue is closed")]
    Closed,

    /// A queue must be able to hold at least one item.
    #[error("queue capacity must be at least 1")]
    ZeroCapacity,
}

/// Error returned by [`QueueSender::try_send`](crate::QueueSender::try_send).
///
/// The rejected item is handed back to the caller in both cases.
#[derive(PartialEq, Eq)]
pub enum TrySendError<T> {
    /// The queue is at capacity.
    Full(T),
    /// The queue has been closed.
    Closed(T),
}

impl<T> TrySendError<T> {
    /// Recovers the item that could not be enqueued.
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(item) | Self::Closed(item) => item,
        }
    }

    /// Returns `true` if the queue was full (retrying later may succeed).
    #[inline]
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }

    /// Returns `true` if the queue is permanently closed.
    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed(_))
    }
}

impl<T> fmt::Debug for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => f.write_str("Full(..)"),
            Self::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

impl<T> fmt::Display for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => f.write_str("queue is full"),
            Self::Closed(_) => f.write_str("queue is closed"),
        }
    }
}

impl<T> std::error::Error for TrySendError<T> {}
