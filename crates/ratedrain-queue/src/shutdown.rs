//! Close coordination between producers and the consumer.

use crate::channel::Shared;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Shared close state and wakeup channels.
#[derive(Debug)]
pub(crate) struct ShutdownState {
    /// Flag indicating the queue accepts no further items.
    closed: AtomicBool,
    /// Wakes the receiver when an item arrives or the queue closes.
    pub(crate) data_notify: Notify,
    /// Wakes senders parked on a full queue.
    pub(crate) space_notify: Notify,
}

impl ShutdownState {
    pub(crate) fn new() -> Self {
        Self {
            closed: AtomicBool::new(false),
            data_notify: Notify::new(),
            space_notify: Notify::new(),
        }
    }

    /// Marks the queue as closed. Returns `true` for the call that closed it.
    #[inline]
    pub(crate) fn mark_closed(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    /// Returns `true` if closed for new items.
    #[inline]
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Wakes every parked sender and the receiver so they observe the closed state.
    pub(crate) fn wake_all(&self) {
        self.space_notify.notify_waiters();
        self.data_notify.notify_waiters();
    }
}

/// A cloneable handle for closing the queue from anywhere.
///
/// Multiple clones can trigger the close - only the first one has effect,
/// subsequent calls are no-ops.
pub struct CloseSignal<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for CloseSignal<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> CloseSignal<T> {
    pub(crate) fn new(shared: Arc<Shared<T>>) -> Self {
        Self { shared }
    }

    /// Closes the queue for new items.
    ///
    /// Calling this will:
    /// 1. Reject every later `send()` / `try_send()` with `Closed`
    /// 2. Wake senders waiting for space so they fail instead of hanging
    /// 3. Let the receiver drain what is already buffered, then yield `None`
    ///
    /// Returns `true` if this call performed the close.
    pub fn close(&self) -> bool {
        self.shared.close()
    }

    /// Returns `true` if the queue has been closed.
    pub fn is_closed(&self) -> bool {
        self.shared.state.is_closed()
    }
}
