//! Producer side of the queue.

use crate::channel::Shared;
use crate::error::{QueueError, TrySendError};
#[cfg(debug_assertions)]
use crate::invariants::debug_assert_bounded;
use std::sync::Arc;

/// Cloneable producer handle.
///
/// When the queue is full, `send()` suspends until the receiver pulls an item
/// or the queue is closed.
pub struct QueueSender<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> QueueSender<T> {
    pub(crate) fn new(shared: Arc<Shared<T>>) -> Self {
        Self { shared }
    }

    /// Attempts to enqueue an item without waiting.
    ///
    /// The item is returned inside the error if the queue is full or closed.
    pub fn try_send(&self, item: T) -> Result<(), TrySendError<T>> {
        {
            let mut items = self.shared.items.lock();
            // Checked under the lock; `close()` flips the flag under the same lock.
            if self.shared.state.is_closed() {
                return Err(TrySendError::Closed(item));
            }
            if items.len() >= self.shared.capacity {
                return Err(TrySendError::Full(item));
            }
            items.push_back(item);

            #[cfg(debug_assertions)]
            debug_assert_bounded!(items.len(), self.shared.capacity);
        }

        self.shared.state.data_notify.notify_one();
        Ok(())
    }

    /// Enqueues an item, waiting for space if the queue is full.
    ///
    /// Fails with `QueueError::Closed` if the queue is closed before the item
    /// is accepted; in that case the item is dropped.
    pub async fn send(&self, item: T) -> Result<(), QueueError> {
        let mut item = item;

        loop {
            // Register interest before checking so a pull between the
            // check and the await still wakes us.
            let space = self.shared.state.space_notify.notified();
            tokio::pin!(space);
            space.as_mut().enable();

            match self.try_send(item) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Closed(_)) => return Err(QueueError::Closed),
                Err(TrySendError::Full(rejected)) => item = rejected,
            }

            space.await;
        }
    }

    /// Returns `true` if the queue no longer accepts items.
    pub fn is_closed(&self) -> bool {
        self.shared.state.is_closed()
    }

    /// Number of items currently buffered.
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// Returns `true` if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of buffered items.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }
}
