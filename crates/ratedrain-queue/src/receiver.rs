//! Consumer side of the queue.

#[cfg(debug_assertions)]
use crate::invariants::debug_assert_closed_drained;
use crate::channel::Shared;
use crate::shutdown::CloseSignal;
use futures_core::Stream;
use std::sync::Arc;

/// The single consumer of a queue.
///
/// Items are yielded in FIFO order. After [`close()`](Self::close) the
/// receiver keeps yielding whatever was already buffered and then returns
/// `None`.
///
/// `QueueReceiver` does NOT implement `Clone`: there is exactly one consumer.
pub struct QueueReceiver<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> QueueReceiver<T> {
    pub(crate) fn new(shared: Arc<Shared<T>>) -> Self {
        Self { shared }
    }

    /// Receives the next item, waiting until one is available.
    ///
    /// Returns `None` once the queue is closed and fully drained.
    ///
    /// # Cancel safety
    ///
    /// An item is only removed from the buffer in the same poll that returns
    /// it, so dropping this future (e.g. in `tokio::select!`) never loses one.
    pub async fn recv(&self) -> Option<T> {
        loop {
            let arrived = self.shared.state.data_notify.notified();
            tokio::pin!(arrived);
            arrived.as_mut().enable();

            if let Some(item) = self.try_recv() {
                return Some(item);
            }

            if self.shared.state.is_closed() {
                // Nothing can be pushed after close, so one more look settles it.
                if let Some(item) = self.try_recv() {
                    return Some(item);
                }
                #[cfg(debug_assertions)]
                debug_assert_closed_drained!(self.shared.state.is_closed(), self.shared.len());
                return None;
            }

            arrived.await;
        }
    }

    /// Takes the front item if there is one, without waiting.
    pub fn try_recv(&self) -> Option<T> {
        let item = self.shared.items.lock().pop_front();
        if item.is_some() {
            // Relieve backpressure: parked senders re-check for space.
            self.shared.state.space_notify.notify_waiters();
        }
        item
    }

    /// Closes the queue for new items. Idempotent.
    ///
    /// Returns `true` if this call performed the close.
    pub fn close(&self) -> bool {
        self.shared.close()
    }

    /// Returns `true` if the queue has been closed.
    pub fn is_closed(&self) -> bool {
        self.shared.state.is_closed()
    }

    /// Returns a cloneable handle that can close the queue from another task.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let (tx, rx) = channel::<u64>(QueueConfig::default());
    /// let signal = rx.close_signal();
    ///
    /// tokio::spawn(async move {
    ///     tokio::time::sleep(Duration::from_secs(5)).await;
    ///     signal.close();
    /// });
    /// ```
    pub fn close_signal(&self) -> CloseSignal<T> {
        CloseSignal::new(Arc::clone(&self.shared))
    }

    /// Drops every buffered item and returns how many were dropped.
    ///
    /// Used after a stop decision when leftovers are not going to be processed.
    pub fn discard_remaining(&self) -> usize {
        let drained = std::mem::take(&mut *self.shared.items.lock());
        if !drained.is_empty() {
            self.shared.state.space_notify.notify_waiters();
        }
        drained.len()
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

    /// Converts the receiver into a `Stream` that ends when the queue is
    /// closed and drained.
    pub fn into_stream(self) -> impl Stream<Item = T> + Send {
        futures_util::stream::unfold(self, |rx| async move {
            let item = rx.recv().await?;
            Some((item, rx))
        })
    }
}
