//! Queue construction and the state shared by both ends.

use crate::config::QueueConfig;
use crate::receiver::QueueReceiver;
use crate::sender::QueueSender;
use crate::shutdown::ShutdownState;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Creates a new bounded queue.
///
/// Returns a cloneable `QueueSender` for producers and the single
/// `QueueReceiver` for the consumer.
///
/// # Example
///
/// ```ignore
/// use ratedrain_queue::{channel, QueueConfig};
///
/// let (tx, rx) = channel::<String>(QueueConfig::new(8).unwrap());
/// let tx2 = tx.clone(); // any number of producers
/// ```
pub fn channel<T: Send + 'static>(config: QueueConfig) -> (QueueSender<T>, QueueReceiver<T>) {
    let shared = Arc::new(Shared {
        items: Mutex::new(VecDeque::with_capacity(config.capacity())),
        capacity: config.capacity(),
        state: ShutdownState::new(),
    });

    (
        QueueSender::new(Arc::clone(&shared)),
        QueueReceiver::new(shared),
    )
}

/// Buffer plus close state, shared by every sender and the receiver.
///
/// The buffer lock is only held for a push or a pop, never across an await.
pub(crate) struct Shared<T> {
    pub(crate) items: Mutex<VecDeque<T>>,
    pub(crate) capacity: usize,
    pub(crate) state: ShutdownState,
}

impl<T> Shared<T> {
    /// Closes the queue. Returns `true` for the call that closed it.
    pub(crate) fn close(&self) -> bool {
        // Flip the flag under the buffer lock so no push can land after it.
        let newly_closed = {
            let _items = self.items.lock();
            self.state.mark_closed()
        };
        if newly_closed {
            self.state.wake_all();
        }
        newly_closed
    }

    pub(crate) fn len(&self) -> usize {
        self.items.lock().len()
    }
}
