//! Cooperative cancellation shared by the control plane and the consumer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// A cloneable cancellation flag with an async wait.
///
/// Multiple clones can trigger cancellation - only the first call has
/// effect, subsequent calls are no-ops. Cancellation never reverses.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    state: Arc<CancelState>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation and wakes every waiter.
    ///
    /// Returns `true` for the call that flipped the flag.
    pub fn cancel(&self) -> bool {
        let first = !self.state.cancelled.swap(true, Ordering::AcqRel);
        if first {
            self.state.notify.notify_waiters();
        }
        first
    }

    /// Returns `true` once cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }

    /// Completes once cancellation has been requested.
    ///
    /// Cancel-safe; completes immediately if already cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.state.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
