//! The consumer side: the `Receiver` contract and the rate-limited `Processor`.
//!
//! The delivery server hands each message to a [`Receiver`]. [`Processor`]
//! is the production receiver: it checks cancellation, waits for a limiter
//! admission (the only point where it blocks), then runs a pluggable
//! [`MessageAction`].

use crate::cancel::Cancellation;
use crate::error::MessageError;
use crate::limiter_handle::LimiterHandle;
use crate::message::Message;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info};

/// Receives one delivered message at a time.
///
/// Uses native async fn in traits; the `+ Send` bound on the returned future
/// lets the server run receives on a multi-threaded runtime.
pub trait Receiver: Send + Sync + 'static {
    /// Handles one message.
    ///
    /// Must return `Ok(())` without doing any work if `cancel` has already
    /// fired. An `Err` marks this message as failed; the server logs it and
    /// moves on.
    fn receive(
        &self,
        cancel: &Cancellation,
        message: Message,
    ) -> impl Future<Output = Result<(), MessageError>> + Send;
}

/// The per-message work performed after admission.
pub trait MessageAction: Send + Sync + 'static {
    fn process(&self, message: &Message, admitted_at: Instant) -> Result<(), MessageError>;
}

impl<F> MessageAction for F
where
    F: Fn(&Message, Instant) -> Result<(), MessageError> + Send + Sync + 'static,
{
    fn process(&self, message: &Message, admitted_at: Instant) -> Result<(), MessageError> {
        self(message, admitted_at)
    }
}

/// Decodes the body as UTF-8 and logs it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogBody;

impl MessageAction for LogBody {
    fn process(&self, message: &Message, admitted_at: Instant) -> Result<(), MessageError> {
        let body = message.body_str()?;
        info!(body, admitted_at = ?admitted_at, "processing message");
        Ok(())
    }
}

/// Thread-safe consumer counters.
#[derive(Debug, Default)]
pub struct ConsumerMetrics {
    /// Messages admitted and processed successfully
    pub processed: AtomicU64,
    /// Messages admitted whose action failed
    pub failed: AtomicU64,
    /// Messages received after cancellation (no admission, no work)
    pub skipped: AtomicU64,
}

impl ConsumerMetrics {
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }
}

/// Processes messages as fast as the current limiter allows.
pub struct Processor<A = LogBody> {
    limiter: LimiterHandle,
    action: A,
    metrics: Arc<ConsumerMetrics>,
}

impl Processor<LogBody> {
    /// A processor that logs each message body.
    pub fn new(limiter: LimiterHandle) -> Self {
        Self::with_action(limiter, LogBody)
    }
}

impl<A: MessageAction> Processor<A> {
    pub fn with_action(limiter: LimiterHandle, action: A) -> Self {
        Self {
            limiter,
            action,
            metrics: Arc::new(ConsumerMetrics::default()),
        }
    }

    pub fn metrics(&self) -> &Arc<ConsumerMetrics> {
        &self.metrics
    }

    pub fn limiter(&self) -> &LimiterHandle {
        &self.limiter
    }
}

impl<A: MessageAction> Receiver for Processor<A> {
    async fn receive(&self, cancel: &Cancellation, message: Message) -> Result<(), MessageError> {
        if cancel.is_cancelled() {
            self.metrics.record_skipped();
            debug!(len = message.len(), "cancelled, message not processed");
            return Ok(());
        }

        // Load per message; never reuse a limiter across a reload.
        let limiter = self.limiter.current();
        let Some(admitted_at) = limiter.take_until(cancel).await else {
            self.metrics.record_skipped();
            debug!(len = message.len(), "cancelled while waiting for admission");
            return Ok(());
        };
        drop(limiter);

        match self.action.process(&message, admitted_at) {
            Ok(()) => {
                self.metrics.record_processed();
                Ok(())
            }
            Err(e) => {
                self.metrics.record_failed();
                Err(e)
            }
        }
    }
}
