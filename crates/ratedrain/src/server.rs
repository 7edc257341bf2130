//! Delivery server: the background task that feeds queued messages to a
//! [`Receiver`].
//!
//! The delivery loop is a task owned by the [`Server`]. It is joined during
//! [`Server::shutdown`], so graceful shutdown has a deterministic completion
//! point instead of a fire-and-forget task.

use crate::cancel::Cancellation;
use crate::consumer::Receiver;
use crate::error::{MessageError, ServerError};
use crate::message::Message;
use parking_lot::Mutex;
use ratedrain_queue::{CloseSignal, QueueReceiver};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OnceCell, Semaphore};
use tokio::task::{AbortHandle, JoinError, JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

/// Configuration for the delivery server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum receives running at once. 1 keeps processing strictly FIFO.
    pub max_concurrency: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { max_concurrency: 1 }
    }
}

/// Delivery counters (atomics; updated from the delivery task).
#[derive(Debug, Default)]
pub struct DeliveryMetrics {
    /// Messages handed to the receiver
    pub delivered: AtomicU64,
    /// Receives that returned an error
    pub receive_errors: AtomicU64,
    /// Receives that panicked
    pub receive_panics: AtomicU64,
}

impl DeliveryMetrics {
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn receive_errors(&self) -> u64 {
        self.receive_errors.load(Ordering::Relaxed)
    }

    pub fn receive_panics(&self) -> u64 {
        self.receive_panics.load(Ordering::Relaxed)
    }
}

/// Outcome of a completed drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Messages handed to the receiver over the server's lifetime
    pub delivered: u64,
    /// Messages still queued at stop time and dropped unprocessed
    pub discarded: usize,
}

/// Runs the delivery loop for one queue.
pub struct Server {
    config: ServerConfig,
    receiver: Mutex<Option<QueueReceiver<Message>>>,
    close_signal: CloseSignal<Message>,
    cancel: Cancellation,
    task: Mutex<Option<JoinHandle<DeliveryReport>>>,
    /// Survives `drain` taking `task`, so a hard stop can cut a drain short.
    abort_handle: Mutex<Option<AbortHandle>>,
    stopped: OnceCell<Result<DeliveryReport, ServerError>>,
    metrics: Arc<DeliveryMetrics>,
}

impl Server {
    pub fn new(receiver: QueueReceiver<Message>, config: ServerConfig) -> Self {
        Self {
            config,
            close_signal: receiver.close_signal(),
            receiver: Mutex::new(Some(receiver)),
            cancel: Cancellation::new(),
            task: Mutex::new(None),
            abort_handle: Mutex::new(None),
            stopped: OnceCell::new(),
            metrics: Arc::new(DeliveryMetrics::default()),
        }
    }

    /// Starts delivering queued messages to `handler` on a background task.
    pub fn serve<R: Receiver>(&self, handler: Arc<R>) -> Result<(), ServerError> {
        if self.cancel.is_cancelled() {
            return Err(ServerError::ShutDown);
        }
        let receiver = self
            .receiver
            .lock()
            .take()
            .ok_or(ServerError::AlreadyServing)?;

        let task = tokio::spawn(deliver(
            receiver,
            handler,
            self.cancel.clone(),
            self.config.max_concurrency.max(1),
            Arc::clone(&self.metrics),
        ));
        *self.abort_handle.lock() = Some(task.abort_handle());
        *self.task.lock() = Some(task);

        info!(
            max_concurrency = self.config.max_concurrency,
            "delivery loop started"
        );
        Ok(())
    }

    /// Gracefully stops delivery.
    ///
    /// Closes the queue to new messages, requests cancellation, and waits
    /// for the delivery loop and its in-flight receives to finish, bounded
    /// by `deadline` if given. On expiry the loop is aborted and
    /// `DeadlineExceeded` is returned.
    ///
    /// Idempotent: concurrent and repeated calls all wait on the same single
    /// shutdown and get the same result.
    pub async fn shutdown(&self, deadline: Option<Duration>) -> Result<DeliveryReport, ServerError> {
        self.stopped
            .get_or_init(|| self.drain(deadline))
            .await
            .clone()
    }

    async fn drain(&self, deadline: Option<Duration>) -> Result<DeliveryReport, ServerError> {
        self.close_signal.close();
        self.cancel.cancel();

        let task = self.task.lock().take();
        let Some(mut task) = task else {
            // Never served: whatever is queued will not be processed.
            let discarded = self
                .receiver
                .lock()
                .as_ref()
                .map_or(0, QueueReceiver::discard_remaining);
            return Ok(DeliveryReport {
                delivered: 0,
                discarded,
            });
        };

        let joined = match deadline {
            None => (&mut task).await,
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    task.abort();
                    warn!(deadline = ?limit, "drain deadline exceeded, delivery loop aborted");
                    return Err(ServerError::DeadlineExceeded(limit));
                }
            },
        };

        let report = joined.map_err(|e| {
            if e.is_cancelled() {
                ServerError::ShutDown
            } else {
                ServerError::TaskFailed(e.to_string())
            }
        })?;
        info!(
            delivered = report.delivered,
            discarded = report.discarded,
            "delivery loop drained"
        );
        Ok(report)
    }

    /// Stops delivery immediately without waiting for in-flight receives.
    pub fn abort(&self) {
        self.close_signal.close();
        self.cancel.cancel();
        if let Some(handle) = self.abort_handle.lock().as_ref() {
            handle.abort();
        }
    }

    /// The cancellation observed by every receive this server starts.
    pub fn cancellation(&self) -> &Cancellation {
        &self.cancel
    }

    /// Handle for closing queue ingress.
    pub fn close_signal(&self) -> &CloseSignal<Message> {
        &self.close_signal
    }

    pub fn metrics(&self) -> &Arc<DeliveryMetrics> {
        &self.metrics
    }
}

/// The delivery loop: one concurrency slot, then one message, then one receive.
async fn deliver<R: Receiver>(
    receiver: QueueReceiver<Message>,
    handler: Arc<R>,
    cancel: Cancellation,
    max_concurrency: usize,
    metrics: Arc<DeliveryMetrics>,
) -> DeliveryReport {
    let slots = Arc::new(Semaphore::new(max_concurrency));
    let mut inflight: JoinSet<Result<(), MessageError>> = JoinSet::new();

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            // Reap completed receives (non-blocking)
            Some(joined) = inflight.join_next(), if !inflight.is_empty() => {
                record_receive(&metrics, joined);
            }

            permit = Arc::clone(&slots).acquire_owned() => {
                let Ok(permit) = permit else { break };

                // Wait for a message only once a slot is free, so messages
                // stay queued (and producers feel backpressure) until then.
                let message = tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    message = receiver.recv() => message,
                };
                let Some(message) = message else {
                    debug!("queue closed and drained");
                    break;
                };

                metrics.delivered.fetch_add(1, Ordering::Relaxed);
                let handler = Arc::clone(&handler);
                let cancel = cancel.clone();
                inflight.spawn(async move {
                    let result = handler.receive(&cancel, message).await;
                    drop(permit);
                    result
                });
            }
        }
    }

    // Wait for in-flight receives to complete
    while let Some(joined) = inflight.join_next().await {
        record_receive(&metrics, joined);
    }

    let discarded = receiver.discard_remaining();
    if discarded > 0 {
        warn!(discarded, "dropping messages still queued at stop");
    }

    DeliveryReport {
        delivered: metrics.delivered(),
        discarded,
    }
}

fn record_receive(metrics: &DeliveryMetrics, joined: Result<Result<(), MessageError>, JoinError>) {
    match joined {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            metrics.receive_errors.fetch_add(1, Ordering::Relaxed);
            warn!(error = %e, "message processing failed");
        }
        Err(e) => {
            metrics.receive_panics.fetch_add(1, Ordering::Relaxed);
            error!(error = %e, "receive task panicked");
        }
    }
}
