//! Control plane: turns lifecycle events into limiter swaps and stops.
//!
//! Events are handled one at a time by [`ControlPlane::run`]. A reload swaps
//! the limiter through the [`LimiterHandle`] without touching the delivery
//! loop; a graceful stop drains the [`Server`]; a hard stop aborts it.

use crate::config::{load_rate, ConfigSource};
use crate::error::{ConfigError, ServerError};
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::limiter_handle::LimiterHandle;
use crate::server::{DeliveryReport, Server};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, OnceCell};
use tracing::{debug, error, info, warn};

/// An externally triggered lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEvent {
    /// Re-read configuration and swap the limiter.
    Reload,
    /// Stop accepting work, drain in-flight work, then stop.
    GracefulStop,
    /// Stop immediately without draining.
    HardStop,
    /// Anything else; logged and ignored.
    Unrecognized(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopKind {
    Graceful,
    Hard,
}

/// How the consumer stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopOutcome {
    pub kind: StopKind,
    /// Drain result. For a hard stop nothing is drained; the report carries
    /// the delivered count at abort time and no discard count.
    pub drain: Result<DeliveryReport, ServerError>,
}

impl StopOutcome {
    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> i32 {
        match (self.kind, &self.drain) {
            (StopKind::Graceful, Ok(_)) => 0,
            (StopKind::Graceful, Err(_)) => 2,
            (StopKind::Hard, _) => 1,
        }
    }
}

/// Owns the lifecycle and applies control events to the running consumer.
pub struct ControlPlane {
    limiter: LimiterHandle,
    server: Arc<Server>,
    source: Arc<dyn ConfigSource>,
    lifecycle: Arc<Lifecycle>,
    drain_timeout: Option<Duration>,
    graceful: OnceCell<StopOutcome>,
}

impl ControlPlane {
    pub fn new(limiter: LimiterHandle, server: Arc<Server>, source: Arc<dyn ConfigSource>) -> Self {
        Self {
            limiter,
            server,
            source,
            lifecycle: Arc::new(Lifecycle::new()),
            drain_timeout: None,
            graceful: OnceCell::new(),
        }
    }

    /// Bounds how long a graceful stop waits for in-flight work.
    #[must_use]
    pub fn with_drain_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.drain_timeout = timeout;
        self
    }

    pub fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.lifecycle
    }

    pub fn limiter(&self) -> &LimiterHandle {
        &self.limiter
    }

    /// Applies one event. Returns `Some` once the consumer has stopped.
    pub async fn handle(&self, event: ControlEvent) -> Option<StopOutcome> {
        match event {
            ControlEvent::Reload => {
                let state = self.lifecycle.state();
                if state != LifecycleState::Running {
                    debug!(%state, "ignoring reload, not running");
                    return None;
                }
                if let Err(e) = self.reload() {
                    error!(error = %e, source = %self.source.describe(), "reload failed, keeping current rate");
                }
                None
            }
            ControlEvent::GracefulStop => Some(self.graceful_stop().await),
            ControlEvent::HardStop => Some(self.hard_stop()),
            ControlEvent::Unrecognized(name) => {
                warn!(event = %name, "ignoring unrecognized control event");
                None
            }
        }
    }

    /// Re-reads the rate and swaps the limiter. Returns the new rate.
    ///
    /// On error the installed limiter is left as it was.
    pub fn reload(&self) -> Result<u32, ConfigError> {
        let rate = load_rate(self.source.as_ref())?;
        let previous = self.limiter.reload(rate)?;
        info!(previous, rate, "rate limit reloaded");
        Ok(rate)
    }

    /// Drains the server and moves to `Stopped`.
    ///
    /// Concurrent and repeated callers share one drain and get the same
    /// outcome. If a hard stop already happened, reports that instead.
    pub async fn graceful_stop(&self) -> StopOutcome {
        self.graceful.get_or_init(|| self.drain()).await.clone()
    }

    async fn drain(&self) -> StopOutcome {
        if !self.lifecycle.advance(LifecycleState::Draining) {
            return self.hard_outcome();
        }
        info!(deadline = ?self.drain_timeout, "graceful stop, draining");

        let drain = self.server.shutdown(self.drain_timeout).await;
        if let Err(e) = &drain {
            error!(error = %e, "drain did not complete cleanly");
        }

        self.lifecycle.advance(LifecycleState::Stopped);
        info!("stopped");
        StopOutcome {
            kind: StopKind::Graceful,
            drain,
        }
    }

    /// Stops immediately. In-flight receives are aborted, queued messages
    /// are not processed.
    pub fn hard_stop(&self) -> StopOutcome {
        if self.lifecycle.advance(LifecycleState::Stopped) {
            warn!("hard stop, aborting delivery");
        }
        self.server.abort();
        self.hard_outcome()
    }

    fn hard_outcome(&self) -> StopOutcome {
        StopOutcome {
            kind: StopKind::Hard,
            drain: Ok(DeliveryReport {
                delivered: self.server.metrics().delivered(),
                discarded: 0,
            }),
        }
    }

    /// Processes events until the consumer stops.
    ///
    /// If the event channel closes, no further event can arrive, so this
    /// performs a graceful stop. A hard stop received while draining cuts the
    /// drain short.
    pub async fn run(&self, mut events: mpsc::Receiver<ControlEvent>) -> StopOutcome {
        info!(rate = self.limiter.rate(), "control plane running");
        loop {
            let Some(event) = events.recv().await else {
                info!("control channel closed");
                return self.graceful_stop().await;
            };
            debug!(?event, "control event");

            match event {
                ControlEvent::GracefulStop => return self.drain_watching(&mut events).await,
                other => {
                    if let Some(outcome) = self.handle(other).await {
                        return outcome;
                    }
                }
            }
        }
    }

    async fn drain_watching(&self, events: &mut mpsc::Receiver<ControlEvent>) -> StopOutcome {
        let drain = self.graceful_stop();
        tokio::pin!(drain);
        let mut open = true;

        loop {
            tokio::select! {
                outcome = &mut drain => return outcome,
                event = events.recv(), if open => match event {
                    Some(ControlEvent::HardStop) => return self.hard_stop(),
                    Some(event) => debug!(?event, "ignoring event while draining"),
                    None => open = false,
                },
            }
        }
    }
}
