//! Process wiring: settings, component construction, and the seeding producer.

use crate::config::{load_rate, ConfigSource};
use crate::consumer::{ConsumerMetrics, Processor};
use crate::control::{ControlEvent, ControlPlane, StopOutcome};
use crate::error::StartError;
use crate::lifecycle::Lifecycle;
use crate::limiter_handle::LimiterHandle;
use crate::logging::LogFormat;
use crate::message::Message;
use crate::rate_limiter::RateLimiter;
use crate::server::{DeliveryMetrics, Server, ServerConfig};
use clap::Parser;
use ratedrain_queue::{channel, QueueConfig, QueueSender, DEFAULT_CAPACITY};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Command-line settings. Every flag can also be set from the environment.
///
/// The rate itself is not a flag: it lives in the env file so it can be
/// reloaded.
#[derive(Debug, Clone, Parser)]
#[command(name = "ratedrain", version, about = "Rate-limited queue consumer")]
pub struct Settings {
    /// Dotenv-style file holding RATELIMIT, re-read on every reload
    #[arg(long, env = "RATEDRAIN_ENV_FILE", default_value = ".env")]
    pub env_file: PathBuf,

    /// Number of demo messages to enqueue at startup
    #[arg(long, env = "RATEDRAIN_MESSAGES", default_value_t = 100_000)]
    pub messages: u64,

    /// Queue capacity
    #[arg(long, env = "RATEDRAIN_QUEUE_CAPACITY", default_value_t = DEFAULT_CAPACITY)]
    pub queue_capacity: usize,

    /// Maximum concurrent receives
    #[arg(long, env = "RATEDRAIN_CONCURRENCY", default_value_t = 1)]
    pub concurrency: usize,

    /// Upper bound on graceful drain, in milliseconds (unbounded if unset)
    #[arg(long, env = "RATEDRAIN_DRAIN_TIMEOUT_MS")]
    pub drain_timeout_ms: Option<u64>,

    /// Log output format
    #[arg(long, env = "RATEDRAIN_LOG_FORMAT", value_enum, default_value_t = LogFormat::Auto)]
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env_file: PathBuf::from(".env"),
            messages: 100_000,
            queue_capacity: DEFAULT_CAPACITY,
            concurrency: 1,
            drain_timeout_ms: None,
            log_format: LogFormat::Auto,
        }
    }
}

impl Settings {
    pub fn drain_timeout(&self) -> Option<Duration> {
        self.drain_timeout_ms.map(Duration::from_millis)
    }
}

/// A running consumer: server serving, producer seeding, control plane ready.
pub struct Service {
    control: ControlPlane,
    processor: Arc<Processor>,
    server: Arc<Server>,
    producer: JoinHandle<u64>,
}

impl Service {
    /// Builds and starts every component. Must be called inside a tokio runtime.
    ///
    /// Fails if the initial rate cannot be loaded.
    pub fn start(settings: &Settings, source: Arc<dyn ConfigSource>) -> Result<Self, StartError> {
        let rate = load_rate(source.as_ref())?;
        let limiter = LimiterHandle::new(RateLimiter::new(rate)?);
        let queue_config = QueueConfig::new(settings.queue_capacity)?;

        let (tx, rx) = channel(queue_config);
        let server = Arc::new(Server::new(
            rx,
            ServerConfig {
                max_concurrency: settings.concurrency,
            },
        ));
        let processor = Arc::new(Processor::new(limiter.clone()));
        let control = ControlPlane::new(limiter, Arc::clone(&server), Arc::clone(&source))
            .with_drain_timeout(settings.drain_timeout());

        server.serve(Arc::clone(&processor))?;
        let producer = tokio::spawn(seed(tx, settings.messages));

        info!(
            rate,
            source = %source.describe(),
            capacity = settings.queue_capacity,
            concurrency = settings.concurrency,
            messages = settings.messages,
            "service started"
        );
        Ok(Self {
            control,
            processor,
            server,
            producer,
        })
    }

    /// Drives the control plane until the consumer stops.
    pub async fn run(self, events: mpsc::Receiver<ControlEvent>) -> StopOutcome {
        let outcome = self.control.run(events).await;
        self.producer.abort();
        info!(
            kind = ?outcome.kind,
            processed = self.processor.metrics().processed(),
            failed = self.processor.metrics().failed(),
            delivered = self.server.metrics().delivered(),
            "service finished"
        );
        outcome
    }

    pub fn metrics(&self) -> &Arc<ConsumerMetrics> {
        self.processor.metrics()
    }

    pub fn delivery_metrics(&self) -> &Arc<DeliveryMetrics> {
        self.server.metrics()
    }

    pub fn limiter(&self) -> &LimiterHandle {
        self.control.limiter()
    }

    pub fn lifecycle(&self) -> &Arc<Lifecycle> {
        self.control.lifecycle()
    }
}

/// Enqueues `count` demo messages. Stops quietly once the queue closes.
async fn seed(tx: QueueSender<Message>, count: u64) -> u64 {
    for i in 0..count {
        let message = Message::from(format!("<<hello world! i'm {i}>>")).with_attribute("seq", i.to_string());
        if tx.send(message).await.is_err() {
            debug!(sent = i, "queue closed, producer stopping");
            return i;
        }
    }
    debug!(sent = count, "producer finished");
    count
}
