//! Rate-Limited Queue Consumer
//!
//! Pulls messages from a bounded in-process queue and processes each one no
//! faster than a configured rate. The rate can be reloaded while running, and
//! the consumer can be drained and stopped gracefully or aborted.
//!
//! # Components
//!
//! - [`RateLimiter`]: lock-free pacing, consecutive admissions at least `1/R` apart
//! - [`LimiterHandle`]: hot-swappable reference to the active limiter
//! - [`Processor`]: the consumer; cancellation check, admission, then work
//! - [`Server`]: the delivery loop feeding queued messages to a [`Receiver`]
//! - [`ControlPlane`]: maps reload/stop events onto the components
//! - [`Service`]: wires everything together for the `ratedrain` binary
//!
//! # Example
//!
//! ```ignore
//! use ratedrain::{ControlEvent, Service, Settings, StaticSource};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = Service::start(&Settings::default(), Arc::new(StaticSource::rate(5))).unwrap();
//!     let (events, rx) = tokio::sync::mpsc::channel(8);
//!     events.send(ControlEvent::GracefulStop).await.unwrap();
//!     let outcome = service.run(rx).await;
//!     std::process::exit(outcome.exit_code());
//! }
//! ```

pub mod bootstrap;
pub mod cancel;
pub mod config;
pub mod consumer;
pub mod control;
pub mod error;
pub mod lifecycle;
pub mod limiter_handle;
pub mod logging;
pub mod message;
pub mod rate_limiter;
pub mod server;
pub mod signals;

// Re-export main types
pub use bootstrap::{Service, Settings};
pub use cancel::Cancellation;
pub use config::{load_rate, parse_rate, ConfigSource, EnvFileSource, StaticSource, RATE_LIMIT_KEY};
pub use consumer::{ConsumerMetrics, LogBody, MessageAction, Processor, Receiver};
pub use control::{ControlEvent, ControlPlane, StopKind, StopOutcome};
pub use error::{ConfigError, MessageError, ServerError, StartError};
pub use lifecycle::{Lifecycle, LifecycleState};
pub use limiter_handle::LimiterHandle;
pub use logging::{init_logging, LogFormat};
pub use message::Message;
pub use rate_limiter::RateLimiter;
pub use server::{DeliveryMetrics, DeliveryReport, Server, ServerConfig};
pub use signals::spawn_signal_listener;
