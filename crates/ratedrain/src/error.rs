//! Error types shared across the consumer.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors. Fatal at startup, logged and ignored on reload.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The key is absent from every layer of the source.
    #[error("missing configuration key {key}")]
    Missing { key: String },

    /// The value is present but not an integer in range.
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },

    /// A rate must admit at least one operation per second.
    #[error("rate must be positive, got {value}")]
    NonPositive { value: i64 },

    /// The config file exists but could not be read.
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid `KEY=VALUE` syntax.
    #[error("failed to parse config file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

/// Failure of a single message. Logged and counted, never fatal.
#[derive(Debug, Error)]
pub enum MessageError {
    /// The body could not be decoded as UTF-8.
    #[error("could not read message body: {0}")]
    InvalidBody(#[from] std::str::Utf8Error),

    /// A pluggable action reported a failure.
    #[error("message action failed: {0}")]
    Action(String),
}

/// Errors from the delivery server.
///
/// `Clone` so that every concurrent caller of `shutdown()` gets the result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServerError {
    /// `serve()` was already called on this server.
    #[error("server is already serving")]
    AlreadyServing,

    /// The server has been shut down, or its delivery loop was aborted.
    #[error("server has been shut down")]
    ShutDown,

    /// In-flight deliveries did not finish before the drain deadline.
    #[error("drain did not complete within {0:?}")]
    DeadlineExceeded(Duration),

    /// The delivery task ended abnormally.
    #[error("delivery task failed: {0}")]
    TaskFailed(String),
}

/// Startup failures. All are fatal.
#[derive(Debug, Error)]
pub enum StartError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid queue settings: {0}")]
    Queue(#[from] ratedrain_queue::QueueError),

    #[error("failed to start delivery: {0}")]
    Server(#[from] ServerError),
}
