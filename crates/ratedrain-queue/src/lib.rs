//! Bounded async FIFO queue for ratedrain.
//!
//! A single-consumer queue with a fixed capacity. Producers hold cloneable
//! [`QueueSender`]s and are suspended while the queue is full; the consumer
//! holds the one [`QueueReceiver`] and pulls items in FIFO order.
//!
//! # Features
//!
//! - **Backpressure**: `send()` awaits when the queue is full, woken when the consumer pulls
//! - **Close/drain**: after close, senders fail with [`QueueError::Closed`] while the
//!   receiver still yields what was already buffered, then `None`
//! - **Cancel-safe receive**: dropping a pending `recv()` never loses an item
//!
//! # Example
//!
//! ```ignore
//! use ratedrain_queue::{channel, QueueConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (tx, rx) = channel::<u64>(QueueConfig::new(16).unwrap());
//!
//!     tx.send(42).await.unwrap();
//!     rx.close();
//!
//!     while let Some(item) = rx.recv().await {
//!         println!("Received: {}", item);
//!     }
//! }
//! ```

mod channel;
mod config;
mod error;
mod invariants;
mod receiver;
mod sender;
mod shutdown;

pub use channel::channel;
pub use config::{QueueConfig, DEFAULT_CAPACITY};
pub use error::{QueueError, TrySendError};
pub use receiver::QueueReceiver;
pub use sender::QueueSender;
pub use shutdown::CloseSignal;
