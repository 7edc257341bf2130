//! Rate Limiting
//!
//! [`RateLimiter`] paces admissions so that consecutive admissions are at
//! least `1/R` apart. Bursts are smoothed one admission at a time; there is
//! no burst allowance and idle periods do not bank credit.
//!
//! # Accounting
//!
//! The limiter keeps a single word of state: the offset (nanoseconds since the
//! limiter's epoch) of the last granted admission. Each caller reserves its
//! slot with a compare-and-swap:
//!
//! ```text
//! next = now                          (first admission)
//! next = max(now, last + 1/R)         (otherwise)
//! ```
//!
//! and then sleeps until `next`. While callers are queued the anchor is the
//! previously computed slot, not the wall clock, so the schedule does not
//! drift with wakeup latency. Reservation is lock-free, so any number of
//! tasks or threads may share one limiter.

use crate::cancel::Cancellation;
use crate::error::ConfigError;
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Sentinel for "nothing admitted yet".
const NO_ADMISSION: u64 = u64::MAX;

/// Paces admissions to at most `rate` per second.
///
/// # Example
///
/// ```ignore
/// let limiter = RateLimiter::new(100)?; // 100 admissions/sec = 10ms spacing
/// loop {
///     let admitted_at = limiter.take().await;
///     do_work(admitted_at);
/// }
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    rate: u32,
    interval: Duration,
    epoch: Instant,
    /// Offset of the last granted admission from `epoch`, in nanoseconds.
    last: CachePadded<AtomicU64>,
}

impl RateLimiter {
    /// Creates a limiter admitting at most `rate` operations per second.
    ///
    /// A zero rate is a configuration error, not something to clamp.
    pub fn new(rate: u32) -> Result<Self, ConfigError> {
        if rate == 0 {
            return Err(ConfigError::NonPositive { value: 0 });
        }

        Ok(Self {
            rate,
            interval: Duration::from_secs(1) / rate,
            epoch: Instant::now(),
            last: CachePadded::new(AtomicU64::new(NO_ADMISSION)),
        })
    }

    /// Carries `previous`'s last admission over into this (unused) limiter.
    ///
    /// The first admission under the new policy is then spaced by the new
    /// interval from the last admission made under the old one, instead of
    /// being granted immediately.
    pub fn continuing(mut self, previous: &RateLimiter) -> Self {
        self.epoch = previous.epoch;
        self.last = CachePadded::new(AtomicU64::new(previous.last.load(Ordering::Acquire)));
        self
    }

    /// Raises this limiter's last admission to `previous`'s, if that is later.
    ///
    /// Closes the window where a caller holding the old limiter reserves a
    /// slot after [`continuing`](Self::continuing) copied its state.
    pub(crate) fn absorb(&self, previous: &RateLimiter) {
        let theirs = match previous.last.load(Ordering::Acquire) {
            NO_ADMISSION => return,
            offset => self.offset_of(previous.epoch + Duration::from_nanos(offset)),
        };

        let mut ours = self.last.load(Ordering::Acquire);
        while ours == NO_ADMISSION || ours < theirs {
            match self
                .last
                .compare_exchange_weak(ours, theirs, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return,
                Err(actual) => ours = actual,
            }
        }
    }

    /// Target rate in admissions per second.
    #[inline]
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Minimum spacing between two admissions.
    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The most recently granted (possibly still pending) admission slot.
    pub fn last_admission(&self) -> Option<Instant> {
        match self.last.load(Ordering::Acquire) {
            NO_ADMISSION => None,
            offset => Some(self.epoch + Duration::from_nanos(offset)),
        }
    }

    /// Waits until the next admission is permitted and returns its instant.
    pub async fn take(&self) -> Instant {
        let admitted = self.reserve();
        tokio::time::sleep_until(admitted).await;
        admitted
    }

    /// Like [`take`](Self::take), but gives up as soon as `cancel` fires.
    ///
    /// Returns `None` without reserving anything if cancellation was already
    /// requested. A slot reserved before a mid-wait cancellation is not
    /// handed back; the wait is abandoned.
    pub async fn take_until(&self, cancel: &Cancellation) -> Option<Instant> {
        if cancel.is_cancelled() {
            return None;
        }

        let admitted = self.reserve();
        tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            () = tokio::time::sleep_until(admitted) => Some(admitted),
        }
    }

    /// Thread-blocking variant of [`take`](Self::take) for callers outside
    /// an async runtime.
    pub fn take_blocking(&self) -> Instant {
        let admitted = self.reserve();
        let wait = admitted.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
        admitted
    }

    /// Claims the next admission slot without waiting for it.
    fn reserve(&self) -> Instant {
        let now = self.offset_of(Instant::now());
        let interval = self.interval.as_nanos() as u64;

        let mut last = self.last.load(Ordering::Acquire);
        loop {
            let next = if last == NO_ADMISSION {
                now
            } else {
                now.max(last.saturating_add(interval))
            };

            match self
                .last
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return self.epoch + Duration::from_nanos(next),
                Err(actual) => last = actual,
            }
        }
    }

    fn offset_of(&self, instant: Instant) -> u64 {
        instant.saturating_duration_since(self.epoch).as_nanos() as u64
    }
}
