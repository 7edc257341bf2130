//! Hot-swappable reference to the active [`RateLimiter`].
//!
//! Readers take an `Arc` snapshot per admission via `ArcSwap::load_full()`
//! (lock-free). A reload builds a complete limiter first and then swaps the
//! pointer, so no reader can observe a half-built limiter. Takes that are
//! already waiting on the old limiter hold their own `Arc` and finish under
//! the old policy.

use crate::error::ConfigError;
use crate::rate_limiter::RateLimiter;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Shared handle to the currently installed limiter. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LimiterHandle {
    inner: Arc<ArcSwap<RateLimiter>>,
}

impl LimiterHandle {
    /// Create a handle with the given initial limiter.
    #[must_use]
    pub fn new(limiter: RateLimiter) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(limiter)),
        }
    }

    /// The limiter to use for the next admission.
    ///
    /// Callers must not hold the snapshot across admissions; loading again
    /// picks up any reload.
    #[must_use]
    pub fn current(&self) -> Arc<RateLimiter> {
        self.inner.load_full()
    }

    /// Rate of the currently installed limiter.
    pub fn rate(&self) -> u32 {
        self.inner.load().rate()
    }

    /// Atomically replaces the installed limiter and returns the one it replaced.
    ///
    /// Any admission the replaced limiter granted up to the swap is folded
    /// into `limiter`, so the next admission is still spaced from it.
    pub fn install(&self, limiter: RateLimiter) -> Arc<RateLimiter> {
        let installed = Arc::new(limiter);
        let previous = self.inner.swap(Arc::clone(&installed));
        installed.absorb(&previous);
        previous
    }

    /// Installs a limiter for `rate`, continuing the current admission schedule.
    ///
    /// Returns the previous rate. On error the installed limiter is untouched.
    pub fn reload(&self, rate: u32) -> Result<u32, ConfigError> {
        let fresh = RateLimiter::new(rate)?;

        // Single writer (the control plane), so no other reload runs between
        // this load and the swap; concurrent readers only ever see old or new.
        let previous = self.current();
        let replaced = self.install(fresh.continuing(&previous));

        Ok(replaced.rate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::Instant;

    #[test]
    fn test_rejected_reload_keeps_current() {
        let handle = LimiterHandle::new(RateLimiter::new(5).unwrap());
        let before = handle.current();

        let result = handle.reload(0);
        assert!(matches!(result, Err(ConfigError::NonPositive { .. })));

        assert_eq!(handle.rate(), 5);
        assert!(Arc::ptr_eq(&before, &handle.current()));
    }

    #[test]
    fn test_reload_swaps_and_reports_previous() {
        let handle = LimiterHandle::new(RateLimiter::new(5).unwrap());
        let clone = handle.clone();

        assert_eq!(handle.reload(50).unwrap(), 5);
        assert_eq!(clone.rate(), 50);
        assert_eq!(clone.current().interval(), Duration::from_millis(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_take_finishes_under_old_policy() {
        let handle = LimiterHandle::new(RateLimiter::new(1).unwrap());
        let start = Instant::now();
        handle.current().take().await;

        // Second admission on the old limiter is due at +1s.
        let old = handle.current();
        let waiter = tokio::spawn(async move { old.take().await });
        tokio::task::yield_now().await;

        handle.reload(100).unwrap();

        let admitted = waiter.await.unwrap();
        assert_eq!(admitted - start, Duration::from_secs(1));

        // The new limiter continues from whatever slot the old one had handed
        // out at swap time, at the new spacing.
        let next = handle.current().take().await;
        assert!(next - start >= Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_admission_on_old_limiter_during_reload_is_kept() {
        let handle = LimiterHandle::new(RateLimiter::new(1).unwrap());
        let start = Instant::now();
        let old = handle.current();
        old.take().await;

        // The replacement copies the schedule, then a consumer still holding
        // the old snapshot is admitted before the swap lands.
        let fresh = RateLimiter::new(10).unwrap().continuing(&old);
        let straggler = old.take().await;
        assert_eq!(straggler - start, Duration::from_secs(1));

        let replaced = handle.install(fresh);
        assert!(Arc::ptr_eq(&replaced, &old));

        let next = handle.current().take().await;
        assert_eq!(next - straggler, Duration::from_millis(100));
    }
}
