//! Loom model of the limiter's admission reservation.
//!
//! Run with: `cargo test -p ratedrain --features loom --test loom_tests --release`
//!
//! The real limiter reads a tokio clock, which loom cannot drive, so the
//! protocol is reproduced here with the clock passed in explicitly.

#![cfg(feature = "loom")]

use loom::sync::atomic::{AtomicU64, Ordering};
use loom::sync::Arc;
use loom::thread;

const NO_ADMISSION: u64 = u64::MAX;
const INTERVAL: u64 = 100;

struct LoomLimiter {
    last: AtomicU64,
}

impl LoomLimiter {
    fn new() -> Self {
        Self {
            last: AtomicU64::new(NO_ADMISSION),
        }
    }

    /// Same compare-and-swap loop as `RateLimiter::reserve`.
    fn reserve(&self, now: u64) -> u64 {
        let mut last = self.last.load(Ordering::Acquire);
        loop {
            let next = if last == NO_ADMISSION {
                now
            } else {
                now.max(last.saturating_add(INTERVAL))
            };
            match self
                .last
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }
}

fn assert_spaced(mut slots: Vec<u64>) {
    slots.sort_unstable();
    for pair in slots.windows(2) {
        assert!(
            pair[1] - pair[0] >= INTERVAL,
            "admissions {} and {} closer than {}",
            pair[0],
            pair[1],
            INTERVAL
        );
    }
}

/// Concurrent reservations at the same instant get distinct, spaced slots.
#[test]
fn loom_concurrent_reservations_are_spaced() {
    loom::model(|| {
        let limiter = Arc::new(LoomLimiter::new());

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                thread::spawn(move || limiter.reserve(0))
            })
            .collect();
        let main = limiter.reserve(0);

        let mut slots = vec![main];
        for handle in handles {
            slots.push(handle.join().unwrap());
        }

        assert_spaced(slots.clone());
        assert_eq!(slots.iter().min(), Some(&0));
        assert_eq!(limiter.last.load(Ordering::Acquire), 2 * INTERVAL);
    });
}

/// Callers observing different clock readings still never overlap.
#[test]
fn loom_skewed_clocks_are_spaced() {
    loom::model(|| {
        let limiter = Arc::new(LoomLimiter::new());

        let late = {
            let limiter = Arc::clone(&limiter);
            thread::spawn(move || limiter.reserve(250))
        };
        let early = limiter.reserve(30);

        let slots = vec![early, late.join().unwrap()];
        assert_spaced(slots.clone());
        assert_eq!(limiter.last.load(Ordering::Acquire), *slots.iter().max().unwrap());
    });
}
