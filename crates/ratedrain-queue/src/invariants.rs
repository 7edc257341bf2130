//! Debug assertion macros for queue invariants.
//!
//! Only active in debug builds (`#[cfg(debug_assertions)]`), so there is
//! zero overhead in release builds.

/// Assert that the buffer never holds more than `capacity` items.
///
/// Used in: `QueueSender::try_send()` after pushing
macro_rules! debug_assert_bounded {
    ($len:expr, $capacity:expr) => {
        debug_assert!(
            $len <= $capacity,
            "queue bound violated: {} items buffered with capacity {}",
            $len,
            $capacity
        )
    };
}

/// Assert that the receiver only reports end-of-stream once nothing is buffered.
///
/// Used in: `QueueReceiver::recv()` before returning `None`
macro_rules! debug_assert_closed_drained {
    ($closed:expr, $remaining:expr) => {
        debug_assert!(
            $closed && $remaining == 0,
            "receiver finished with {} items still buffered (closed: {})",
            $remaining,
            $closed
        )
    };
}

pub(crate) use debug_assert_bounded;
pub(crate) use debug_assert_closed_drained;
