//! Monotonic lifecycle state shared between the control plane and observers.

use std::fmt;
use tokio::sync::watch;

/// Where the consumer is in its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    Running,
    Draining,
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Lifecycle state machine.
///
/// Transitions only move forward: Running -> Draining -> Stopped, or
/// Running -> Stopped. Backed by a `watch` channel so observers can await a
/// state without polling.
#[derive(Debug)]
pub struct Lifecycle {
    state: watch::Sender<LifecycleState>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        let (state, _) = watch::channel(LifecycleState::Running);
        Self { state }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Moves to `to` if that is a forward transition from the current state.
    ///
    /// Returns `true` only for the one caller that performed the transition;
    /// repeats and reversals return `false` and change nothing.
    pub fn advance(&self, to: LifecycleState) -> bool {
        self.state.send_if_modified(|current| {
            if to > *current {
                *current = to;
                true
            } else {
                false
            }
        })
    }

    /// Waits until the state is at or past `target`.
    pub async fn wait_for(&self, target: LifecycleState) -> LifecycleState {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let reached = match rx.wait_for(|state| *state >= target).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        };
        reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_transitions_are_monotonic() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), LifecycleState::Running);

        assert!(lifecycle.advance(LifecycleState::Draining));
        assert!(!lifecycle.advance(LifecycleState::Draining));
        assert!(!lifecycle.advance(LifecycleState::Running));
        assert_eq!(lifecycle.state(), LifecycleState::Draining);

        assert!(lifecycle.advance(LifecycleState::Stopped));
        assert!(!lifecycle.advance(LifecycleState::Draining));
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[test]
    fn test_hard_stop_skips_draining() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.advance(LifecycleState::Stopped));
        assert!(!lifecycle.advance(LifecycleState::Draining));
    }

    #[tokio::test]
    async fn test_single_winner_under_contention() {
        let lifecycle = Arc::new(Lifecycle::new());
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let lifecycle = Arc::clone(&lifecycle);
            tasks.push(tokio::spawn(async move {
                lifecycle.advance(LifecycleState::Stopped)
            }));
        }

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_wait_for_state() {
        let lifecycle = Arc::new(Lifecycle::new());
        let waiter = {
            let lifecycle = Arc::clone(&lifecycle);
            tokio::spawn(async move { lifecycle.wait_for(LifecycleState::Stopped).await })
        };
        tokio::task::yield_now().await;

        lifecycle.advance(LifecycleState::Draining);
        lifecycle.advance(LifecycleState::Stopped);
        assert_eq!(waiter.await.unwrap(), LifecycleState::Stopped);
    }
}
