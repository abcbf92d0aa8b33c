//! Wake/stop signal shared between a scheduler handle and its task

use std::time::Duration;
use tokio::sync::Notify;

/// Single-slot, auto-clearing signal
///
/// A raise with nobody waiting stays pending for exactly one later wait.
/// Raises do not stack: any number of raises before a wait collapse into a
/// single pending wake.
#[derive(Debug, Default)]
pub struct WakeSignal {
    notify: Notify,
}

/// How a wait on a [`WakeSignal`] resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The signal was raised
    Signaled,
    /// The timeout elapsed first
    TimedOut,
}

impl WakeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal, waking the waiter or leaving a pending wake
    pub fn raise(&self) {
        self.notify.notify_one();
    }

    /// Wait for the signal, giving up after `timeout` when one is given
    ///
    /// A pending wake is consumed immediately.
    pub async fn wait(&self, timeout: Option<Duration>) -> WaitOutcome {
        match timeout {
            Some(timeout) => match tokio::time::timeout(timeout, self.notify.notified()).await {
                Ok(()) => WaitOutcome::Signaled,
                Err(_) => WaitOutcome::TimedOut,
            },
            None => {
                self.notify.notified().await;
                WaitOutcome::Signaled
            }
        }
    }
}
