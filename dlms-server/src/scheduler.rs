//! Periodic background capture of profiles
//!
//! A [`CaptureScheduler`] runs one tokio task per monitored
//! [`CaptureTarget`]. Each cycle captures, re-reads the target's capture
//! period and then waits on the target's [`WakeSignal`] for at most that
//! period:
//!
//! ```text
//!  Running ──stop()──> Stopping ──loop observes flag──> Stopped
//!     │  ^
//!     └──┘ capture, wait(period | wake)
//! ```
//!
//! Capture failures are logged and counted but never end the loop; only
//! `stop` does. A stop takes effect at the next wait boundary: a capture
//! already in progress runs to completion, the pending wait returns at once
//! and no further capture starts.
//!
//! # Usage Example
//! ```rust,no_run
//! use dlms_interface::ProfileGeneric;
//! use dlms_server::{CaptureScheduler, SchedulerConfig};
//! use std::sync::Arc;
//!
//! # async fn demo() -> dlms_core::DlmsResult<()> {
//! let scheduler = CaptureScheduler::new(SchedulerConfig::default());
//! let profile = Arc::new(ProfileGeneric::with_default_obis(96));
//!
//! let handle = scheduler.start(profile)?;
//! handle.wake();
//! handle.stop();
//! handle.join().await?;
//! # Ok(())
//! # }
//! ```

use dlms_core::{DlmsError, DlmsResult, ObisCode};
use dlms_interface::CaptureTarget;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::SchedulerConfig;
use crate::signal::{WaitOutcome, WakeSignal};
use crate::statistics::CaptureStatistics;

/// Lifecycle state of one scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Capturing periodically
    Running,
    /// Stop requested, loop has not exited yet
    Stopping,
    /// Loop exited; terminal
    Stopped,
}

type Registry = Arc<Mutex<HashMap<ObisCode, Arc<Shared>>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between a handle, the registry and the background task
struct Shared {
    logical_name: ObisCode,
    signal: WakeSignal,
    state: watch::Sender<SchedulerState>,
    statistics: Mutex<CaptureStatistics>,
}

impl Shared {
    fn new(logical_name: ObisCode) -> Self {
        let (state, _) = watch::channel(SchedulerState::Running);
        Self {
            logical_name,
            signal: WakeSignal::new(),
            state,
            statistics: Mutex::new(CaptureStatistics::new()),
        }
    }

    fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    /// Move to `Stopping` and raise the signal; false if already stopping
    fn request_stop(&self) -> bool {
        let requested = self.state.send_if_modified(|state| {
            if *state == SchedulerState::Running {
                *state = SchedulerState::Stopping;
                true
            } else {
                false
            }
        });
        if requested {
            log::info!("Stopping capture scheduler for {}", self.logical_name);
            self.signal.raise();
        }
        requested
    }

    fn wake(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.signal.raise();
        true
    }

    fn statistics(&self) -> CaptureStatistics {
        lock(&self.statistics).clone()
    }

    async fn wait_stopped(&self) {
        let mut state = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close here
        let _ = state.wait_for(|state| *state == SchedulerState::Stopped).await;
    }
}

/// Releases the registry slot and marks the scheduler stopped when the
/// background task ends, including by panic
struct LoopExit {
    shared: Arc<Shared>,
    registry: Registry,
}

impl Drop for LoopExit {
    fn drop(&mut self) {
        {
            let mut active = lock(&self.registry);
            let logical_name = self.shared.logical_name;
            if active
                .get(&logical_name)
                .is_some_and(|entry| Arc::ptr_eq(entry, &self.shared))
            {
                active.remove(&logical_name);
            }
        }
        self.shared.state.send_replace(SchedulerState::Stopped);
        log::info!(
            "Capture scheduler for {} stopped after {} captures",
            self.shared.logical_name,
            lock(&self.shared.statistics).attempts()
        );
    }
}

/// Starts and tracks background capture schedulers
///
/// Cloning shares the registry of active schedulers, which enforces that at
/// most one scheduler runs per target logical name.
#[derive(Clone, Default)]
pub struct CaptureScheduler {
    config: Arc<SchedulerConfig>,
    active: Registry,
}

impl CaptureScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config: Arc::new(config),
            active: Registry::default(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Start capturing `target` in a background task
    ///
    /// Returns as soon as the task is spawned. The first capture happens
    /// when the task first runs.
    ///
    /// # Errors
    /// - `SchedulerActive` if a scheduler for the same logical name has not
    ///   stopped yet
    /// - `InvalidData` if called outside a tokio runtime
    pub fn start(&self, target: Arc<dyn CaptureTarget>) -> DlmsResult<SchedulerHandle> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            DlmsError::InvalidData("Capture scheduler requires a tokio runtime".to_string())
        })?;
        let logical_name = target.logical_name();

        let shared = {
            let mut active = lock(&self.active);
            if active.contains_key(&logical_name) {
                return Err(DlmsError::SchedulerActive(logical_name));
            }
            let shared = Arc::new(Shared::new(logical_name));
            active.insert(logical_name, shared.clone());
            shared
        };

        let exit = LoopExit {
            shared: shared.clone(),
            registry: self.active.clone(),
        };
        let task = runtime.spawn(run_capture_loop(target, self.config.clone(), exit));
        log::info!("Capture scheduler started for {}", logical_name);

        Ok(SchedulerHandle { shared, task })
    }

    /// Request `handle` to stop; see [`SchedulerHandle::stop`]
    pub fn stop(&self, handle: &SchedulerHandle) {
        handle.stop();
    }

    /// Request the scheduler of `logical_name` to stop
    ///
    /// Returns false if no scheduler for it is running.
    pub fn stop_target(&self, logical_name: &ObisCode) -> bool {
        let shared = lock(&self.active).get(logical_name).cloned();
        shared.is_some_and(|shared| shared.request_stop())
    }

    /// Force an out-of-cycle capture of `logical_name`
    ///
    /// Returns false if no scheduler for it is running.
    pub fn wake_target(&self, logical_name: &ObisCode) -> bool {
        let shared = lock(&self.active).get(logical_name).cloned();
        shared.is_some_and(|shared| shared.wake())
    }

    /// Whether a scheduler for `logical_name` has not stopped yet
    pub fn is_active(&self, logical_name: &ObisCode) -> bool {
        lock(&self.active).contains_key(logical_name)
    }

    /// Logical names with an active scheduler, in ascending order
    pub fn active_targets(&self) -> Vec<ObisCode> {
        let mut targets: Vec<_> = lock(&self.active).keys().copied().collect();
        targets.sort();
        targets
    }

    pub fn statistics(&self, logical_name: &ObisCode) -> Option<CaptureStatistics> {
        lock(&self.active)
            .get(logical_name)
            .map(|shared| shared.statistics())
    }

    /// Stop every active scheduler and wait until all of them have exited
    pub async fn shutdown(&self) {
        let schedulers: Vec<_> = lock(&self.active).values().cloned().collect();
        for shared in &schedulers {
            shared.request_stop();
        }
        for shared in schedulers {
            shared.wait_stopped().await;
        }
    }
}

/// Handle to one running scheduler
///
/// Dropping the handle does not stop the scheduler; use
/// [`CaptureScheduler::stop_target`] to stop one whose handle was dropped.
pub struct SchedulerHandle {
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn logical_name(&self) -> ObisCode {
        self.shared.logical_name
    }

    pub fn state(&self) -> SchedulerState {
        self.shared.state()
    }

    /// Request the scheduler to stop
    ///
    /// Raises the wake/stop signal and returns without waiting. Calling it
    /// again is a no-op.
    pub fn stop(&self) {
        self.shared.request_stop();
    }

    /// Force an immediate capture without stopping
    ///
    /// Wakes raised while a capture is running collapse into one extra cycle.
    pub fn wake(&self) {
        self.shared.wake();
    }

    /// Snapshot of the capture counters
    pub fn statistics(&self) -> CaptureStatistics {
        self.shared.statistics()
    }

    /// Wait until the loop has exited without consuming the handle
    pub async fn stopped(&self) {
        self.shared.wait_stopped().await;
    }

    /// Wait for the background task to finish
    ///
    /// # Errors
    /// `TaskAborted` if the task panicked or was cancelled
    pub async fn join(self) -> DlmsResult<()> {
        let logical_name = self.shared.logical_name;
        self.task.await.map_err(|e| {
            log::error!("Capture task for {} ended abnormally: {}", logical_name, e);
            DlmsError::TaskAborted(logical_name)
        })
    }
}

impl fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("logical_name", &self.shared.logical_name)
            .field("state", &self.state())
            .finish()
    }
}

async fn run_capture_loop(
    target: Arc<dyn CaptureTarget>,
    config: Arc<SchedulerConfig>,
    exit: LoopExit,
) {
    let shared = exit.shared.clone();
    let logical_name = shared.logical_name;

    while shared.is_running() {
        let result = target.capture().await;
        let consecutive_failures = {
            let mut statistics = lock(&shared.statistics);
            match &result {
                Ok(()) => statistics.record_success(),
                Err(e) => statistics.record_failure(e),
            }
            statistics.consecutive_failures
        };
        match result {
            Ok(()) => log::debug!("Captured {}", logical_name),
            Err(e) => log::warn!(
                "Capture of {} failed ({} in a row): {}",
                logical_name,
                consecutive_failures,
                e
            ),
        }

        let period = target.capture_period().await;
        let timeout = config.wait_for(period, consecutive_failures);
        if shared.signal.wait(timeout).await == WaitOutcome::Signaled && shared.is_running() {
            lock(&shared.statistics).record_wake();
            log::trace!("Capture scheduler for {} woken early", logical_name);
        }
    }

    drop(exit);
}
