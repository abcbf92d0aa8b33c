//! DLMS/COSEM server implementation
//!
//! This crate hosts the logical device's COSEM objects and drives the
//! periodic capture of its profiles:
//!
//! - [`CaptureScheduler`]: one background task per captured profile
//! - [`WakeSignal`]: the single-slot wake/stop signal those tasks wait on
//! - [`DlmsServer`]: object registry that owns profiles and their schedulers

pub mod config;
pub mod scheduler;
pub mod server;
pub mod signal;
pub mod statistics;

pub use config::{FailureBackoff, SchedulerConfig};
pub use scheduler::{CaptureScheduler, SchedulerHandle, SchedulerState};
pub use server::{DlmsServer, ServerConfig};
pub use signal::{WaitOutcome, WakeSignal};
pub use statistics::CaptureStatistics;
