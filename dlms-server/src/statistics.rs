//! Capture scheduler statistics collection

use serde::Serialize;

/// Counters kept by one capture scheduler
///
/// Updated by the background loop after each cycle; hosts read snapshots
/// through [`SchedulerHandle::statistics`](crate::SchedulerHandle::statistics).
/// Failures are only ever visible here and in the log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaptureStatistics {
    /// Captures that completed successfully
    pub captures_succeeded: u64,
    /// Captures that returned an error
    pub captures_failed: u64,
    /// Failures since the last successful capture
    pub consecutive_failures: u32,
    /// Waits ended by a wake rather than the period timer
    pub wakes: u64,
    /// Text of the most recent capture error
    pub last_error: Option<String>,
}

impl CaptureStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self) {
        self.captures_succeeded += 1;
        self.consecutive_failures = 0;
    }

    pub fn record_failure(&mut self, error: &dlms_core::DlmsError) {
        self.captures_failed += 1;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_error = Some(error.to_string());
    }

    pub fn record_wake(&mut self) {
        self.wakes += 1;
    }

    /// Total capture attempts
    pub fn attempts(&self) -> u64 {
        self.captures_succeeded + self.captures_failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlms_core::DlmsError;

    fn meter_busy() -> DlmsError {
        DlmsError::InvalidData("meter busy".to_string())
    }

    #[test]
    fn test_success_resets_consecutive_failures() {
        let mut stats = CaptureStatistics::new();
        stats.record_failure(&meter_busy());
        stats.record_failure(&meter_busy());
        assert_eq!(stats.consecutive_failures, 2);

        stats.record_success();
        assert_eq!(stats.consecutive_failures, 0);
        assert_eq!(stats.attempts(), 3);
        assert_eq!(stats.last_error.as_deref(), Some("Invalid data: meter busy"));
    }

    #[test]
    fn test_wakes_are_counted_apart_from_attempts() {
        let mut stats = CaptureStatistics::new();
        stats.record_wake();
        stats.record_success();

        assert_eq!(stats.wakes, 1);
        assert_eq!(stats.attempts(), 1);
        assert_eq!(stats.last_error, None);
    }
}
