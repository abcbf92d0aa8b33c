//! Capture scheduler configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Extra delay added to the wait after consecutive capture failures
///
/// After `n` consecutive failures the wait becomes
/// `period + min(initial * 2^(n-1), max)`. Capturing never stops; the delay
/// only spaces out retries and resets on the first success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureBackoff {
    pub initial: Duration,
    pub max: Duration,
}

impl FailureBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max }
    }

    /// Delay to add after `consecutive_failures` failures in a row
    pub fn delay(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32
            .checked_shl(consecutive_failures - 1)
            .unwrap_or(u32::MAX);
        self.initial.saturating_mul(factor).min(self.max)
    }
}

impl Default for FailureBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(60),
        }
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Length of one capture period unit (one second on a meter)
    pub period_unit: Duration,
    /// Optional hardening against tight retry loops, off by default
    pub failure_backoff: Option<FailureBackoff>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            period_unit: Duration::from_secs(1),
            failure_backoff: None,
        }
    }
}

impl SchedulerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_period_unit(mut self, period_unit: Duration) -> Self {
        self.period_unit = period_unit;
        self
    }

    pub fn with_failure_backoff(mut self, backoff: FailureBackoff) -> Self {
        self.failure_backoff = Some(backoff);
        self
    }

    /// Wait before the next cycle, `None` meaning wait for a wake only
    pub(crate) fn wait_for(&self, period: u32, consecutive_failures: u32) -> Option<Duration> {
        if period == 0 {
            return None;
        }
        let base = self.period_unit.saturating_mul(period);
        let extra = self
            .failure_backoff
            .map(|backoff| backoff.delay(consecutive_failures))
            .unwrap_or(Duration::ZERO);
        Some(base.saturating_add(extra))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_delay_doubles_until_cap() {
        let backoff = FailureBackoff::new(Duration::from_secs(1), Duration::from_secs(4));
        assert_eq!(backoff.delay(0), Duration::ZERO);
        assert_eq!(backoff.delay(1), Duration::from_secs(1));
        assert_eq!(backoff.delay(2), Duration::from_secs(2));
        assert_eq!(backoff.delay(3), Duration::from_secs(4));
        assert_eq!(backoff.delay(40), Duration::from_secs(4));
    }

    #[test]
    fn test_wait_for_period() {
        let config = SchedulerConfig::default();
        assert_eq!(config.wait_for(0, 0), None);
        assert_eq!(config.wait_for(900, 3), Some(Duration::from_secs(900)));

        let config = config.with_failure_backoff(FailureBackoff::default());
        assert_eq!(config.wait_for(2, 2), Some(Duration::from_secs(4)));
        assert_eq!(config.wait_for(0, 2), None);
    }

    #[test]
    fn test_config_from_json() {
        let config: SchedulerConfig = serde_json::from_str(
            r#"{ "failure_backoff": { "initial": { "secs": 5, "nanos": 0 }, "max": { "secs": 300, "nanos": 0 } } }"#,
        )
        .unwrap();

        assert_eq!(config.period_unit, Duration::from_secs(1));
        assert_eq!(
            config.failure_backoff,
            Some(FailureBackoff::new(Duration::from_secs(5), Duration::from_secs(300)))
        );
    }
}
