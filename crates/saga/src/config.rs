//! Saga runtime configuration loaded from environment variables.

use std::time::Duration;

/// Tunables for the order saga and its child instances.
///
/// Reads from environment variables:
/// - `CUSTOMER_ACTION_TIMEOUT_SECS`: customer decision deadline (default: `30`)
/// - `BOOKING_TIMEOUT_SECS`: bound on the shipment booking call (default: `5`)
/// - `MAILBOX_CAPACITY`: buffered signals per mailbox (default: `64`)
/// - `RETAINED_INSTANCES`: finished instances kept queryable (default: `10000`)
#[derive(Debug, Clone)]
pub struct SagaConfig {
    pub customer_action_timeout: Duration,
    pub booking_timeout: Duration,
    pub mailbox_capacity: usize,
    pub retained_instances: usize,
}

impl SagaConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            customer_action_timeout: env_secs("CUSTOMER_ACTION_TIMEOUT_SECS")
                .unwrap_or(defaults.customer_action_timeout),
            booking_timeout: env_secs("BOOKING_TIMEOUT_SECS").unwrap_or(defaults.booking_timeout),
            mailbox_capacity: std::env::var("MAILBOX_CAPACITY")
                .ok()
                .and_then(|c| c.parse().ok())
                .filter(|c| *c > 0)
                .unwrap_or(defaults.mailbox_capacity),
            retained_instances: std::env::var("RETAINED_INSTANCES")
                .ok()
                .and_then(|c| c.parse().ok())
                .unwrap_or(defaults.retained_instances),
        }
    }

    /// Returns a copy with a different customer decision deadline.
    pub fn with_customer_action_timeout(mut self, timeout: Duration) -> Self {
        self.customer_action_timeout = timeout;
        self
    }

    /// Returns a copy with a different booking bound.
    pub fn with_booking_timeout(mut self, timeout: Duration) -> Self {
        self.booking_timeout = timeout;
        self
    }

    /// Returns a copy keeping at most `max` finished instances queryable.
    pub fn with_retained_instances(mut self, max: usize) -> Self {
        self.retained_instances = max;
        self
    }
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            customer_action_timeout: Duration::from_secs(30),
            booking_timeout: Duration::from_secs(5),
            mailbox_capacity: 64,
            retained_instances: 10_000,
        }
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = SagaConfig::default();
        assert_eq!(config.customer_action_timeout, Duration::from_secs(30));
        assert_eq!(config.booking_timeout, Duration::from_secs(5));
        assert_eq!(config.mailbox_capacity, 64);
        assert_eq!(config.retained_instances, 10_000);
    }

    #[test]
    fn test_builders() {
        let config = SagaConfig::default()
            .with_customer_action_timeout(Duration::from_secs(1))
            .with_booking_timeout(Duration::from_millis(10))
            .with_retained_instances(3);
        assert_eq!(config.customer_action_timeout, Duration::from_secs(1));
        assert_eq!(config.booking_timeout, Duration::from_millis(10));
        assert_eq!(config.retained_instances, 3);
    }
}
