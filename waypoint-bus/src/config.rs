//! Bus tuning knobs (spec §4.1).

use std::time::Duration;

/// Default bounded queue capacity per subscription (spec §4.1: "default
/// capacity 50").
pub const DEFAULT_QUEUE_CAPACITY: usize = 50;

/// Default timeout a `Publish` waits on a full subscriber queue before
/// evicting it (spec §4.1: "default 100ms").
pub const DEFAULT_SLOW_SUBSCRIBER_TIMEOUT: Duration = Duration::from_millis(100);

/// Runtime configuration for a [`crate::Topic`].
///
/// Mirrors the donor codebase's convention of a small `Config` struct with a
/// `from_env` constructor layered over `Default` (see
/// `neuron-loop::config::LoopConfig`).
#[derive(Debug, Clone, Copy)]
pub struct BusConfig {
    /// Per-subscription bounded queue capacity.
    pub queue_capacity: usize,
    /// How long `Publish` waits on a full queue before evicting the
    /// subscriber.
    pub slow_subscriber_timeout: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            slow_subscriber_timeout: DEFAULT_SLOW_SUBSCRIBER_TIMEOUT,
        }
    }
}

impl BusConfig {
    /// Load overrides from `WAYPOINT_BUS_QUEUE_CAPACITY` (integer) and
    /// `WAYPOINT_BUS_SLOW_SUBSCRIBER_TIMEOUT_MS` (integer milliseconds),
    /// falling back to [`BusConfig::default`] for anything unset or
    /// unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var("WAYPOINT_BUS_QUEUE_CAPACITY") {
            if let Ok(capacity) = raw.parse() {
                config.queue_capacity = capacity;
            }
        }
        if let Ok(raw) = std::env::var("WAYPOINT_BUS_SLOW_SUBSCRIBER_TIMEOUT_MS") {
            if let Ok(millis) = raw.parse() {
                config.slow_subscriber_timeout = Duration::from_millis(millis);
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_defaults() {
        let config = BusConfig::default();
        assert_eq!(config.queue_capacity, 50);
        assert_eq!(config.slow_subscriber_timeout, Duration::from_millis(100));
    }
}
