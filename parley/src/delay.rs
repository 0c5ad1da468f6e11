//! Delays between a message being sent and its delivered/read transitions.
//!
//! The message log asks a [`DelayProvider`] for both delays each time a
//! send succeeds. [`RandomDelays`] draws them from configurable ranges;
//! [`FixedDelays`] returns constants so tests can step virtual time exactly.

use std::time::Duration;

use rand::Rng;

/// Source of the two post-send status delays, both measured from the
/// moment the message became `Sent`.
pub trait DelayProvider: Send + Sync {
    /// Delay until the message is marked delivered.
    fn delivered_delay(&self) -> Duration;

    /// Delay until the message is marked read.
    fn read_delay(&self) -> Duration;
}

/// Ranges for [`RandomDelays`]: each delay is `min + uniform(0..=range)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusDelays {
    /// Minimum delay before `Delivered`.
    pub delivered_min: Duration,
    /// Random extra delay before `Delivered`.
    pub delivered_range: Duration,
    /// Minimum delay before `Read`.
    pub read_min: Duration,
    /// Random extra delay before `Read`.
    pub read_range: Duration,
}

impl Default for StatusDelays {
    fn default() -> Self {
        Self {
            delivered_min: Duration::from_millis(500),
            delivered_range: Duration::from_millis(1000),
            read_min: Duration::from_millis(1500),
            read_range: Duration::from_millis(2000),
        }
    }
}

/// Uniformly random delays within [`StatusDelays`] ranges.
#[derive(Debug, Clone, Default)]
pub struct RandomDelays {
    ranges: StatusDelays,
}

impl RandomDelays {
    /// Creates a provider drawing from `ranges`.
    #[must_use]
    pub const fn new(ranges: StatusDelays) -> Self {
        Self { ranges }
    }

    fn draw(min: Duration, range: Duration) -> Duration {
        min + rand::rng().random_range(Duration::ZERO..=range)
    }
}

impl DelayProvider for RandomDelays {
    fn delivered_delay(&self) -> Duration {
        Self::draw(self.ranges.delivered_min, self.ranges.delivered_range)
    }

    fn read_delay(&self) -> Duration {
        Self::draw(self.ranges.read_min, self.ranges.read_range)
    }
}

/// Constant delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelays {
    /// Returned by `delivered_delay`.
    pub delivered: Duration,
    /// Returned by `read_delay`.
    pub read: Duration,
}

impl DelayProvider for FixedDelays {
    fn delivered_delay(&self) -> Duration {
        self.delivered
    }

    fn read_delay(&self) -> Duration {
        self.read
    }
}
