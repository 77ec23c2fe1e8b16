use std::time::Duration;

/// A `Breaker`'s tuning parameters.
///
/// Thresholds are compared strictly (`count > threshold`) against the
/// decayed, normalized counts at evaluation time. All durations must be
/// positive; an invalid configuration is a programming error and is rejected
/// when the breaker is constructed.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BreakerConfig {
    /// Time constant handed to the decay function; for the default
    /// exponential decay it is the interval over which an event's weight
    /// falls to the target ratio.
    pub window_size: Duration,
    /// Decayed failure count that moves `Closed` to `Suspicion`.
    pub soft_fail_threshold: u32,
    /// Decayed success count that moves `Suspicion` back to `Closed`.
    pub suspicion_success_threshold: u32,
    /// Decayed failure count that moves `Suspicion` to `Open`.
    pub hard_fail_threshold: u32,
    /// Decayed failure count that moves `HalfOpen` back to `Open`.
    pub half_open_fail_threshold: u32,
    /// Decayed success count that moves `HalfOpen` to `Closed`.
    pub half_open_success_threshold: u32,
    /// How long the breaker stays `Open` before probing again.
    pub open_duration: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            window_size: Duration::from_secs(60),
            soft_fail_threshold: 5,
            suspicion_success_threshold: 10,
            hard_fail_threshold: 50,
            half_open_fail_threshold: 2,
            half_open_success_threshold: 2,
            open_duration: Duration::from_secs(1),
        }
    }
}

impl BreakerConfig {
    pub(crate) fn validate(&self) {
        assert!(!self.window_size.is_zero(), "window_size must be positive");
        assert!(
            !self.open_duration.is_zero(),
            "open_duration must be positive"
        );
    }
}
