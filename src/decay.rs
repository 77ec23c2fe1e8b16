//! Forward decay over an event stream.
//!
//! Given a landmark time `L` and a positive function `g`, an event at time
//! `ti` with value `vi` contributes `g(ti - L) * vi` to a running sum. The
//! value of the sum "as of time t" is the stored sum divided by `g(t - L)`.
//! Because the per-event weight is fixed at insertion, the scheme keeps
//! decayed aggregates without retaining individual samples; advancing the
//! landmark rescales every stored sum by `1 / g(Lnew - Lold)`.

use std::time::{Duration, Instant};

/// Weighting function `g` used by the forward decay scheme.
///
/// Must be positive and finite for every age a caller will supply over the
/// process lifetime; periodic landmark re-basing keeps the ages bounded.
pub trait DecayFunction {
    /// Evaluates the weight of an event `age` past the landmark.
    fn g(&self, age: Duration) -> f64;
}

impl<F> DecayFunction for F
where
    F: Fn(Duration) -> f64,
{
    fn g(&self, age: Duration) -> f64 {
        self(age)
    }
}

/// Exponential decay, `g(age) = exp(alpha * age)`.
///
/// `alpha` is derived from a target ratio and an interval: an event a full
/// interval after the landmark carries `target` times the weight of one at
/// the landmark.
#[derive(Debug, Clone, Copy)]
pub struct Exponential {
    alpha: f64,
}

impl Exponential {
    /// Creates an exponential decay function.
    ///
    /// # Panics
    ///
    /// * When `target` is outside `(0, 1)`.
    /// * When `interval` is zero.
    pub fn new(target: f64, interval: Duration) -> Self {
        assert!(
            target > 0.0 && target < 1.0,
            "decay target must be within (0, 1)"
        );
        assert!(!interval.is_zero(), "decay interval must be positive");

        Self {
            alpha: target.ln() / interval.as_secs_f64(),
        }
    }
}

impl DecayFunction for Exponential {
    fn g(&self, age: Duration) -> f64 {
        (self.alpha * age.as_secs_f64()).exp()
    }
}

/// Polynomial decay, `g(age) = age_seconds ^ beta`, with `0 ^ beta = 0`.
///
/// Mostly useful in tests: `g(0)` is zero, so it cannot normalize a query
/// at the landmark itself.
#[derive(Debug, Clone, Copy)]
pub struct Polynomial {
    beta: f64,
}

impl Polynomial {
    /// Creates a polynomial decay function.
    ///
    /// # Panics
    ///
    /// * When `beta` isn't positive.
    pub fn new(beta: f64) -> Self {
        assert!(beta > 0.0, "decay exponent must be positive");

        Self { beta }
    }
}

impl DecayFunction for Polynomial {
    fn g(&self, age: Duration) -> f64 {
        age.as_secs_f64().powf(self.beta)
    }
}

/// An event in the decayed stream.
pub trait Item {
    /// The time at which the event occurred.
    fn timestamp(&self) -> Instant;

    /// The value the event contributes.
    fn value(&self) -> f64;
}

/// A plain timestamp and value pair.
#[derive(Debug, Clone, Copy)]
pub struct BasicItem {
    timestamp: Instant,
    value: f64,
}

impl BasicItem {
    /// Creates an item carrying `value` at `timestamp`.
    pub fn new(timestamp: Instant, value: f64) -> Self {
        Self { timestamp, value }
    }
}

impl Item for BasicItem {
    fn timestamp(&self) -> Instant {
        self.timestamp
    }

    fn value(&self) -> f64 {
        self.value
    }
}

/// Forward decayed counter state: the landmark plus the decay function all
/// weights are currently expressed against.
///
/// Ages are clamped at zero, so an item stamped before the landmark weighs
/// like one at the landmark, and a landmark moved backwards stays put.
#[derive(Debug)]
pub struct ForwardDecay<G> {
    landmark: Instant,
    g: G,
}

impl<G> ForwardDecay<G>
where
    G: DecayFunction,
{
    /// Creates a counter with the given landmark and decay function.
    pub fn new(landmark: Instant, g: G) -> Self {
        Self { landmark, g }
    }

    /// Returns the current landmark.
    pub fn landmark(&self) -> Instant {
        self.landmark
    }

    /// Moves the landmark to `landmark` and returns the elapsed duration
    /// since the previous one.
    ///
    /// Sums accumulated against the old landmark must be divided by
    /// `g` of the returned duration to be expressed against the new one.
    pub fn set_landmark(&mut self, landmark: Instant) -> Duration {
        let elapsed = landmark.saturating_duration_since(self.landmark);
        if landmark > self.landmark {
            self.landmark = landmark;
        }
        elapsed
    }

    /// Evaluates the decay function for the given age.
    pub fn g(&self, age: Duration) -> f64 {
        self.g.g(age)
    }

    /// Weight of an item relative to query time `timestamp`.
    pub fn weight(&self, item: &impl Item, timestamp: Instant) -> f64 {
        self.static_weight(item) / self.normalizing_factor(timestamp)
    }

    /// Weighted value of an item relative to query time `timestamp`.
    pub fn weighted_value(&self, item: &impl Item, timestamp: Instant) -> f64 {
        self.weight(item, timestamp) * item.value()
    }

    /// Weight of an item against the landmark, independent of query time.
    ///
    /// This is the quantity to add to a stored sum when the item arrives.
    pub fn static_weight(&self, item: &impl Item) -> f64 {
        let age = item.timestamp().saturating_duration_since(self.landmark);
        self.g.g(age)
    }

    /// Weighted value of an item against the landmark.
    pub fn static_weighted_value(&self, item: &impl Item) -> f64 {
        self.static_weight(item) * item.value()
    }

    /// Factor a stored sum is divided by to read it "as of `timestamp`".
    pub fn normalizing_factor(&self, timestamp: Instant) -> f64 {
        let age = timestamp.saturating_duration_since(self.landmark);
        self.g.g(age)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(landmark: Instant, offset: u64, value: f64) -> BasicItem {
        BasicItem::new(landmark + Duration::from_secs(offset), value)
    }

    #[test]
    fn polynomial_weights_relative_to_query_time() {
        let landmark = Instant::now();
        let timestamp = landmark + Duration::from_secs(10);
        let decay = ForwardDecay::new(landmark, Polynomial::new(2.0));

        let stream = [
            item(landmark, 5, 4.0),
            item(landmark, 7, 8.0),
            item(landmark, 3, 3.0),
            item(landmark, 8, 6.0),
            item(landmark, 4, 4.0),
        ];
        let expected = [0.25, 0.49, 0.09, 0.64, 0.16];

        for (item, expected) in stream.iter().zip(expected) {
            let actual = decay.weight(item, timestamp);
            assert!(
                (actual - expected).abs() < 1e-12,
                "weight {} differs from {}",
                actual,
                expected
            );
        }
    }

    #[test]
    fn weighted_value_scales_by_the_item_value() {
        let landmark = Instant::now();
        let timestamp = landmark + Duration::from_secs(10);
        let decay = ForwardDecay::new(landmark, Polynomial::new(2.0));

        let item = item(landmark, 5, 4.0);
        assert!((decay.weighted_value(&item, timestamp) - 1.0).abs() < 1e-12);
        assert!((decay.static_weighted_value(&item) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn exponential_retains_the_target_ratio_after_one_interval() {
        let g = Exponential::new(0.1, Duration::from_secs(60));

        assert_eq!(1.0, g.g(Duration::ZERO));
        assert!((g.g(Duration::from_secs(60)) - 0.1).abs() < 1e-12);
        assert!((g.g(Duration::from_secs(120)) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn set_landmark_returns_the_elapsed_duration() {
        let landmark = Instant::now();
        let mut decay = ForwardDecay::new(landmark, Exponential::new(0.1, Duration::from_secs(60)));

        let elapsed = decay.set_landmark(landmark + Duration::from_secs(5));
        assert_eq!(Duration::from_secs(5), elapsed);
        assert_eq!(landmark + Duration::from_secs(5), decay.landmark());
    }

    #[test]
    fn set_landmark_never_moves_backwards() {
        let landmark = Instant::now();
        let mut decay = ForwardDecay::new(landmark, Exponential::new(0.1, Duration::from_secs(60)));
        decay.set_landmark(landmark + Duration::from_secs(5));

        assert_eq!(Duration::ZERO, decay.set_landmark(landmark));
        assert_eq!(landmark + Duration::from_secs(5), decay.landmark());
    }

    #[test]
    fn use_func_as_decay_function() {
        let landmark = Instant::now();
        let halving = |age: Duration| 0.5f64.powf(age.as_secs_f64());
        let decay = ForwardDecay::new(landmark, halving);

        let factor = decay.normalizing_factor(landmark + Duration::from_secs(2));
        assert!((factor - 0.25).abs() < 1e-12);
    }
}
