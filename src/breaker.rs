use std::collections::HashMap;
use std::fmt::{self, Display};
use std::time::Instant;

use crate::config::BreakerConfig;
use crate::decay::{BasicItem, DecayFunction, Exponential, ForwardDecay};
use crate::error::OpenBreaker;
use crate::instrument::Instrument;

/// Weight ratio an event retains after one full window under the default
/// exponential decay.
pub const DEFAULT_DECAY_TARGET: f64 = 0.1;

/// States of the breaker state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum State {
    /// Requests pass through; the breaker merely observes outcomes.
    Closed,
    /// Requests still pass, but the breaker is on the cusp of opening:
    /// either the hard failure count or a peer quorum can push it open.
    Suspicion,
    /// Requests are rejected fast until the open duration elapses.
    Open,
    /// A probing state after `Open` expires; a handful of outcomes decide
    /// between reopening and closing.
    HalfOpen,
}

impl State {
    /// Returns a string value for the state identifier.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Closed => "closed",
            State::Suspicion => "suspicion",
            State::Open => "open",
            State::HalfOpen => "half_open",
        }
    }
}

impl Display for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{}", self.as_str())
    }
}

/// A gossip-enhanced, decay-based breaker state machine.
///
/// The breaker watches one node's successes and failures against a shared
/// downstream dependency and decides whether calls should be attempted. It
/// keeps two forward-decayed counters instead of a sliding window of
/// samples, so recent events weigh in without per-sample bookkeeping.
///
/// Compared to a classical three-state breaker, trip-open is split in two:
/// once decayed failures pass the soft threshold the breaker enters
/// `Suspicion`, where it keeps admitting calls while it gathers evidence.
/// From there it opens either on the hard failure threshold or as soon as a
/// strict majority of known peers reports a non-`Closed` state, whichever
/// comes first. An open breaker rejects everything until its deadline
/// passes, probes in `HalfOpen`, and then settles back to `Open` or
/// `Closed`.
///
/// The breaker is a passive object: it schedules no timers, spawns nothing
/// and does no I/O. Every operation takes the wall-clock timestamp from the
/// caller, and the caller must not let those timestamps move backwards.
/// This type is not synchronized; [`CircuitBreaker`](crate::CircuitBreaker)
/// wraps it for concurrent use.
#[derive(Debug)]
pub struct Breaker<G, I> {
    config: BreakerConfig,
    decay: ForwardDecay<G>,
    instrument: I,
    state: State,
    successes: f64,
    failures: f64,
    deadline: Instant,
    peers: HashMap<String, State>,
    majority_suspect: bool,
}

impl Breaker<Exponential, ()> {
    /// Creates a breaker in the `Closed` state with the given landmark,
    /// using exponential decay at [`DEFAULT_DECAY_TARGET`] over the
    /// configured window.
    ///
    /// # Panics
    ///
    /// * When `config` carries a zero `window_size` or `open_duration`.
    pub fn new(config: BreakerConfig, landmark: Instant) -> Self {
        config.validate();
        let g = Exponential::new(DEFAULT_DECAY_TARGET, config.window_size);
        let decay = ForwardDecay::new(landmark, g);

        Breaker {
            config,
            instrument: (),
            state: State::Closed,
            successes: 0.0,
            failures: 0.0,
            deadline: decay.landmark(),
            peers: HashMap::new(),
            majority_suspect: false,
            decay,
        }
    }
}

impl<G, I> Breaker<G, I>
where
    G: DecayFunction,
    I: Instrument,
{
    /// Replaces the decay function, keeping the current landmark.
    pub fn with_decay_function<T>(self, g: T) -> Breaker<T, I>
    where
        T: DecayFunction,
    {
        Breaker {
            decay: ForwardDecay::new(self.decay.landmark(), g),
            config: self.config,
            instrument: self.instrument,
            state: self.state,
            successes: self.successes,
            failures: self.failures,
            deadline: self.deadline,
            peers: self.peers,
            majority_suspect: self.majority_suspect,
        }
    }

    /// Installs an instrument observing this breaker's transitions.
    pub fn with_instrument<T>(self, instrument: T) -> Breaker<G, T>
    where
        T: Instrument,
    {
        Breaker {
            instrument,
            config: self.config,
            decay: self.decay,
            state: self.state,
            successes: self.successes,
            failures: self.failures,
            deadline: self.deadline,
            peers: self.peers,
            majority_suspect: self.majority_suspect,
        }
    }

    /// Requests permission to attempt the protected call at time `t`.
    ///
    /// Advances the state machine exactly like [`state`](Self::state) and
    /// signals [`OpenBreaker`] iff the resulting state is `Open`.
    pub fn acquire(&mut self, t: Instant) -> Result<(), OpenBreaker> {
        if self.state(t) == State::Open {
            self.instrument.on_call_rejected();
            return Err(OpenBreaker);
        }
        Ok(())
    }

    /// Records a successful call at time `t`.
    pub fn success(&mut self, t: Instant) -> Result<(), OpenBreaker> {
        self.admit(t)?;
        self.successes += self.decay.static_weighted_value(&BasicItem::new(t, 1.0));
        self.transition(t);
        Ok(())
    }

    /// Records a failed call at time `t`.
    pub fn failure(&mut self, t: Instant) -> Result<(), OpenBreaker> {
        self.admit(t)?;
        self.failures += self.decay.static_weighted_value(&BasicItem::new(t, 1.0));
        self.transition(t);
        Ok(())
    }

    // Re-evaluates the transition at `t` and rejects while open, so a
    // record at the instant the open deadline expires is admitted exactly
    // like `acquire`. The landmark does not move here.
    fn admit(&mut self, t: Instant) -> Result<(), OpenBreaker> {
        self.transition(t);
        if self.state == State::Open {
            self.instrument.on_call_rejected();
            return Err(OpenBreaker);
        }
        Ok(())
    }

    /// Decayed success count as of time `t`, rounded up.
    pub fn successes(&self, t: Instant) -> u32 {
        normalize(self.successes, self.decay.normalizing_factor(t))
    }

    /// Decayed failure count as of time `t`, rounded up.
    pub fn failures(&self, t: Instant) -> u32 {
        normalize(self.failures, self.decay.normalizing_factor(t))
    }

    /// Re-bases the decayed sums onto `t`, runs the transition and returns
    /// the resulting state.
    ///
    /// This is the only operation that advances the landmark. Stored sums
    /// grow by the inverse decay of the elapsed time between re-basings, so
    /// callers should invoke this at least once per window to keep them
    /// bounded.
    pub fn state(&mut self, t: Instant) -> State {
        let elapsed = self.decay.set_landmark(t);
        let factor = self.decay.g(elapsed);

        self.successes /= factor;
        self.failures /= factor;
        self.transition(t);

        self.state
    }

    /// Deadline at which the current `Open` period ends.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Records the last-known breaker state of peer `id`.
    pub fn update_peer(&mut self, id: impl Into<String>, state: State) {
        self.peers.insert(id.into(), state);
        self.recount_suspects();
    }

    /// Forgets peer `id`.
    pub fn delete_peer(&mut self, id: &str) {
        self.peers.remove(id);
        self.recount_suspects();
    }

    /// Replaces the peer view with a full gossip snapshot: peers absent
    /// from `snapshot` are forgotten, the rest are upserted.
    pub fn sync_peers(&mut self, snapshot: &HashMap<String, State>) {
        self.peers.clone_from(snapshot);
        self.recount_suspects();
    }

    /// True when a strict majority of known peers reports a non-`Closed`
    /// state. The local node does not count toward the quorum.
    pub fn majority_suspect(&self) -> bool {
        self.majority_suspect
    }

    fn recount_suspects(&mut self) {
        let quorum = self.peers.len() / 2 + 1;
        let suspects = self
            .peers
            .values()
            .filter(|peer| **peer != State::Closed)
            .count();

        self.majority_suspect = suspects >= quorum;
    }

    // One step of the state machine, driven by the decayed counts as of
    // `t`. Within `Suspicion`, success recovery wins over the hard failure
    // trip, which wins over the peer quorum; within `HalfOpen`, the failure
    // trip wins over success recovery.
    fn transition(&mut self, t: Instant) {
        let from = self.state;

        match self.state {
            State::Closed => {
                if self.failures(t) > self.config.soft_fail_threshold {
                    // Counters survive this transition: the failures that
                    // raised suspicion keep counting toward the hard trip.
                    self.state = State::Suspicion;
                }
            }
            State::Suspicion => {
                if self.successes(t) > self.config.suspicion_success_threshold {
                    self.close();
                } else if self.failures(t) > self.config.hard_fail_threshold {
                    self.trip(t);
                } else if self.majority_suspect {
                    self.trip(t);
                }
            }
            State::Open => {
                if t > self.deadline {
                    self.state = State::HalfOpen;
                }
            }
            State::HalfOpen => {
                if self.failures(t) > self.config.half_open_fail_threshold {
                    self.trip(t);
                } else if self.successes(t) > self.config.half_open_success_threshold {
                    self.close();
                }
            }
        }

        if self.state != from {
            self.instrument.on_state_change(from, self.state);
        }
    }

    fn close(&mut self) {
        self.state = State::Closed;
        self.clear_window();
    }

    fn trip(&mut self, t: Instant) {
        self.state = State::Open;
        self.clear_window();
        self.deadline = t + self.config.open_duration;
    }

    fn clear_window(&mut self) {
        self.successes = 0.0;
        self.failures = 0.0;
        self.deadline = self.decay.landmark();
    }
}

fn normalize(sum: f64, factor: f64) -> u32 {
    (sum / factor).ceil() as u32
}
