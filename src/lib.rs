//! A gossip-enhanced, decay-based circuit breaker.
//!
//! Each node in a fleet runs a local breaker that observes its own
//! successes and failures against a shared downstream dependency and
//! decides whether calls should be attempted. The classical three-state
//! logic (see <https://martinfowler.com/bliki/CircuitBreaker.html>) is
//! augmented in three ways:
//!
//! * a `Suspicion` state delays trip-open while the node gathers more
//!   evidence;
//! * forward-decayed counters weight recent events more heavily without
//!   maintaining a sliding window of samples;
//! * a peer-state input lets a node trip faster once a quorum of its peers
//!   already suspects the dependency has failed.
//!
//! The breaker schedules no timers, spawns no background work and does no
//! I/O. The embedding host records outcomes and checks admission with
//! explicit timestamps, pushes peer states in from its own gossip layer,
//! and may observe transitions through an [`Instrument`] it then
//! propagates on its gossip channel.
//!
//! # Example
//!
//! ```
//! use gedcb::{BreakerConfig, Callable, CircuitBreaker, Error};
//! use rand::{thread_rng, Rng};
//! use std::time::Instant;
//!
//! // A function that sometimes fails.
//! fn dangerous_call() -> Result<(), ()> {
//!     if thread_rng().gen_range(0..10) == 0 {
//!         return Err(());
//!     }
//!     Ok(())
//! }
//!
//! // A breaker configured with reasonable defaults.
//! let circuit_breaker = CircuitBreaker::new(BreakerConfig::default(), Instant::now());
//!
//! for _ in 0..20 {
//!     match circuit_breaker.call(dangerous_call) {
//!         Err(Error::Rejected) => break,
//!         _ => continue,
//!     }
//! }
//! ```

#![deny(missing_debug_implementations)]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

mod breaker;
mod circuit_breaker;
mod config;
mod decay;
mod error;
mod failure_predicate;
mod instrument;

pub mod clock;
pub mod futures;

pub use self::breaker::{Breaker, State, DEFAULT_DECAY_TARGET};
pub use self::circuit_breaker::{Callable, CircuitBreaker};
pub use self::config::BreakerConfig;
pub use self::decay::{
    BasicItem, DecayFunction, Exponential, ForwardDecay, Item, Polynomial,
};
pub use self::error::{Error, OpenBreaker};
pub use self::failure_predicate::{Any, FailurePredicate};
pub use self::instrument::Instrument;
