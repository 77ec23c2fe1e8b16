use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::breaker::{Breaker, State};
use crate::clock;
use crate::config::BreakerConfig;
use crate::decay::{DecayFunction, Exponential};
use crate::error::{Error, OpenBreaker};
use crate::failure_predicate::{self, FailurePredicate};
use crate::instrument::Instrument;

/// A thread-safe, cloneable handle around a [`Breaker`].
///
/// All operations serialize on one internal mutex, so a gossip thread may
/// push peer updates while request threads record outcomes; an operation
/// observes the effects of every operation serialized before it. Instruments
/// fire while that mutex is held and must not re-enter the breaker.
#[derive(Debug)]
pub struct CircuitBreaker<G, I> {
    breaker: Arc<Mutex<Breaker<G, I>>>,
}

/// A circuit breaker's call-oriented interface.
pub trait Callable {
    /// Requests permission to call.
    ///
    /// It returns `true` if a call is allowed, or `false` if prohibited.
    fn is_call_permitted(&self) -> bool;

    /// Executes a given function within the circuit breaker.
    ///
    /// Depending on the function result value, the call will be recorded as
    /// success or failure.
    #[inline]
    fn call<F, E, R>(&self, f: F) -> Result<R, Error<E>>
    where
        F: FnOnce() -> Result<R, E>,
    {
        self.call_with(failure_predicate::Any, f)
    }

    /// Executes a given function within the circuit breaker.
    ///
    /// Depending on the function result value, the call will be recorded as
    /// success or failure. It also checks the error by the provided
    /// predicate: if the predicate returns `true` for the error, the call is
    /// recorded as a failure, otherwise as a success.
    fn call_with<P, F, E, R>(&self, predicate: P, f: F) -> Result<R, Error<E>>
    where
        F: FnOnce() -> Result<R, E>,
        P: FailurePredicate<E>;
}

impl CircuitBreaker<Exponential, ()> {
    /// Creates a breaker with the default exponential decay and no
    /// instrument.
    ///
    /// # Panics
    ///
    /// * When `config` carries a zero `window_size` or `open_duration`.
    pub fn new(config: BreakerConfig, landmark: Instant) -> Self {
        Breaker::new(config, landmark).into()
    }
}

impl<G, I> From<Breaker<G, I>> for CircuitBreaker<G, I>
where
    G: DecayFunction,
    I: Instrument,
{
    fn from(breaker: Breaker<G, I>) -> Self {
        Self {
            breaker: Arc::new(Mutex::new(breaker)),
        }
    }
}

impl<G, I> CircuitBreaker<G, I>
where
    G: DecayFunction,
    I: Instrument,
{
    /// Requests permission to attempt the protected call at time `t`.
    pub fn acquire(&self, t: Instant) -> Result<(), OpenBreaker> {
        let mut breaker = self.breaker.lock().unwrap();
        breaker.acquire(t)
    }

    /// Records a successful call at time `t`.
    pub fn success(&self, t: Instant) -> Result<(), OpenBreaker> {
        let mut breaker = self.breaker.lock().unwrap();
        breaker.success(t)
    }

    /// Records a failed call at time `t`.
    pub fn failure(&self, t: Instant) -> Result<(), OpenBreaker> {
        let mut breaker = self.breaker.lock().unwrap();
        breaker.failure(t)
    }

    /// Decayed success count as of time `t`, rounded up.
    pub fn successes(&self, t: Instant) -> u32 {
        let breaker = self.breaker.lock().unwrap();
        breaker.successes(t)
    }

    /// Decayed failure count as of time `t`, rounded up.
    pub fn failures(&self, t: Instant) -> u32 {
        let breaker = self.breaker.lock().unwrap();
        breaker.failures(t)
    }

    /// Re-bases the decayed sums onto `t`, runs the transition and returns
    /// the resulting state.
    pub fn state(&self, t: Instant) -> State {
        let mut breaker = self.breaker.lock().unwrap();
        breaker.state(t)
    }

    /// Deadline at which the current `Open` period ends.
    pub fn deadline(&self) -> Instant {
        let breaker = self.breaker.lock().unwrap();
        breaker.deadline()
    }

    /// Records the last-known breaker state of peer `id`.
    pub fn update_peer(&self, id: impl Into<String>, state: State) {
        let mut breaker = self.breaker.lock().unwrap();
        breaker.update_peer(id, state);
    }

    /// Forgets peer `id`.
    pub fn delete_peer(&self, id: &str) {
        let mut breaker = self.breaker.lock().unwrap();
        breaker.delete_peer(id);
    }

    /// Replaces the peer view with a full gossip snapshot.
    pub fn sync_peers(&self, snapshot: &HashMap<String, State>) {
        let mut breaker = self.breaker.lock().unwrap();
        breaker.sync_peers(snapshot);
    }

    /// True when a strict majority of known peers reports a non-`Closed`
    /// state.
    pub fn majority_suspect(&self) -> bool {
        let breaker = self.breaker.lock().unwrap();
        breaker.majority_suspect()
    }
}

impl<G, I> Callable for CircuitBreaker<G, I>
where
    G: DecayFunction,
    I: Instrument,
{
    #[inline]
    fn is_call_permitted(&self) -> bool {
        self.acquire(clock::now()).is_ok()
    }

    #[inline]
    fn call_with<P, F, E, R>(&self, predicate: P, f: F) -> Result<R, Error<E>>
    where
        F: FnOnce() -> Result<R, E>,
        P: FailurePredicate<E>,
    {
        self.acquire(clock::now())?;

        match f() {
            Ok(ok) => {
                // A concurrent trip between the call and the record is not
                // an extra outcome of this call.
                let _ = self.success(clock::now());
                Ok(ok)
            }
            Err(err) => {
                if predicate.is_err(&err) {
                    let _ = self.failure(clock::now());
                } else {
                    let _ = self.success(clock::now());
                }
                Err(Error::Inner(err))
            }
        }
    }
}

impl<G, I> Clone for CircuitBreaker<G, I> {
    fn clone(&self) -> Self {
        Self {
            breaker: self.breaker.clone(),
        }
    }
}
