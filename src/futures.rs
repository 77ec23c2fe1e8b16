//! Futures aware circuit breaker.
//!
//! Wraps a future so that admission is checked on the first poll and the
//! outcome is recorded when the future completes. The wrapped future does
//! not wake itself up; the breaker adds no timers of its own.
//!
//! # Example
//!
//! ```
//! use futures::executor::block_on;
//! use gedcb::futures::Callable;
//! use gedcb::{BreakerConfig, CircuitBreaker};
//! use std::time::Instant;
//!
//! let circuit_breaker = CircuitBreaker::new(BreakerConfig::default(), Instant::now());
//!
//! let future = circuit_breaker.call(async { Ok::<_, ()>("hello") });
//! assert_eq!(Ok("hello"), block_on(future));
//! ```

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use pin_project_lite::pin_project;

use crate::circuit_breaker::CircuitBreaker;
use crate::clock;
use crate::decay::DecayFunction;
use crate::error::Error;
use crate::failure_predicate::{self, FailurePredicate};
use crate::instrument::Instrument;

/// A futures aware circuit breaker's public interface.
pub trait Callable {
    /// Breaker handle retained by an in-flight future.
    type Handle: Handle;

    /// Requests permission to call.
    ///
    /// It returns `true` if a call is allowed, or `false` if prohibited.
    fn is_call_permitted(&self) -> bool;

    /// Executes a given future within the circuit breaker.
    ///
    /// Depending on the future result value, the call will be recorded as
    /// success or failure.
    #[inline]
    fn call<F, R, E>(&self, f: F) -> ResultFuture<F, Self::Handle, failure_predicate::Any>
    where
        F: Future<Output = Result<R, E>>,
    {
        self.call_with(failure_predicate::Any, f)
    }

    /// Executes a given future within the circuit breaker.
    ///
    /// Depending on the future result value, the call will be recorded as
    /// success or failure. It also checks the error by the provided
    /// predicate: if the predicate returns `true` for the error, the call is
    /// recorded as a failure, otherwise as a success.
    fn call_with<F, R, E, P>(&self, predicate: P, f: F) -> ResultFuture<F, Self::Handle, P>
    where
        F: Future<Output = Result<R, E>>,
        P: FailurePredicate<E>;
}

/// Admission and recording interface an in-flight future talks to.
pub trait Handle {
    /// Requests permission to call this circuit breaker's backend.
    fn is_call_permitted(&self) -> bool;

    /// Invoked after a successful call.
    fn on_success(&self);

    /// Invoked after a failed call.
    fn on_error(&self);
}

impl<G, I> Handle for CircuitBreaker<G, I>
where
    G: DecayFunction,
    I: Instrument,
{
    #[inline]
    fn is_call_permitted(&self) -> bool {
        self.acquire(clock::now()).is_ok()
    }

    #[inline]
    fn on_success(&self) {
        let _ = self.success(clock::now());
    }

    #[inline]
    fn on_error(&self) {
        let _ = self.failure(clock::now());
    }
}

impl<G, I> Callable for CircuitBreaker<G, I>
where
    G: DecayFunction,
    I: Instrument,
{
    type Handle = CircuitBreaker<G, I>;

    #[inline]
    fn is_call_permitted(&self) -> bool {
        Handle::is_call_permitted(self)
    }

    #[inline]
    fn call_with<F, R, E, P>(&self, predicate: P, f: F) -> ResultFuture<F, Self::Handle, P>
    where
        F: Future<Output = Result<R, E>>,
        P: FailurePredicate<E>,
    {
        ResultFuture {
            future: f,
            handle: self.clone(),
            predicate,
            acquired: false,
        }
    }
}

pin_project! {
    /// A circuit breaker's future.
    #[allow(missing_debug_implementations)]
    #[must_use = "futures do nothing unless you `.await` or poll them"]
    pub struct ResultFuture<FUT, HANDLE, PREDICATE> {
        #[pin]
        future: FUT,
        handle: HANDLE,
        predicate: PREDICATE,
        acquired: bool,
    }
}

impl<FUT, HANDLE, PREDICATE, R, E> Future for ResultFuture<FUT, HANDLE, PREDICATE>
where
    FUT: Future<Output = Result<R, E>>,
    HANDLE: Handle,
    PREDICATE: FailurePredicate<E>,
{
    type Output = Result<R, Error<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        if !*this.acquired {
            if !this.handle.is_call_permitted() {
                return Poll::Ready(Err(Error::Rejected));
            }
            *this.acquired = true;
        }

        match this.future.poll(cx) {
            Poll::Ready(Ok(ok)) => {
                this.handle.on_success();
                Poll::Ready(Ok(ok))
            }
            Poll::Ready(Err(err)) => {
                if this.predicate.is_err(&err) {
                    this.handle.on_error();
                } else {
                    this.handle.on_success();
                }
                Poll::Ready(Err(Error::Inner(err)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock;
    use crate::config::BreakerConfig;
    use crate::decay::Exponential;
    use futures::executor::block_on;

    fn new_circuit_breaker() -> CircuitBreaker<Exponential, ()> {
        let config = BreakerConfig {
            soft_fail_threshold: 0,
            hard_fail_threshold: 0,
            ..BreakerConfig::default()
        };
        CircuitBreaker::new(config, clock::now())
    }

    #[test]
    fn call_ok() {
        clock::freeze(|_| {
            let circuit_breaker = new_circuit_breaker();

            let future = circuit_breaker.call(async { Ok::<_, ()>(1) });
            assert_eq!(Ok(1), block_on(future));
            assert!(Callable::is_call_permitted(&circuit_breaker));
        });
    }

    #[test]
    fn call_err() {
        clock::freeze(|_| {
            let circuit_breaker = new_circuit_breaker();

            let future = circuit_breaker.call(async { Err::<(), _>(()) });
            match block_on(future) {
                Err(Error::Inner(())) => {}
                err => unreachable!("{:?}", err),
            }

            let future = circuit_breaker.call(async { Ok::<_, ()>(2) });
            match block_on(future) {
                Err(Error::Rejected) => {}
                err => unreachable!("{:?}", err),
            }
        });
    }

    #[test]
    fn call_with() {
        clock::freeze(|_| {
            let circuit_breaker = new_circuit_breaker();
            let is_err = |err: &bool| !*err;

            let future = circuit_breaker.call_with(is_err, async { Err::<(), _>(true) });
            match block_on(future) {
                Err(Error::Inner(true)) => {}
                err => unreachable!("{:?}", err),
            }
            assert!(Callable::is_call_permitted(&circuit_breaker));

            let future = circuit_breaker.call_with(is_err, async { Err::<(), _>(false) });
            match block_on(future) {
                Err(Error::Inner(false)) => {}
                err => unreachable!("{:?}", err),
            }
            assert!(!Callable::is_call_permitted(&circuit_breaker));
        });
    }
}
