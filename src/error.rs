use std::error::Error as StdError;
use std::fmt::{self, Display};

/// Signals that the breaker is currently `Open` and the protected call must
/// not be attempted.
///
/// Produced by `acquire`, `success` and `failure`; every other operation is
/// total. Callers translate this into their own policy, e.g. failing fast or
/// serving a cached response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenBreaker;

impl Display for OpenBreaker {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "open breaker")
    }
}

impl StdError for OpenBreaker {}

/// A `CircuitBreaker`'s call error.
#[derive(Debug, PartialEq)]
pub enum Error<E> {
    /// An error from the inner call.
    Inner(E),
    /// The call was rejected because the breaker is open.
    Rejected,
}

impl<E> Display for Error<E>
where
    E: Display,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Rejected => write!(f, "call was rejected"),
            Error::Inner(err) => write!(f, "{}", err),
        }
    }
}

impl<E> StdError for Error<E>
where
    E: StdError + 'static,
{
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Inner(ref err) => Some(err),
            _ => None,
        }
    }
}

impl<E> From<OpenBreaker> for Error<E> {
    fn from(_: OpenBreaker) -> Self {
        Error::Rejected
    }
}
