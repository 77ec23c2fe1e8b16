//! Wall clock used by the call surface.
//!
//! The raw breaker operations take explicit timestamps and never read a
//! clock; only the [`Callable`](crate::Callable) convenience API calls
//! [`now`]. Tests freeze the thread's clock with [`freeze`] and drive it
//! manually.

use std::cell::Cell;
use std::time::{Duration, Instant};

thread_local!(static FROZEN: Cell<Option<Instant>> = Cell::new(None));

/// A manually driven clock, handed to the closure given to [`freeze`].
#[derive(Debug)]
pub struct MockClock(Instant);

impl MockClock {
    /// Current instant of the mock.
    pub fn now(&self) -> Instant {
        self.0
    }

    /// Moves the mock forward by `diff`.
    pub fn advance(&mut self, diff: Duration) {
        self.0 += diff;
        FROZEN.with(|cell| cell.set(Some(self.0)));
    }
}

/// Runs `f` with this thread's clock frozen at the current instant.
///
/// While the closure runs, every [`now`] call on this thread observes the
/// mock, which only moves when [`MockClock::advance`] is called.
///
/// # Panics
///
/// * When the thread's clock is already frozen.
pub fn freeze<F, R>(f: F) -> R
where
    F: FnOnce(&mut MockClock) -> R,
{
    FROZEN.with(|cell| {
        assert!(
            cell.get().is_none(),
            "clock is already frozen on this thread"
        );

        let mut clock = MockClock(Instant::now());
        cell.set(Some(clock.0));

        // Thaw when leaving the scope, panicking included.
        struct Reset<'a>(&'a Cell<Option<Instant>>);

        impl Drop for Reset<'_> {
            fn drop(&mut self) {
                self.0.set(None);
            }
        }

        let _reset = Reset(cell);

        f(&mut clock)
    })
}

/// Reads this thread's clock: the mock while frozen, `Instant::now`
/// otherwise.
pub fn now() -> Instant {
    FROZEN.with(|cell| cell.get().unwrap_or_else(Instant::now))
}
