use crate::breaker::State;

/// Consumes the breaker's state machine events. May be used for metrics,
/// logs, or to mark the local state dirty for the next gossip tick.
///
/// Instruments fire synchronously while the breaker's mutex is held:
/// implementations must not call back into the breaker and should enqueue
/// any expensive work and return quickly.
pub trait Instrument {
    /// Called on every transition with the previous and the new state.
    fn on_state_change(&self, from: State, to: State);

    /// Called when the breaker rejects an operation because it is open.
    fn on_call_rejected(&self) {}
}

impl Instrument for () {
    fn on_state_change(&self, _: State, _: State) {}
}

impl<F> Instrument for F
where
    F: Fn(State, State),
{
    fn on_state_change(&self, from: State, to: State) {
        self(from, to)
    }
}
