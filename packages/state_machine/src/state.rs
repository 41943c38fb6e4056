use std::time::Duration;

/// Behavior of one state of a [`StateMachine`][crate::StateMachine].
///
/// `E` is the event type that accompanies transitions. Every method has an empty default, so
/// a state only implements the hooks it cares about.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
///
/// use state_machine::State;
///
/// #[derive(Default)]
/// struct Cooldown {
///     remaining: Duration,
/// }
///
/// impl State<Duration> for Cooldown {
///     fn enter(&mut self, length: &Duration) {
///         self.remaining = *length;
///     }
///
///     fn update(&mut self, delta: Duration) {
///         self.remaining = self.remaining.saturating_sub(delta);
///     }
/// }
/// ```
pub trait State<E> {
    /// Called when the machine enters this state, with the event that caused the transition.
    fn enter(&mut self, event: &E) {
        _ = event;
    }

    /// Called when the machine leaves this state, with the event that caused the transition.
    fn leave(&mut self, event: &E) {
        _ = event;
    }

    /// Called by [`StateMachine::update()`][crate::StateMachine::update] while this state is
    /// current.
    fn update(&mut self, delta: Duration) {
        _ = delta;
    }
}
