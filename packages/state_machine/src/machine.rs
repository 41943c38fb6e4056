use std::any::type_name;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::{Gates, MAX_STATES, Result, State, StateId, StateSet, TransitionError};

/// A finite state machine whose transitions are guarded by per-state gates.
///
/// States are registered with [`add_state()`][Self::add_state], which assigns each one a
/// [`StateId`] bit flag. After [`start()`][Self::start], the machine always has a current state.
///
/// # Gates
///
/// Each state owns a set of gates that decide whether a transition into or out of it may
/// happen:
///
/// * An **enter gate** is keyed by the state being left. Entering a state is denied unless the
///   enter gate for the origin allows it.
/// * The **any-enter gate** is consulted for every origin and OR'ed with the enter gate.
/// * A **leave gate** is keyed by the state being entered. Leaving a state is allowed unless
///   the leave gate for the target denies it.
///
/// Gates receive the state on the other side of the transition and the event that requested
/// the transition. [`try_transit()`][Self::try_transit] consults the gates while
/// [`goto_state()`][Self::goto_state] bypasses them.
///
/// # Example
///
/// ```rust
/// use state_machine::{State, StateMachine, TransitionError};
///
/// struct Idle;
/// impl State<u32> for Idle {}
///
/// struct Attack;
/// impl State<u32> for Attack {}
///
/// let mut machine = StateMachine::<u32>::new();
/// let idle = machine.add_state(Idle)?;
/// let attack = machine.add_state(Attack)?;
///
/// // Attacking requires enough stamina.
/// machine.add_enter_gate(attack, idle, |_, stamina| *stamina >= 10)?;
/// machine.add_enter_gate(idle, attack, |_, _| true)?;
///
/// machine.start(idle, &0)?;
///
/// assert!(matches!(
///     machine.try_transit(attack, &5),
///     Err(TransitionError::Refused { .. })
/// ));
/// machine.try_transit(attack, &20)?;
///
/// assert_eq!(machine.current(), Some(attack));
/// assert_eq!(machine.previous(), Some(idle));
/// # Ok::<(), TransitionError>(())
/// ```
///
/// # Thread safety
///
/// The machine is thread-mobile ([`Send`]) but requires `&mut` access for transitions. States
/// must be [`Send`]; gates must be [`Send`] and [`Sync`].
pub struct StateMachine<E> {
    states: Vec<Slot<E>>,

    current: Option<StateId>,
    previous: Option<StateId>,
}

struct Slot<E> {
    state: Box<dyn State<E> + Send>,
    gates: Gates<E>,
}

impl<E> StateMachine<E> {
    /// Creates a machine without any states.
    #[must_use]
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            current: None,
            previous: None,
        }
    }

    /// Registers a state and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::TooManyStates`] if the machine already holds [`MAX_STATES`]
    /// states.
    pub fn add_state<S>(&mut self, state: S) -> Result<StateId>
    where
        S: State<E> + Send + 'static,
    {
        let id = StateId::from_index(self.states.len())
            .ok_or(TransitionError::TooManyStates { max: MAX_STATES })?;

        self.states.push(Slot {
            state: Box::new(state),
            gates: Gates::new(),
        });

        debug!(
            %id,
            state_type = type_name::<S>(),
            "registered state"
        );

        Ok(id)
    }

    /// Number of registered states.
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// The set of all registered states.
    #[must_use]
    pub fn states(&self) -> StateSet {
        StateSet::first(self.states.len())
    }

    /// The state the machine is in, or `None` before [`start()`][Self::start].
    #[must_use]
    pub fn current(&self) -> Option<StateId> {
        self.current
    }

    /// The state the machine was in before the most recent transition, if any.
    #[must_use]
    pub fn previous(&self) -> Option<StateId> {
        self.previous
    }

    /// Enters the initial state without consulting any gates.
    ///
    /// If the machine is already running, this behaves like [`goto_state()`][Self::goto_state].
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::UnknownState`] if `initial` is not registered.
    pub fn start(&mut self, initial: StateId, event: &E) -> Result<()> {
        self.slot(initial)?;

        if self.current.is_some() {
            return self.goto_state(initial, event);
        }

        debug!(state = %initial, "starting state machine");

        self.current = Some(initial);
        self.slot_mut(initial)?.state.enter(event);

        Ok(())
    }

    /// Installs an enter gate on `state` for each origin in `from` that has none yet.
    ///
    /// Origins in `from` that are not registered with the machine are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::UnknownState`] if `state` is not registered.
    pub fn add_enter_gate<F>(
        &mut self,
        state: StateId,
        from: impl Into<StateSet>,
        gate: F,
    ) -> Result<()>
    where
        F: Fn(StateId, &E) -> bool + Send + Sync + 'static,
    {
        let from = from.into().intersection(self.states());
        self.slot_mut(state)?.gates.add_enter(from, Arc::new(gate));
        Ok(())
    }

    /// Removes the enter gates of `state` for every origin in `from`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::UnknownState`] if `state` is not registered.
    pub fn remove_enter_gate(&mut self, state: StateId, from: impl Into<StateSet>) -> Result<()> {
        self.slot_mut(state)?.gates.remove_enter(from.into());
        Ok(())
    }

    /// Installs a leave gate on `state` for each target in `to` that has none yet.
    ///
    /// Targets in `to` that are not registered with the machine are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::UnknownState`] if `state` is not registered.
    pub fn add_leave_gate<F>(
        &mut self,
        state: StateId,
        to: impl Into<StateSet>,
        gate: F,
    ) -> Result<()>
    where
        F: Fn(StateId, &E) -> bool + Send + Sync + 'static,
    {
        let to = to.into().intersection(self.states());
        self.slot_mut(state)?.gates.add_leave(to, Arc::new(gate));
        Ok(())
    }

    /// Removes the leave gates of `state` for every target in `to`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::UnknownState`] if `state` is not registered.
    pub fn remove_leave_gate(&mut self, state: StateId, to: impl Into<StateSet>) -> Result<()> {
        self.slot_mut(state)?.gates.remove_leave(to.into());
        Ok(())
    }

    /// Installs the gate consulted for entering `state` from any origin, replacing the previous
    /// one.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::UnknownState`] if `state` is not registered.
    pub fn set_any_enter_gate<F>(&mut self, state: StateId, gate: F) -> Result<()>
    where
        F: Fn(StateId, &E) -> bool + Send + Sync + 'static,
    {
        self.slot_mut(state)?.gates.set_any_enter(Arc::new(gate));
        Ok(())
    }

    /// Removes the any-origin enter gate of `state`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::UnknownState`] if `state` is not registered.
    pub fn clear_any_enter_gate(&mut self, state: StateId) -> Result<()> {
        self.slot_mut(state)?.gates.clear_any_enter();
        Ok(())
    }

    /// Whether the gates of `target` allow entering it from `from`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::UnknownState`] if either state is not registered.
    pub fn can_enter(&self, target: StateId, from: StateId, event: &E) -> Result<bool> {
        self.slot(from)?;
        Ok(self.slot(target)?.gates.can_enter(from, event))
    }

    /// Whether the gates of `source` allow leaving it for `to`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::UnknownState`] if either state is not registered.
    pub fn can_leave(&self, source: StateId, to: StateId, event: &E) -> Result<bool> {
        self.slot(to)?;
        Ok(self.slot(source)?.gates.can_leave(to, event))
    }

    /// Transitions to `next` without consulting any gates.
    ///
    /// The current state is left, becomes the previous state, and `next` is entered. Both
    /// hooks receive `event`. Transitioning to the current state leaves and re-enters it.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::NotStarted`] before [`start()`][Self::start] and
    /// [`TransitionError::UnknownState`] if `next` is not registered.
    pub fn goto_state(&mut self, next: StateId, event: &E) -> Result<()> {
        let current = self.current.ok_or(TransitionError::NotStarted)?;
        self.slot(next)?;

        debug!(from = %current, to = %next, "changing state");

        self.slot_mut(current)?.state.leave(event);
        self.previous = Some(current);
        self.current = Some(next);
        self.slot_mut(next)?.state.enter(event);

        Ok(())
    }

    /// Transitions to `next` if the current state may be left for it and it may be entered
    /// from the current state.
    ///
    /// The enter gates of `next` are only consulted if the leave gates of the current state
    /// allow the transition.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::Refused`] if a gate vetoed the transition, in which case the
    /// machine is unchanged. Returns [`TransitionError::NotStarted`] before
    /// [`start()`][Self::start] and [`TransitionError::UnknownState`] if `next` is not
    /// registered.
    pub fn try_transit(&mut self, next: StateId, event: &E) -> Result<()> {
        let current = self.current.ok_or(TransitionError::NotStarted)?;

        if !(self.can_leave(current, next, event)? && self.can_enter(next, current, event)?) {
            debug!(from = %current, to = %next, "state change refused");

            return Err(TransitionError::Refused {
                from: current,
                to: next,
            });
        }

        self.goto_state(next, event)
    }

    /// Advances the current state by `delta`. Does nothing before [`start()`][Self::start].
    pub fn update(&mut self, delta: Duration) {
        let Some(current) = self.current else {
            return;
        };

        if let Some(slot) = self.states.get_mut(current.index()) {
            slot.state.update(delta);
        }
    }

    fn slot(&self, id: StateId) -> Result<&Slot<E>> {
        self.states
            .get(id.index())
            .ok_or(TransitionError::UnknownState { state: id })
    }

    fn slot_mut(&mut self, id: StateId) -> Result<&mut Slot<E>> {
        self.states
            .get_mut(id.index())
            .ok_or(TransitionError::UnknownState { state: id })
    }
}

impl<E> Default for StateMachine<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // No API contract to test.
impl<E> fmt::Debug for StateMachine<E> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field(
                "gates",
                &self.states.iter().map(|slot| &slot.gates).collect::<Vec<_>>(),
            )
            .field("current", &self.current)
            .field("previous", &self.previous)
            .finish()
    }
}
