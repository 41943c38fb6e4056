use std::fmt;
use std::sync::Arc;

use foldhash::{HashMap, HashMapExt};

use crate::{StateId, StateSet};

/// A transition predicate. Receives the state on the other side of the transition and the
/// event that requested it.
pub(crate) type Gate<E> = Arc<dyn Fn(StateId, &E) -> bool + Send + Sync>;

/// The transition gates owned by one state.
///
/// Entering is denied unless a gate allows it, leaving is allowed unless a gate denies it.
pub(crate) struct Gates<E> {
    // Keyed by the state being left when entering the owner.
    enter: HashMap<StateId, Gate<E>>,

    // Keyed by the state being entered when leaving the owner.
    leave: HashMap<StateId, Gate<E>>,

    // Consulted for every enter attempt regardless of origin.
    any_enter: Option<Gate<E>>,
}

impl<E> Gates<E> {
    pub(crate) fn new() -> Self {
        Self {
            enter: HashMap::new(),
            leave: HashMap::new(),
            any_enter: None,
        }
    }

    /// Installs `gate` for every state in `from` that does not have an enter gate yet.
    pub(crate) fn add_enter(&mut self, from: StateSet, gate: Gate<E>) {
        add_for_each(&mut self.enter, from, &gate);
    }

    pub(crate) fn remove_enter(&mut self, from: StateSet) {
        for state in from.iter() {
            self.enter.remove(&state);
        }
    }

    /// Installs `gate` for every state in `to` that does not have a leave gate yet.
    pub(crate) fn add_leave(&mut self, to: StateSet, gate: Gate<E>) {
        add_for_each(&mut self.leave, to, &gate);
    }

    pub(crate) fn remove_leave(&mut self, to: StateSet) {
        for state in to.iter() {
            self.leave.remove(&state);
        }
    }

    pub(crate) fn set_any_enter(&mut self, gate: Gate<E>) {
        self.any_enter = Some(gate);
    }

    pub(crate) fn clear_any_enter(&mut self) {
        self.any_enter = None;
    }

    pub(crate) fn can_enter(&self, from: StateId, event: &E) -> bool {
        let specific = self.enter.get(&from).is_some_and(|gate| gate(from, event));

        // The any-state gate is always consulted, even if the specific gate already allowed it.
        let any = self.any_enter.as_ref().is_some_and(|gate| gate(from, event));

        specific || any
    }

    pub(crate) fn can_leave(&self, to: StateId, event: &E) -> bool {
        self.leave.get(&to).is_none_or(|gate| gate(to, event))
    }
}

fn add_for_each<E>(gates: &mut HashMap<StateId, Gate<E>>, states: StateSet, gate: &Gate<E>) {
    for state in states.iter() {
        gates.entry(state).or_insert_with(|| Arc::clone(gate));
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // No API contract to test.
impl<E> fmt::Debug for Gates<E> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut enter: Vec<_> = self.enter.keys().collect();
        enter.sort_unstable();
        let mut leave: Vec<_> = self.leave.keys().collect();
        leave.sort_unstable();

        f.debug_struct("Gates")
            .field("enter", &enter)
            .field("leave", &leave)
            .field("any_enter", &self.any_enter.is_some())
            .finish()
    }
}
