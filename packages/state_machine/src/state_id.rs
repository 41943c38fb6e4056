use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// The maximum number of states a [`StateMachine`][crate::StateMachine] can hold.
///
/// Each state is identified by one bit of a `u32`.
pub const MAX_STATES: usize = 32;

/// Identifies one state of a [`StateMachine`][crate::StateMachine].
///
/// Every state id is a single bit flag, so ids can be combined into a [`StateSet`] with `|`.
/// Ids are assigned in registration order: the first state added to a machine gets bit 0,
/// the second bit 1 and so on.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct StateId(u32);

impl StateId {
    /// The id of the state registered at position `index`, if the position can be represented.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        let shift = u32::try_from(index).ok()?;
        1_u32.checked_shl(shift).map(Self)
    }

    /// The registration position of this state.
    #[must_use]
    pub fn index(self) -> usize {
        // A u32 has at most 32 trailing zeros, which always fits.
        self.0.trailing_zeros() as usize
    }

    /// The single bit that represents this state.
    #[must_use]
    pub fn bit(self) -> u32 {
        self.0
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // No API contract to test.
impl fmt::Display for StateId {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "state #{}", self.index())
    }
}

/// A set of states, stored as the union of their bit flags.
///
/// Used to attach one transition gate to several neighbouring states at once.
///
/// # Example
///
/// ```rust
/// use state_machine::{StateId, StateSet};
///
/// let idle = StateId::from_index(0).unwrap();
/// let walk = StateId::from_index(1).unwrap();
/// let dead = StateId::from_index(5).unwrap();
///
/// let alive = idle | walk;
/// assert!(alive.contains(walk));
/// assert!(!alive.contains(dead));
/// assert_eq!(alive.iter().collect::<Vec<_>>(), vec![idle, walk]);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct StateSet(u32);

impl StateSet {
    /// A set without any states.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// The set of the first `count` states, i.e. every state of a machine with `count` states.
    #[must_use]
    pub fn first(count: usize) -> Self {
        let mask = match u32::try_from(count) {
            Ok(count) => 1_u32.checked_shl(count).map_or(u32::MAX, |bit| bit.wrapping_sub(1)),
            Err(_) => u32::MAX,
        };

        Self(mask)
    }

    /// Whether the set includes `state`.
    #[must_use]
    pub fn contains(self, state: StateId) -> bool {
        self.0 & state.0 != 0
    }

    /// Whether the set has no states.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of states in the set.
    #[must_use]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// The states shared by both sets.
    #[must_use]
    pub fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// The states in the set, in ascending index order.
    pub fn iter(self) -> impl Iterator<Item = StateId> {
        (0..MAX_STATES)
            .filter_map(StateId::from_index)
            .filter(move |state| self.contains(*state))
    }
}

impl From<StateId> for StateSet {
    fn from(state: StateId) -> Self {
        Self(state.0)
    }
}

impl FromIterator<StateId> for StateSet {
    fn from_iter<I: IntoIterator<Item = StateId>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), |set, state| set | state)
    }
}

impl BitOr for StateSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOr<StateId> for StateSet {
    type Output = Self;

    fn bitor(self, rhs: StateId) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOr for StateId {
    type Output = StateSet;

    fn bitor(self, rhs: Self) -> StateSet {
        StateSet(self.0 | rhs.0)
    }
}

impl BitOrAssign<StateId> for StateSet {
    fn bitor_assign(&mut self, rhs: StateId) {
        self.0 |= rhs.0;
    }
}
