use tracing::{debug, trace};

use crate::SlotId;

/// The unsynchronized core of an [`ObjectPool`][crate::ObjectPool]: an array of slots with a
/// singly-linked chain of vacant slots threaded through it by index.
///
/// Slot identity is the array index, which stays stable when the array is reallocated during
/// expansion.
///
/// All methods here assume the caller holds the pool lock.
#[derive(Debug)]
pub(crate) struct FreeList<T> {
    /// Only used to correlate log events with a specific pool.
    pool_id: u64,

    /// The length of this is the current size of the pool.
    slots: Vec<Slot<T>>,

    /// Head of the chain of vacant slots. `None` means every pool-owned slot is in use.
    current_available: Option<usize>,

    max_size: usize,

    /// Once the pool has grown to `max_size`, this latches to `false` forever, even if slots
    /// later become vacant again.
    can_expand: bool,
}

#[derive(Debug)]
struct Slot<T> {
    /// `None` either if the payload was never constructed or if the slot is currently
    /// borrowed - a borrowed slot's payload travels with the `SlotRef`.
    value: Option<T>,

    in_use: bool,

    /// Index of the next vacant slot. Only meaningful while the slot is on the free chain.
    next: Option<usize>,
}

impl<T> Slot<T> {
    fn vacant(next: Option<usize>) -> Self {
        Self {
            value: None,
            in_use: false,
            next,
        }
    }
}

/// Outcome of trying to create more pool-owned slots.
#[derive(Debug, Eq, PartialEq)]
enum Expansion {
    /// New slots were appended and linked; the free chain now starts at this index.
    Grown { first_new: usize },

    /// The pool has reached its maximum size.
    Exhausted,
}

impl<T> FreeList<T> {
    /// # Panics
    ///
    /// Panics if `initial_size` is zero or greater than `max_size`. The builder is responsible
    /// for validating sizes before we get here.
    pub(crate) fn new(pool_id: u64, initial_size: usize, max_size: usize) -> Self {
        assert!(initial_size > 0, "FreeList must have non-zero initial size");
        assert!(
            initial_size <= max_size,
            "FreeList initial size {initial_size} exceeds maximum size {max_size}"
        );

        let mut free_list = Self {
            pool_id,
            slots: Vec::with_capacity(initial_size),
            current_available: None,
            max_size,
            can_expand: initial_size < max_size,
        };

        free_list.init_free_list(0, initial_size);

        free_list
    }

    pub(crate) fn size(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn max_size(&self) -> usize {
        self.max_size
    }

    pub(crate) fn can_expand(&self) -> bool {
        self.can_expand
    }

    /// Number of slots on the free chain.
    #[cfg_attr(test, mutants::skip)] // Can be mutated to an infinite loop.
    pub(crate) fn available(&self) -> usize {
        let mut count: usize = 0;
        let mut cursor = self.current_available;

        while let Some(index) = cursor {
            // Cannot overflow - the chain is never longer than the slot array.
            count = count.wrapping_add(1);
            cursor = self.slot(index).next;
        }

        count
    }

    /// Pops the head of the free chain, expanding the pool first if the chain is empty.
    ///
    /// Returns the identity of the slot and its payload (if the payload was ever constructed).
    /// If the pool cannot expand any further, a fallback slot that is not part of the pool
    /// is fabricated instead.
    pub(crate) fn fetch(&mut self) -> (SlotId, Option<T>) {
        let index = match self.current_available {
            Some(index) => index,
            None => match self.expand() {
                Expansion::Grown { first_new } => first_new,
                Expansion::Exhausted => {
                    let id = SlotId::next_fallback();
                    trace!(pool_id = self.pool_id, %id, "pool exhausted, fabricated fallback slot");
                    return (id, None);
                }
            },
        };

        let slot = self.slot_mut(index);
        debug_assert!(!slot.in_use, "slot #{index} on the free chain is in use");

        slot.in_use = true;
        let next = slot.next.take();
        let value = slot.value.take();

        self.current_available = next;

        (SlotId::pooled(index), value)
    }

    /// Marks a pool-owned slot as vacant and makes it the new head of the free chain.
    ///
    /// The caller must only release slots obtained from `fetch()` on this free list and only
    /// once per fetch. The `SlotRef` type upholds this for public callers.
    pub(crate) fn release(&mut self, index: usize, value: Option<T>) {
        let head = self.current_available;

        let slot = self.slot_mut(index);
        debug_assert!(slot.in_use, "slot #{index} was returned while not in use");

        slot.in_use = false;
        slot.value = value;
        slot.next = head;

        self.current_available = Some(index);
    }

    /// Grows the slot array when the free chain is empty.
    ///
    /// The array doubles in size until it reaches `max_size`, at which point expansion is
    /// disabled permanently.
    fn expand(&mut self) -> Expansion {
        debug_assert!(
            self.current_available.is_none(),
            "expansion is only valid when the free chain is empty"
        );

        if !self.can_expand {
            return Expansion::Exhausted;
        }

        let size = self.slots.len();
        let mut new_size = size.saturating_mul(2);

        if new_size >= self.max_size {
            new_size = self.max_size;
            self.can_expand = false;
        }

        self.init_free_list(size, new_size);

        debug!(
            pool_id = self.pool_id,
            old_size = size,
            new_size,
            can_expand = self.can_expand,
            "expanded object pool"
        );

        Expansion::Grown { first_new: size }
    }

    /// Appends fresh vacant slots for the indexes `offset..length`, links each to the next and
    /// makes `offset` the head of the free chain.
    ///
    /// The previous chain head is discarded, so this must only be called when the chain is
    /// empty (or, during construction, has never existed).
    fn init_free_list(&mut self, offset: usize, length: usize) {
        debug_assert_eq!(self.slots.len(), offset);
        debug_assert!(offset < length);

        self.slots.reserve_exact(length.saturating_sub(offset));

        for index in offset..length {
            let next = index.checked_add(1).filter(|next| *next < length);
            self.slots.push(Slot::vacant(next));
        }

        self.current_available = Some(offset);
    }

    fn slot(&self, index: usize) -> &Slot<T> {
        self.slots
            .get(index)
            .expect("free chain only links indexes within the slot array")
    }

    fn slot_mut(&mut self, index: usize) -> &mut Slot<T> {
        self.slots
            .get_mut(index)
            .expect("free chain only links indexes within the slot array")
    }

    /// Verifies that the free chain contains exactly the vacant slots, each once.
    #[cfg(test)]
    pub(crate) fn integrity_check(&self) {
        let mut on_chain = vec![false; self.slots.len()];
        let mut cursor = self.current_available;

        while let Some(index) = cursor {
            let seen = on_chain
                .get_mut(index)
                .expect("chain index out of bounds");
            assert!(!*seen, "slot #{index} is linked into the free chain twice");
            *seen = true;

            cursor = self.slot(index).next;
        }

        for (index, slot) in self.slots.iter().enumerate() {
            assert_eq!(
                on_chain.get(index).copied(),
                Some(!slot.in_use),
                "slot #{index} chain membership does not match its in_use flag"
            );

            if slot.in_use {
                assert!(slot.next.is_none(), "in-use slot #{index} has a next link");
            }
        }

        assert!(self.slots.len() <= self.max_size);
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn fetch_index(free_list: &mut FreeList<u32>) -> usize {
        let (id, _) = free_list.fetch();
        id.index().expect("expected a pool-owned slot")
    }

    #[test]
    fn new_links_all_slots_in_order() {
        let free_list = FreeList::<u32>::new(1, 4, 10);

        assert_eq!(free_list.size(), 4);
        assert_eq!(free_list.available(), 4);
        assert_eq!(free_list.current_available, Some(0));
        assert!(free_list.can_expand());
        free_list.integrity_check();
    }

    #[test]
    fn fetch_pops_in_array_order() {
        let mut free_list = FreeList::<u32>::new(1, 3, 3);

        assert_eq!(fetch_index(&mut free_list), 0);
        assert_eq!(fetch_index(&mut free_list), 1);
        assert_eq!(fetch_index(&mut free_list), 2);

        assert_eq!(free_list.available(), 0);
        free_list.integrity_check();
    }

    #[test]
    fn release_is_lifo() {
        let mut free_list = FreeList::<u32>::new(1, 3, 3);

        let a = fetch_index(&mut free_list);
        let b = fetch_index(&mut free_list);

        free_list.release(a, None);
        free_list.release(b, None);
        free_list.integrity_check();

        assert_eq!(fetch_index(&mut free_list), b);
        assert_eq!(fetch_index(&mut free_list), a);
    }

    #[test]
    fn expand_doubles_then_clamps_to_max() {
        let mut free_list = FreeList::<u32>::new(1, 2, 10);

        for _ in 0..2 {
            fetch_index(&mut free_list);
        }
        assert_eq!(free_list.size(), 2);

        fetch_index(&mut free_list);
        assert_eq!(free_list.size(), 4);
        assert!(free_list.can_expand());

        for _ in 0..4 {
            fetch_index(&mut free_list);
        }
        assert_eq!(free_list.size(), 8);
        assert!(free_list.can_expand());

        for _ in 0..2 {
            fetch_index(&mut free_list);
        }
        assert_eq!(free_list.size(), 10);
        assert!(!free_list.can_expand());

        free_list.integrity_check();
    }

    #[test]
    fn exact_doubling_to_max_latches() {
        let mut free_list = FreeList::<u32>::new(1, 5, 10);

        for _ in 0..6 {
            fetch_index(&mut free_list);
        }

        assert_eq!(free_list.size(), 10);
        assert!(!free_list.can_expand());
    }

    #[test]
    fn initial_size_equal_to_max_cannot_expand() {
        let free_list = FreeList::<u32>::new(1, 4, 4);

        assert!(!free_list.can_expand());
    }

    #[test]
    fn expansion_links_only_new_slots() {
        let mut free_list = FreeList::<u32>::new(1, 2, 10);

        fetch_index(&mut free_list);
        fetch_index(&mut free_list);

        // Chain is empty - this fetch expands and takes the first new slot.
        assert_eq!(fetch_index(&mut free_list), 2);
        assert_eq!(free_list.available(), 1);
        assert_eq!(fetch_index(&mut free_list), 3);

        free_list.integrity_check();
    }

    #[test]
    fn exhausted_pool_fabricates_fallback() {
        let mut free_list = FreeList::<u32>::new(1, 1, 1);

        let (first, _) = free_list.fetch();
        assert!(first.owned_by_pool());

        let (fallback, value) = free_list.fetch();
        assert!(!fallback.owned_by_pool());
        assert!(value.is_none());
        assert_eq!(free_list.size(), 1);

        let (another_fallback, _) = free_list.fetch();
        assert_ne!(fallback, another_fallback);

        free_list.integrity_check();
    }

    #[test]
    fn released_value_is_handed_out_again() {
        let mut free_list = FreeList::<u32>::new(1, 2, 2);

        let (id, value) = free_list.fetch();
        assert!(value.is_none());

        let index = id.index().expect("pool-owned slot");
        free_list.release(index, Some(1234));

        let (again, value) = free_list.fetch();
        assert_eq!(again, id);
        assert_eq!(value, Some(1234));
    }

    #[test]
    fn scenario_expand_then_lifo_reuse() {
        let mut free_list = FreeList::<u32>::new(1, 2, 10);

        let _a = fetch_index(&mut free_list);
        let b = fetch_index(&mut free_list);
        assert_eq!(free_list.available(), 0);

        let _c = fetch_index(&mut free_list);
        assert_eq!(free_list.size(), 4);

        free_list.release(b, None);

        assert_eq!(fetch_index(&mut free_list), b);
        free_list.integrity_check();
    }

    #[test]
    #[should_panic]
    fn zero_initial_size_panics() {
        let _free_list = FreeList::<u32>::new(1, 0, 10);
    }

    #[test]
    #[should_panic]
    fn initial_size_above_max_panics() {
        let _free_list = FreeList::<u32>::new(1, 11, 10);
    }
}
