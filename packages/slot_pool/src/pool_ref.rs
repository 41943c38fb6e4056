use std::any::type_name;
use std::fmt;

use crate::{ObjectPool, SlotId, SlotRef};

/// A handle that borrows at most one slot from an [`ObjectPool`] at a time.
///
/// A new handle is unbound. [`fetch_from_pool()`][Self::fetch_from_pool] binds it to a slot and
/// [`return_to_pool()`][Self::return_to_pool] releases the slot again. Both operations are
/// idempotent: fetching while bound returns the current payload and returning while unbound
/// does nothing. A handle may be rebound any number of times.
///
/// ```text
/// Unbound --fetch_from_pool--> Bound --return_to_pool--> Unbound
/// ```
///
/// The payload is constructed lazily via [`Default`] the first time the slot is accessed.
///
/// # Release on drop
///
/// Dropping a bound handle returns its slot to the pool, whichever way the scope that owns the
/// handle is exited (including `?` propagation and unwinding).
///
/// # Example
///
/// ```rust
/// use slot_pool::{ObjectPool, PoolRef};
///
/// let pool = ObjectPool::<String>::new(1, 2);
///
/// {
///     let mut handle = PoolRef::new(&pool);
///     assert!(handle.is_invalid());
///
///     handle.fetch_from_pool().push_str("pooled");
///     assert_eq!(handle.value().map(|s| s.as_str()), Some("pooled"));
///     assert_eq!(pool.available(), 0);
/// } // The slot is returned here.
///
/// assert_eq!(pool.available(), 1);
/// ```
///
/// # Thread safety
///
/// The handle is thread-mobile ([`Send`]) and shareable ([`Sync`]) if `T` is [`Send`] and
/// [`Sync`] respectively. The payload is accessed without taking the pool lock.
pub struct PoolRef<T> {
    pool: ObjectPool<T>,

    slot: Option<SlotRef<T>>,
}

impl<T> PoolRef<T> {
    /// Creates an unbound handle for the given pool.
    ///
    /// The handle keeps the pool alive for as long as the handle exists.
    #[must_use]
    pub fn new(pool: &ObjectPool<T>) -> Self {
        Self {
            pool: pool.clone(),
            slot: None,
        }
    }

    /// Releases the bound slot, if any.
    ///
    /// A pool-owned slot goes back onto the pool's free chain; a fallback slot is dropped.
    /// Either way the handle is unbound afterwards. Calling this on an unbound handle does
    /// nothing.
    ///
    /// Any payload reference obtained before this call is invalidated by the borrow checker.
    pub fn return_to_pool(&mut self) {
        let Some(slot) = self.slot.take() else {
            return;
        };

        // Fallback slots are dropped right here, never offered to the free chain.
        if slot.owned_by_pool() {
            self.pool.release(slot);
        }
    }

    /// Whether the handle is currently bound to a slot.
    #[must_use]
    #[inline]
    pub fn is_bound(&self) -> bool {
        self.slot.is_some()
    }

    /// Whether the handle has no payload to offer, i.e. it is not bound to a slot.
    #[must_use]
    #[inline]
    pub fn is_invalid(&self) -> bool {
        !self.is_bound()
    }

    /// The identity of the bound slot, if any.
    #[must_use]
    #[inline]
    pub fn slot_id(&self) -> Option<SlotId> {
        self.slot.as_ref().map(SlotRef::id)
    }

    /// The pool this handle borrows from.
    #[must_use]
    #[inline]
    pub fn pool(&self) -> &ObjectPool<T> {
        &self.pool
    }
}

impl<T: Default> PoolRef<T> {
    /// Binds the handle to a slot if it is not bound yet and returns the payload.
    ///
    /// If the handle is already bound, the pool is not consulted and the current payload is
    /// returned. Otherwise a slot is fetched from the pool (expanding the pool or falling back
    /// to a transient slot as needed).
    pub fn fetch_from_pool(&mut self) -> &mut T {
        let pool = &self.pool;

        self.slot
            .get_or_insert_with(|| pool.fetch())
            .value_mut()
    }

    /// The payload of the bound slot, or `None` if the handle is unbound.
    ///
    /// This does not bind the handle but does construct the payload if the bound slot has
    /// never been used before.
    #[must_use]
    pub fn value(&mut self) -> Option<&mut T> {
        self.slot.as_mut().map(SlotRef::value_mut)
    }
}

impl<T> Drop for PoolRef<T> {
    fn drop(&mut self) {
        self.return_to_pool();
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // No API contract to test.
impl<T> fmt::Debug for PoolRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("pool", &self.pool)
            .field("slot", &self.slot)
            .finish()
    }
}
