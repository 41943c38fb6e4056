use std::any::type_name;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{FreeList, ObjectPoolBuilder, SlotRef};

/// Global counter for generating unique pool IDs.
static POOL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generates a unique pool ID.
fn generate_pool_id() -> u64 {
    POOL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A thread-safe pool of reusable value slots of type `T`.
///
/// The pool owns an array of slots with a free chain of vacant slots threaded through it.
/// [`fetch()`][Self::fetch] pops the most recently returned slot and [`release()`][Self::release]
/// pushes a slot back, so slots are reused in LIFO order.
///
/// # Lazy construction
///
/// Slots are created empty. A slot's payload is constructed via [`Default`] the first time it is
/// accessed and then stays with the slot, so later borrowers of the same slot receive the same
/// (possibly modified) value. The pool never resets payloads.
///
/// # Bounded growth
///
/// When all slots are in use, the pool doubles its slot array, up to the maximum size. Once the
/// maximum size has been reached, the pool never grows again. From then on, a fetch while all
/// slots are in use returns a fallback slot that is not part of the pool and is simply dropped
/// when returned. Running out of pool capacity is therefore never an error.
///
/// # Lifetime management
///
/// The pool type itself acts as a handle - any clones of it are functionally equivalent,
/// similar to `Arc`. [`PoolRef`][crate::PoolRef] handles also keep the pool alive.
///
/// # Example
///
/// ```rust
/// use slot_pool::ObjectPool;
///
/// let pool = ObjectPool::<Vec<u8>>::new(2, 4);
///
/// let mut slot = pool.fetch();
/// slot.value_mut().extend_from_slice(b"hello");
/// pool.release(slot);
///
/// // The payload stays with the slot and is reused by the next borrower.
/// let slot = pool.fetch();
/// assert_eq!(slot.get().map(Vec::as_slice), Some(&b"hello"[..]));
/// pool.release(slot);
/// ```
///
/// # Thread safety
///
/// The pool is thread-safe ([`Send`] and [`Sync`]) if `T` is [`Send`]. All slot bookkeeping is
/// guarded by a single lock that is held only while a slot is being fetched or returned, never
/// while a payload is being used.
pub struct ObjectPool<T> {
    inner: Arc<PoolInner<T>>,
}

struct PoolInner<T> {
    /// We need to uniquely identify each pool to ensure that slots are not returned to the
    /// wrong pool. If the pool ID does not match when a slot is returned, we panic.
    pool_id: u64,

    free_list: Mutex<FreeList<T>>,
}

impl<T> ObjectPool<T> {
    /// Creates a pool with the given initial and maximum number of slots.
    ///
    /// A size of zero selects the default for that size (5 initial slots, 10 maximum).
    ///
    /// # Panics
    ///
    /// Panics if `initial_size` exceeds `max_size`. Use [`builder()`][Self::builder] to receive
    /// an error instead.
    #[must_use]
    pub fn new(initial_size: usize, max_size: usize) -> Self {
        match Self::builder()
            .initial_size(initial_size)
            .max_size(max_size)
            .build()
        {
            Ok(pool) => pool,
            Err(error) => panic!("invalid object pool configuration: {error}"),
        }
    }

    /// Starts building a new [`ObjectPool`].
    #[inline]
    pub fn builder() -> ObjectPoolBuilder<T> {
        ObjectPoolBuilder::new()
    }

    #[must_use]
    pub(crate) fn new_inner(initial_size: usize, max_size: usize) -> Self {
        let pool_id = generate_pool_id();

        debug!(pool_id, initial_size, max_size, "created object pool");

        Self {
            inner: Arc::new(PoolInner {
                pool_id,
                free_list: Mutex::new(FreeList::new(pool_id, initial_size, max_size)),
            }),
        }
    }

    /// Fetches a vacant slot, expanding the pool if necessary.
    ///
    /// This always succeeds. If the pool has reached its maximum size and every slot is in use,
    /// the returned slot is a fallback slot (see [`SlotRef::owned_by_pool()`]).
    ///
    /// The slot must be returned via [`release()`][Self::release], otherwise it is lost to the
    /// pool for good. Prefer [`PoolRef`][crate::PoolRef] which returns its slot automatically.
    pub fn fetch(&self) -> SlotRef<T> {
        let (id, value) = self.inner.free_list.lock().fetch();

        SlotRef::new(self.inner.pool_id, id, value)
    }

    /// Returns a slot previously fetched from this pool.
    ///
    /// A pool-owned slot becomes the head of the free chain, together with its payload. A
    /// fallback slot is dropped, together with its payload.
    ///
    /// # Panics
    ///
    /// Panics if the slot was fetched from a different pool.
    pub fn release(&self, slot: SlotRef<T>) {
        assert!(
            slot.pool_id == self.inner.pool_id,
            "attempted to return a slot to a different pool (slot pool ID: {}, current pool ID: {})",
            slot.pool_id,
            self.inner.pool_id
        );

        let (id, value) = slot.into_parts();

        match id.index() {
            Some(index) => self.inner.free_list.lock().release(index, value),
            None => {
                trace!(pool_id = self.inner.pool_id, %id, "dropping returned fallback slot");

                // The payload is dropped here, outside the pool lock.
                drop(value);
            }
        }
    }

    /// The current number of pool-owned slots, in use or not.
    ///
    /// This never exceeds [`max_size()`][Self::max_size]; fallback slots are not counted.
    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.free_list.lock().size()
    }

    /// The number of pool-owned slots the pool may grow to.
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.inner.free_list.lock().max_size()
    }

    /// Whether the pool may still grow. Once this returns `false`, it never returns `true` again.
    #[must_use]
    pub fn can_expand(&self) -> bool {
        self.inner.free_list.lock().can_expand()
    }

    /// The number of pool-owned slots that are currently vacant.
    #[must_use]
    pub fn available(&self) -> usize {
        self.inner.free_list.lock().available()
    }

    #[cfg(test)]
    pub(crate) fn integrity_check(&self) {
        self.inner.free_list.lock().integrity_check();
    }
}

impl<T> Clone for ObjectPool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for ObjectPool<T> {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // No API contract to test.
impl<T> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let free_list = self.inner.free_list.lock();

        f.debug_struct(type_name::<Self>())
            .field("pool_id", &self.inner.pool_id)
            .field("size", &free_list.size())
            .field("max_size", &free_list.max_size())
            .field("can_expand", &free_list.can_expand())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::collections::HashSet;
    use std::rc::Rc;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::SlotId;

    assert_impl_all!(ObjectPool<String>: Send, Sync, Clone, fmt::Debug);
    assert_not_impl_any!(ObjectPool<Rc<u8>>: Send, Sync);

    #[test]
    fn default_pool_uses_default_sizes() {
        let pool = ObjectPool::<u32>::default();

        assert_eq!(pool.size(), 5);
        assert_eq!(pool.max_size(), 10);
        assert_eq!(pool.available(), 5);
        assert!(pool.can_expand());
    }

    #[test]
    #[should_panic]
    fn new_with_initial_above_max_panics() {
        let _pool = ObjectPool::<u32>::new(8, 4);
    }

    #[test]
    fn outstanding_slots_are_distinct_up_to_max() {
        let pool = ObjectPool::<u32>::new(1, 10);

        let slots: Vec<_> = (0..10).map(|_| pool.fetch()).collect();
        let ids: HashSet<SlotId> = slots.iter().map(SlotRef::id).collect();

        assert_eq!(ids.len(), 10);
        assert!(ids.iter().all(SlotId::owned_by_pool));
        pool.integrity_check();

        for slot in slots {
            pool.release(slot);
        }

        assert_eq!(pool.available(), 10);
        pool.integrity_check();
    }

    #[test]
    fn ceiling_is_enforced_with_fallback() {
        let pool = ObjectPool::<u32>::new(5, 10);

        let slots: Vec<_> = (0..10).map(|_| pool.fetch()).collect();
        assert_eq!(pool.size(), 10);
        assert!(!pool.can_expand());

        let eleventh = pool.fetch();
        assert!(!eleventh.owned_by_pool());
        assert_eq!(pool.size(), 10);
        assert_eq!(pool.available(), 0);

        pool.release(eleventh);
        assert_eq!(pool.size(), 10);
        assert_eq!(pool.available(), 0);

        for slot in slots {
            pool.release(slot);
        }
        pool.integrity_check();
    }

    #[test]
    fn returned_fallback_is_never_fetched_again() {
        let pool = ObjectPool::<u32>::new(1, 1);

        let held = pool.fetch();
        let fallback = pool.fetch();
        let fallback_id = fallback.id();
        pool.release(fallback);

        for _ in 0..10 {
            let slot = pool.fetch();
            assert_ne!(slot.id(), fallback_id);
            pool.release(slot);
        }

        pool.release(held);
    }

    #[test]
    fn fallback_payload_is_not_reused() {
        let pool = ObjectPool::<String>::new(1, 1);

        let held = pool.fetch();

        let mut fallback = pool.fetch();
        fallback.value_mut().push_str("transient");
        pool.release(fallback);

        let next = pool.fetch();
        assert!(!next.owned_by_pool());
        assert!(!next.is_constructed());

        pool.release(next);
        pool.release(held);
    }

    #[test]
    fn latch_survives_returning_every_slot() {
        let pool = ObjectPool::<u32>::new(2, 4);

        let slots: Vec<_> = (0..4).map(|_| pool.fetch()).collect();
        assert!(!pool.can_expand());

        for slot in slots {
            pool.release(slot);
        }

        assert!(!pool.can_expand());
        assert_eq!(pool.available(), 4);
    }

    #[test]
    fn lifo_reuse_after_expansion() {
        let pool = ObjectPool::<u32>::new(2, 10);

        let a = pool.fetch();
        let b = pool.fetch();
        let c = pool.fetch();
        assert_eq!(pool.size(), 4);

        let b_id = b.id();
        pool.release(b);

        let d = pool.fetch();
        assert_eq!(d.id(), b_id);

        pool.release(a);
        pool.release(c);
        pool.release(d);
        pool.integrity_check();
    }

    #[test]
    fn expansion_preserves_outstanding_payloads() {
        let pool = ObjectPool::<String>::new(2, 8);

        let mut first = pool.fetch();
        first.value_mut().push_str("first");
        let mut second = pool.fetch();
        second.value_mut().push_str("second");

        let first_id = first.id();
        let second_id = second.id();

        // Forces expansion while the first two slots are outstanding.
        let third = pool.fetch();
        assert_eq!(pool.size(), 4);

        assert_eq!(first.id(), first_id);
        assert_eq!(second.id(), second_id);
        assert_eq!(first.get().map(String::as_str), Some("first"));
        assert_eq!(second.get().map(String::as_str), Some("second"));

        let third_id = third.id();

        pool.release(first);
        pool.release(second);
        pool.release(third);

        // Returned payloads were stored back into their original slots.
        let reused_third = pool.fetch();
        assert_eq!(reused_third.id(), third_id);
        assert!(!reused_third.is_constructed());

        let reused_second = pool.fetch();
        assert_eq!(reused_second.id(), second_id);
        assert_eq!(reused_second.get().map(String::as_str), Some("second"));

        pool.release(reused_third);
        pool.release(reused_second);
    }

    #[test]
    #[should_panic]
    fn release_to_different_pool_panics() {
        let pool1 = ObjectPool::<u32>::default();
        let pool2 = ObjectPool::<u32>::default();

        let slot = pool1.fetch();
        pool2.release(slot);
    }

    #[test]
    fn clones_share_slots() {
        let pool = ObjectPool::<u32>::new(2, 2);
        let clone = pool.clone();

        let slot = pool.fetch();
        assert_eq!(clone.available(), 1);

        clone.release(slot);
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn payload_is_dropped_with_pool() {
        let value = Rc::new(());

        {
            let pool = ObjectPool::<Option<Rc<()>>>::new(1, 1);
            let mut slot = pool.fetch();
            *slot.value_mut() = Some(Rc::clone(&value));
            pool.release(slot);

            assert_eq!(Rc::strong_count(&value), 2);
        }

        assert_eq!(Rc::strong_count(&value), 1);
    }
}
