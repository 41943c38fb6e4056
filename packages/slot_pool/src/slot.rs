use std::any::type_name;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for numbering fallback slots, so that every fallback slot has an identity
/// distinct from every other slot ever handed out.
static FALLBACK_SERIAL_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifies the storage slot behind a fetched value.
///
/// Pool-owned slots are identified by their position in the pool's slot array. This position
/// never changes, even when the pool expands, so the same `SlotId` is observed again whenever
/// the same slot is fetched again.
///
/// Fallback slots (manufactured when the pool has reached its maximum size and has no free
/// slots left) each receive a unique serial number and are never reissued.
///
/// # Example
///
/// ```rust
/// use slot_pool::ObjectPool;
///
/// let pool = ObjectPool::<String>::new(2, 2);
///
/// let first = pool.fetch();
/// let first_id = first.id();
/// assert!(first_id.owned_by_pool());
/// assert_eq!(first_id.index(), Some(0));
///
/// pool.release(first);
///
/// // The most recently returned slot is the next one fetched.
/// let again = pool.fetch();
/// assert_eq!(again.id(), first_id);
/// # pool.release(again);
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SlotId {
    kind: SlotKind,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
enum SlotKind {
    Pooled { index: usize },
    Fallback { serial: u64 },
}

impl SlotId {
    pub(crate) fn pooled(index: usize) -> Self {
        Self {
            kind: SlotKind::Pooled { index },
        }
    }

    pub(crate) fn next_fallback() -> Self {
        Self {
            kind: SlotKind::Fallback {
                serial: FALLBACK_SERIAL_COUNTER.fetch_add(1, Ordering::Relaxed),
            },
        }
    }

    /// Whether the slot belongs to the pool's slot array.
    ///
    /// Slots that are not owned by the pool are fallback slots. They are dropped when returned
    /// instead of being linked back into the free chain.
    #[must_use]
    #[inline]
    pub fn owned_by_pool(&self) -> bool {
        matches!(self.kind, SlotKind::Pooled { .. })
    }

    /// The position of the slot in the pool's slot array, or `None` for a fallback slot.
    #[must_use]
    #[inline]
    pub fn index(&self) -> Option<usize> {
        match self.kind {
            SlotKind::Pooled { index } => Some(index),
            SlotKind::Fallback { .. } => None,
        }
    }
}

impl fmt::Display for SlotId {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SlotKind::Pooled { index } => write!(f, "slot #{index}"),
            SlotKind::Fallback { serial } => write!(f, "fallback slot #{serial}"),
        }
    }
}

/// A slot fetched from an [`ObjectPool`], carrying the slot's payload while it is borrowed.
///
/// The payload is moved out of the pool's slot array when the slot is fetched and moved back
/// when the slot is returned via [`ObjectPool::release()`], so the pool lock is never needed to
/// access the payload.
///
/// The payload is constructed lazily via [`Default`] the first time it is accessed through
/// [`value_mut()`][Self::value_mut]. Once constructed, it stays with the slot across fetches -
/// the pool does not reset payloads when they are returned.
///
/// A `SlotRef` cannot be copied or cloned, so the same slot cannot be returned twice. Dropping a
/// `SlotRef` without returning it permanently removes the slot from the free chain. Use
/// [`PoolRef`] for a handle that returns its slot automatically.
///
/// [`ObjectPool`]: crate::ObjectPool
/// [`ObjectPool::release()`]: crate::ObjectPool::release
/// [`PoolRef`]: crate::PoolRef
#[must_use = "dropping a SlotRef without releasing it permanently removes the slot from the pool"]
pub struct SlotRef<T> {
    /// Ensures this slot can only be returned to the pool it came from.
    pub(crate) pool_id: u64,

    id: SlotId,

    value: Option<T>,
}

impl<T> SlotRef<T> {
    pub(crate) fn new(pool_id: u64, id: SlotId, value: Option<T>) -> Self {
        Self { pool_id, id, value }
    }

    /// The identity of the slot.
    #[must_use]
    #[inline]
    pub fn id(&self) -> SlotId {
        self.id
    }

    /// Whether the slot belongs to the pool's slot array (as opposed to being a fallback slot).
    #[must_use]
    #[inline]
    pub fn owned_by_pool(&self) -> bool {
        self.id.owned_by_pool()
    }

    /// Whether the payload has already been constructed, either during this borrow or during
    /// an earlier borrow of the same slot.
    #[must_use]
    #[inline]
    pub fn is_constructed(&self) -> bool {
        self.value.is_some()
    }

    /// The payload, if it has already been constructed.
    ///
    /// This never constructs the payload. Use [`value_mut()`][Self::value_mut] for that.
    #[must_use]
    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub(crate) fn into_parts(self) -> (SlotId, Option<T>) {
        (self.id, self.value)
    }
}

impl<T: Default> SlotRef<T> {
    /// The payload, constructing it via [`Default`] if this is the slot's first use.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_pool::ObjectPool;
    ///
    /// let pool = ObjectPool::<Vec<u8>>::default();
    ///
    /// let mut slot = pool.fetch();
    /// assert!(!slot.is_constructed());
    ///
    /// slot.value_mut().push(7);
    /// assert!(slot.is_constructed());
    /// assert_eq!(slot.get(), Some(&vec![7]));
    /// # pool.release(slot);
    /// ```
    #[inline]
    pub fn value_mut(&mut self) -> &mut T {
        self.value.get_or_insert_with(T::default)
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // No API contract to test.
impl<T> fmt::Debug for SlotRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("pool_id", &self.pool_id)
            .field("id", &self.id)
            .field("constructed", &self.value.is_some())
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::collections::HashSet;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(SlotId: Send, Sync, Copy, fmt::Debug, fmt::Display);
    assert_impl_all!(SlotRef<String>: Send, Sync, fmt::Debug);
    assert_not_impl_any!(SlotRef<String>: Clone);
    assert_not_impl_any!(SlotRef<std::rc::Rc<u8>>: Send);

    #[test]
    fn pooled_id_reports_index() {
        let id = SlotId::pooled(3);

        assert!(id.owned_by_pool());
        assert_eq!(id.index(), Some(3));
        assert_eq!(id.to_string(), "slot #3");
    }

    #[test]
    fn fallback_ids_are_never_repeated() {
        let ids: HashSet<SlotId> = (0..100).map(|_| SlotId::next_fallback()).collect();

        assert_eq!(ids.len(), 100);
        assert!(ids.iter().all(|id| !id.owned_by_pool()));
        assert!(ids.iter().all(|id| id.index().is_none()));
    }

    #[test]
    fn value_is_constructed_on_first_access() {
        let mut slot = SlotRef::<String>::new(1, SlotId::pooled(0), None);
        assert!(!slot.is_constructed());
        assert!(slot.get().is_none());

        slot.value_mut().push_str("hello");

        assert!(slot.is_constructed());
        assert_eq!(slot.get().map(String::as_str), Some("hello"));
    }

    #[test]
    fn existing_value_is_not_replaced() {
        let mut slot = SlotRef::new(1, SlotId::pooled(0), Some(42_u32));

        assert_eq!(*slot.value_mut(), 42);

        let (id, value) = slot.into_parts();
        assert_eq!(id, SlotId::pooled(0));
        assert_eq!(value, Some(42));
    }
}
