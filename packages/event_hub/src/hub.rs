use std::any::type_name;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use foldhash::{HashMap, HashMapExt};
use parking_lot::Mutex;
use tracing::trace;

use crate::{HandlerId, HandlerList};

/// A thread-safe registry of event handlers, keyed by event kind.
///
/// Each key has an ordered list of handlers that receive a shared reference to the event
/// arguments of type `A`. Events with several arguments use a tuple for `A`.
///
/// # Re-entrancy
///
/// The hub lock is not held while handlers run. A handler may register or unregister handlers
/// and broadcast further events, including to its own key. Changes to a key made while that
/// key is being broadcast to do not affect the broadcasts already in flight. They are applied,
/// in the order they were requested, when the outermost broadcast of that key completes.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
///
/// use event_hub::EventHub;
///
/// #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
/// enum Event {
///     Damage,
///     Heal,
/// }
///
/// let hub = EventHub::<Event, u32>::new();
/// let health = Arc::new(AtomicU32::new(100));
///
/// let target = Arc::clone(&health);
/// hub.register(Event::Damage, move |amount| {
///     target.fetch_sub(*amount, Ordering::Relaxed);
/// });
///
/// assert_eq!(hub.broadcast(&Event::Damage, &30), 1);
/// assert_eq!(hub.broadcast(&Event::Heal, &10), 0);
/// assert_eq!(health.load(Ordering::Relaxed), 70);
/// ```
///
/// # Thread safety
///
/// The hub is thread-safe (`Send` and `Sync`). Clones are handles to the same registry.
pub struct EventHub<K, A> {
    inner: Arc<Mutex<HashMap<K, HandlerList<A>>>>,
}

impl<K, A> EventHub<K, A>
where
    K: Eq + Hash,
{
    /// Creates a hub without any handlers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Registers a handler for events of the given key.
    ///
    /// Handlers of a key are invoked in registration order. If the key is being broadcast to
    /// right now, the handler only takes part in broadcasts that start after the in-flight
    /// ones have completed.
    pub fn register<F>(&self, key: K, handler: F) -> HandlerId
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        let id = HandlerId::next();

        self.inner
            .lock()
            .entry(key)
            .or_insert_with(HandlerList::new)
            .add(id, Arc::new(handler));

        id
    }

    /// Unregisters one handler of the given key.
    ///
    /// Returns whether a handler was removed. While the key is being broadcast to, the removal
    /// is deferred and the return value tells whether the handler will be removed once the
    /// in-flight broadcasts have completed.
    pub fn unregister(&self, key: &K, id: HandlerId) -> bool {
        let mut map = self.inner.lock();

        let Some(list) = map.get_mut(key) else {
            return false;
        };

        let removed = list.remove(id);

        if list.is_disposable() {
            map.remove(key);
        }

        removed
    }

    /// Unregisters every handler of the given key.
    ///
    /// While the key is being broadcast to, the removal is deferred until the in-flight
    /// broadcasts have completed. Handlers registered after this call are kept.
    pub fn unregister_all(&self, key: &K) {
        let mut map = self.inner.lock();

        let Some(list) = map.get_mut(key) else {
            return;
        };

        if list.is_broadcasting() {
            list.clear();
        } else {
            map.remove(key);
        }
    }

    /// Invokes every handler of the given key with `args`, in registration order.
    ///
    /// Returns the number of handlers invoked, which is zero if the key has no handlers.
    ///
    /// # Panics
    ///
    /// A panic in a handler propagates to the caller after the hub has applied any deferred
    /// changes. The handlers after the panicking one are not invoked.
    pub fn broadcast(&self, key: &K, args: &A) -> usize {
        let handlers = {
            let mut map = self.inner.lock();

            let Some(list) = map.get_mut(key) else {
                return 0;
            };

            list.begin_broadcast()
        };

        trace!(
            handlers = handlers.len(),
            args = type_name::<A>(),
            "broadcasting event"
        );

        let _in_flight = BroadcastGuard { hub: self, key };

        for handler in &handlers {
            handler(args);
        }

        handlers.len()
    }

    /// Number of handlers currently registered for the given key.
    ///
    /// Registrations and removals that are deferred until an in-flight broadcast completes are
    /// not yet counted.
    #[must_use]
    pub fn handler_count(&self, key: &K) -> usize {
        self.inner.lock().get(key).map_or(0, HandlerList::len)
    }

    /// Whether no key has any handlers registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().values().all(|list| list.len() == 0)
    }

    fn end_broadcast(&self, key: &K) {
        let mut map = self.inner.lock();

        let list = map
            .get_mut(key)
            .expect("a key cannot be removed from the hub while it is being broadcast to");

        list.end_broadcast();

        if list.is_disposable() {
            map.remove(key);
        }
    }
}

impl<K, A> Clone for EventHub<K, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, A> Default for EventHub<K, A>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // No API contract to test.
impl<K, A> fmt::Debug for EventHub<K, A>
where
    K: fmt::Debug,
{
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("handlers", &*self.inner.lock())
            .finish()
    }
}

/// Ends a broadcast when dropped, so that deferred changes are applied even if a handler
/// panics.
struct BroadcastGuard<'a, K, A>
where
    K: Eq + Hash,
{
    hub: &'a EventHub<K, A>,
    key: &'a K,
}

impl<K, A> Drop for BroadcastGuard<'_, K, A>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        self.hub.end_broadcast(self.key);
    }
}
