use std::{fmt, mem};
use std::sync::Arc;
use std::sync::atomic::{self, AtomicU64};

use tracing::trace;

/// A shared, type-erased event handler.
pub(crate) type Handler<A> = Arc<dyn Fn(&A) + Send + Sync>;

// Handler ids are unique across all hubs in the process, so an id from one hub can never
// accidentally match a handler in another.
static HANDLER_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Identifies one registered handler, for later use with
/// [`EventHub::unregister()`][crate::EventHub::unregister].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct HandlerId(u64);

impl HandlerId {
    pub(crate) fn next() -> Self {
        Self(HANDLER_ID_COUNTER.fetch_add(1, atomic::Ordering::Relaxed))
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // No API contract to test.
impl fmt::Display for HandlerId {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler #{}", self.0)
    }
}

/// A change requested while the list was being broadcast to.
enum Change<A> {
    Add(HandlerId, Handler<A>),
    Remove(HandlerId),
    Clear,
}

/// The handlers registered for one key.
///
/// While at least one broadcast is in flight, the handler sequence is frozen and changes are
/// queued. The queue is applied in request order once the last broadcast completes.
pub(crate) struct HandlerList<A> {
    handlers: Vec<(HandlerId, Handler<A>)>,

    pending: Vec<Change<A>>,

    // Number of broadcasts currently invoking a snapshot of `handlers`.
    in_flight: usize,
}

impl<A> HandlerList<A> {
    pub(crate) fn new() -> Self {
        Self {
            handlers: Vec::new(),
            pending: Vec::new(),
            in_flight: 0,
        }
    }

    /// Number of active handlers. Queued changes are not counted until applied.
    pub(crate) fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the list can be discarded without losing anything.
    pub(crate) fn is_disposable(&self) -> bool {
        self.handlers.is_empty() && self.pending.is_empty() && self.in_flight == 0
    }

    pub(crate) fn is_broadcasting(&self) -> bool {
        self.in_flight > 0
    }

    pub(crate) fn add(&mut self, id: HandlerId, handler: Handler<A>) {
        if self.is_broadcasting() {
            trace!(%id, "deferring handler registration until broadcast completes");
            self.pending.push(Change::Add(id, handler));
        } else {
            self.handlers.push((id, handler));
        }
    }

    /// Removes a handler, returning whether it is (or will be, once the in-flight broadcast
    /// completes) removed.
    pub(crate) fn remove(&mut self, id: HandlerId) -> bool {
        if !self.is_broadcasting() {
            let Some(position) = self.handlers.iter().position(|(existing, _)| *existing == id)
            else {
                return false;
            };

            self.handlers.remove(position);
            return true;
        }

        if !self.will_contain(id) {
            return false;
        }

        trace!(%id, "deferring handler removal until broadcast completes");
        self.pending.push(Change::Remove(id));
        true
    }

    pub(crate) fn clear(&mut self) {
        if self.is_broadcasting() {
            trace!("deferring removal of all handlers until broadcast completes");
            self.pending.push(Change::Clear);
        } else {
            self.handlers.clear();
        }
    }

    /// Marks the start of a broadcast and returns the handlers to invoke.
    pub(crate) fn begin_broadcast(&mut self) -> Vec<Handler<A>> {
        self.in_flight = self
            .in_flight
            .checked_add(1)
            .expect("nesting depth of broadcasts cannot exceed usize::MAX");

        self.handlers
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect()
    }

    /// Marks the end of a broadcast. The last broadcast to end applies the queued changes.
    pub(crate) fn end_broadcast(&mut self) {
        self.in_flight = self
            .in_flight
            .checked_sub(1)
            .expect("every broadcast end is paired with a broadcast start");

        if self.in_flight == 0 && !self.pending.is_empty() {
            self.apply_pending();
        }
    }

    fn apply_pending(&mut self) {
        trace!(
            changes = self.pending.len(),
            "applying handler changes deferred during broadcast"
        );

        for change in mem::take(&mut self.pending) {
            match change {
                Change::Add(id, handler) => self.handlers.push((id, handler)),
                Change::Remove(id) => self.handlers.retain(|(existing, _)| *existing != id),
                Change::Clear => self.handlers.clear(),
            }
        }
    }

    // Replays the pending queue over the current ids to see whether `id` survives it.
    fn will_contain(&self, id: HandlerId) -> bool {
        let mut present = self.handlers.iter().any(|(existing, _)| *existing == id);

        for change in &self.pending {
            match change {
                Change::Add(added, _) if *added == id => present = true,
                Change::Remove(removed) if *removed == id => present = false,
                Change::Clear => present = false,
                _ => {}
            }
        }

        present
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // No API contract to test.
impl<A> fmt::Debug for HandlerList<A> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerList")
            .field(
                "handlers",
                &self.handlers.iter().map(|(id, _)| id).collect::<Vec<_>>(),
            )
            .field("pending", &self.pending.len())
            .field("in_flight", &self.in_flight)
            .finish()
    }
}
