#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A thread-safe object pool with a bounded, array-backed free list.
//!
//! This crate provides [`ObjectPool<T>`], a pool of reusable value slots, and [`PoolRef<T>`], a
//! handle that borrows one slot at a time and returns it to the pool when dropped.
//!
//! # Key Features
//!
//! - **Array-backed free list**: Vacant slots are chained through the slot array by index,
//!   keeping bookkeeping contiguous and slot identities stable across growth
//! - **Lazy construction**: Payloads are constructed via [`Default`] on first access, not when
//!   the slot is created, and are kept with the slot for reuse
//! - **Bounded growth**: The pool doubles in size when it runs out of vacant slots, up to a hard
//!   ceiling, after which growth is disabled permanently
//! - **Graceful degradation**: At the ceiling, fetches are served by transient fallback slots
//!   that are dropped when returned - running out of capacity is never an error
//! - **LIFO reuse**: The most recently returned slot is the next one fetched
//! - **Single lock**: Fetch and return are serialized by one short critical section; payloads
//!   are used without holding the lock
//! - **Release on drop**: [`PoolRef<T>`] returns its slot on every exit path
//!
//! # Handle Types
//!
//! ## [`PoolRef<T>`] - Managed handle
//!
//! Starts unbound, binds to a slot on [`fetch_from_pool()`](PoolRef::fetch_from_pool) and
//! releases it on [`return_to_pool()`](PoolRef::return_to_pool) or when dropped. This is the
//! recommended way to use the pool.
//!
//! ## [`SlotRef<T>`] - Raw slot
//!
//! Returned by [`ObjectPool::fetch()`] and returned via [`ObjectPool::release()`]. It cannot be
//! copied, so it cannot be returned twice, but dropping it without releasing it loses the slot.
//!
//! # Examples
//!
//! ```rust
//! use slot_pool::{ObjectPool, PoolRef};
//!
//! // Two slots initially, growing up to four pool-owned slots.
//! let pool = ObjectPool::<Vec<u8>>::new(2, 4);
//!
//! let mut buffer = PoolRef::new(&pool);
//! buffer.fetch_from_pool().extend_from_slice(b"payload");
//! assert_eq!(pool.available(), 1);
//!
//! buffer.return_to_pool();
//! assert_eq!(pool.available(), 2);
//! ```
//!
//! ## Running out of capacity
//!
//! ```rust
//! use slot_pool::ObjectPool;
//!
//! let pool = ObjectPool::<u64>::new(1, 2);
//!
//! let a = pool.fetch();
//! let b = pool.fetch(); // Expands to the maximum size of 2.
//! let c = pool.fetch(); // Fallback slot, not part of the pool.
//!
//! assert!(a.owned_by_pool() && b.owned_by_pool());
//! assert!(!c.owned_by_pool());
//! assert_eq!(pool.size(), 2);
//!
//! pool.release(c); // Dropped, not linked into the free chain.
//! pool.release(b);
//! pool.release(a);
//! assert_eq!(pool.available(), 2);
//! ```

mod builder;
mod error;
mod free_list;
mod pool;
mod pool_ref;
mod slot;

pub use builder::*;
pub use error::*;
pub(crate) use free_list::*;
pub use pool::ObjectPool;
pub use pool_ref::PoolRef;
pub use slot::{SlotId, SlotRef};
