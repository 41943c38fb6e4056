use std::cell::Cell;
use std::marker::PhantomData;

use crate::{BuildError, ObjectPool};

/// The initial number of slots used when the caller does not specify one.
pub const DEFAULT_INITIAL_SIZE: usize = 5;

/// The maximum number of pool-owned slots used when the caller does not specify one.
pub const DEFAULT_MAX_SIZE: usize = 10;

/// Builder for creating an instance of [`ObjectPool`].
///
/// Both sizes are optional. A size of zero (or not setting a size at all) selects the default:
/// [`DEFAULT_INITIAL_SIZE`] slots initially, growing up to [`DEFAULT_MAX_SIZE`] slots.
///
/// If only the maximum size is set and it is below the default initial size, the pool starts
/// out at its maximum size.
///
/// # Examples
///
/// ```
/// use slot_pool::ObjectPool;
///
/// let pool = ObjectPool::<String>::builder()
///     .initial_size(2)
///     .max_size(16)
///     .build()?;
///
/// assert_eq!(pool.size(), 2);
/// assert_eq!(pool.max_size(), 16);
/// # Ok::<(), slot_pool::BuildError>(())
/// ```
///
/// # Thread safety
///
/// The builder is thread-mobile ([`Send`]) and can be safely transferred between threads,
/// allowing pool configuration to happen on different threads than where the pool is used.
/// However, it is not thread-safe ([`Sync`]) as it contains mutable configuration state.
#[derive(Debug)]
#[must_use]
pub struct ObjectPoolBuilder<T> {
    initial_size: usize,
    max_size: usize,

    _item: PhantomData<fn() -> T>,

    // Prevents Sync while allowing Send - builders are thread-mobile but not thread-safe
    _not_sync: PhantomData<Cell<()>>,
}

impl<T> ObjectPoolBuilder<T> {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            initial_size: 0,
            max_size: 0,
            _item: PhantomData,
            _not_sync: PhantomData,
        }
    }

    /// Sets the number of slots the pool starts with. Zero selects the default.
    #[inline]
    pub fn initial_size(mut self, initial_size: usize) -> Self {
        self.initial_size = initial_size;
        self
    }

    /// Sets the number of pool-owned slots the pool may grow to. Zero selects the default.
    ///
    /// Once the pool has grown to this size, any further fetches while all slots are in use
    /// are served by fallback slots that are not part of the pool.
    #[inline]
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Builds the pool with the specified configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InitialSizeExceedsMaximum`] if an explicitly set initial size
    /// exceeds the maximum size.
    pub fn build(self) -> Result<ObjectPool<T>, BuildError> {
        let (initial_size, max_size) = self.resolve_sizes()?;

        Ok(ObjectPool::new_inner(initial_size, max_size))
    }

    fn resolve_sizes(&self) -> Result<(usize, usize), BuildError> {
        let max_size = if self.max_size == 0 {
            DEFAULT_MAX_SIZE
        } else {
            self.max_size
        };

        let initial_size = if self.initial_size == 0 {
            DEFAULT_INITIAL_SIZE.min(max_size)
        } else {
            self.initial_size
        };

        if initial_size > max_size {
            return Err(BuildError::InitialSizeExceedsMaximum {
                initial_size,
                max_size,
            });
        }

        Ok((initial_size, max_size))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::thread;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(ObjectPoolBuilder<String>: Send, std::fmt::Debug);
    assert_not_impl_any!(ObjectPoolBuilder<String>: Sync);

    #[test]
    fn defaults_apply_when_nothing_set() {
        let builder = ObjectPoolBuilder::<u32>::new();

        assert_eq!(
            builder.resolve_sizes(),
            Ok((DEFAULT_INITIAL_SIZE, DEFAULT_MAX_SIZE))
        );
    }

    #[test]
    fn zero_selects_defaults() {
        let builder = ObjectPoolBuilder::<u32>::new().initial_size(0).max_size(0);

        assert_eq!(builder.resolve_sizes(), Ok((5, 10)));
    }

    #[test]
    fn explicit_sizes_are_kept() {
        let builder = ObjectPoolBuilder::<u32>::new().initial_size(3).max_size(7);

        assert_eq!(builder.resolve_sizes(), Ok((3, 7)));
    }

    #[test]
    fn default_initial_size_is_clamped_to_small_max() {
        let builder = ObjectPoolBuilder::<u32>::new().max_size(2);

        assert_eq!(builder.resolve_sizes(), Ok((2, 2)));
    }

    #[test]
    fn explicit_initial_size_above_default_max_is_error() {
        let result = ObjectPoolBuilder::<u32>::new().initial_size(11).build();

        assert_eq!(
            result.err(),
            Some(BuildError::InitialSizeExceedsMaximum {
                initial_size: 11,
                max_size: DEFAULT_MAX_SIZE,
            })
        );
    }

    #[test]
    fn explicit_initial_size_above_explicit_max_is_error() {
        let result = ObjectPoolBuilder::<u32>::new()
            .initial_size(4)
            .max_size(3)
            .build();

        assert!(matches!(
            result,
            Err(BuildError::InitialSizeExceedsMaximum {
                initial_size: 4,
                max_size: 3,
            })
        ));
    }

    #[test]
    fn later_settings_override_earlier_ones() {
        let builder = ObjectPoolBuilder::<u32>::new()
            .initial_size(1)
            .initial_size(2)
            .max_size(20)
            .max_size(4);

        assert_eq!(builder.resolve_sizes(), Ok((2, 4)));
    }

    #[test]
    fn build_creates_pool_with_resolved_sizes() {
        let pool = ObjectPoolBuilder::<u32>::new()
            .initial_size(2)
            .max_size(6)
            .build()
            .expect("sizes are valid");

        assert_eq!(pool.size(), 2);
        assert_eq!(pool.max_size(), 6);
        assert!(pool.can_expand());
    }

    #[test]
    fn builder_can_move_between_threads() {
        let builder = ObjectPoolBuilder::<u64>::new().max_size(3);

        let handle = thread::spawn(move || builder.build());
        let pool = handle
            .join()
            .expect("thread completed successfully")
            .expect("sizes are valid");

        assert_eq!(pool.max_size(), 3);
    }
}
