use thiserror::Error;

/// Errors that can occur when building an [`ObjectPool`][crate::ObjectPool].
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum BuildError {
    /// The pool would start out larger than it is ever allowed to grow.
    #[error("initial pool size {initial_size} exceeds the maximum pool size {max_size}")]
    InitialSizeExceedsMaximum {
        /// The initial size requested by the caller.
        initial_size: usize,

        /// The maximum size requested by the caller (or the default, if none was requested).
        max_size: usize,
    },
}
