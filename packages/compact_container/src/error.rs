use std::collections::TryReserveError;

use thiserror::Error;

/// Errors that can occur when a compact container needs more slots.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The memory allocator could not provide storage for the grown slot array.
    #[error("failed to allocate storage for {requested_capacity} slots")]
    AllocationFailed {
        /// The capacity the container attempted to grow to.
        requested_capacity: usize,

        /// The error reported by the allocator.
        #[source]
        source: TryReserveError,
    },

    /// Every index the index type can represent is already in use as a slot.
    #[error("index space exhausted: the index type can address at most {max_capacity} slots")]
    IndexSpaceExhausted {
        /// The maximum number of slots the container's index type can address.
        max_capacity: usize,
    },
}

/// A specialized `Result` type for compact container operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
