use std::fmt;
use std::num::NonZero;

use new_zealand::nz;

/// Decides how many slots a [`CompactContainer`][crate::CompactContainer] adds each time it
/// runs out of vacant slots.
///
/// The container asks for [`first_block_size()`][Self::first_block_size] when it is created or
/// cleared, then calls [`next_block_size()`][Self::next_block_size] after every growth event to
/// size the block that will be added the next time.
///
/// # Example
///
/// ```rust
/// use std::num::NonZero;
///
/// use compact_container::{CompactContainer, GrowthPolicy};
///
/// /// Grows by half of the current capacity each time.
/// #[derive(Debug)]
/// struct GrowByHalf;
///
/// impl GrowthPolicy for GrowByHalf {
///     fn first_block_size(&self) -> NonZero<usize> {
///         NonZero::new(8).unwrap()
///     }
///
///     fn next_block_size(&self, capacity: usize, current: NonZero<usize>) -> NonZero<usize> {
///         NonZero::new(capacity / 2).unwrap_or(current)
///     }
/// }
///
/// let mut container = CompactContainer::<u64>::builder()
///     .growth_policy(GrowByHalf)
///     .build();
///
/// _ = container.insert(1);
/// assert_eq!(container.capacity(), 8);
/// ```
pub trait GrowthPolicy: fmt::Debug + Send + Sync {
    /// The number of slots in the first block of an empty container.
    fn first_block_size(&self) -> NonZero<usize>;

    /// The number of slots to add on the next growth, given the capacity just reached and the
    /// size of the block that was just added.
    fn next_block_size(&self, capacity: usize, current: NonZero<usize>) -> NonZero<usize>;
}

/// Doubles the capacity on every growth after the first block.
///
/// This is the default policy, starting from a first block of 16 slots.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DoublingGrowth {
    first_block_size: NonZero<usize>,
}

impl DoublingGrowth {
    /// Creates a policy whose first block has `first_block_size` slots.
    #[must_use]
    pub const fn new(first_block_size: NonZero<usize>) -> Self {
        Self { first_block_size }
    }
}

impl Default for DoublingGrowth {
    fn default() -> Self {
        Self::new(nz!(16))
    }
}

impl GrowthPolicy for DoublingGrowth {
    fn first_block_size(&self) -> NonZero<usize> {
        self.first_block_size
    }

    fn next_block_size(&self, capacity: usize, current: NonZero<usize>) -> NonZero<usize> {
        NonZero::new(capacity).unwrap_or(current)
    }
}

/// Adds blocks of the same size on every growth.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConstantGrowth {
    block_size: NonZero<usize>,
}

impl ConstantGrowth {
    /// Creates a policy that always adds `block_size` slots.
    #[must_use]
    pub const fn new(block_size: NonZero<usize>) -> Self {
        Self { block_size }
    }
}

impl GrowthPolicy for ConstantGrowth {
    fn first_block_size(&self) -> NonZero<usize> {
        self.block_size
    }

    fn next_block_size(&self, _capacity: usize, _current: NonZero<usize>) -> NonZero<usize> {
        self.block_size
    }
}

/// Starts from a first block and makes every following block larger by a fixed increment.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AdditiveGrowth {
    first_block_size: NonZero<usize>,
    increment: usize,
}

impl AdditiveGrowth {
    /// Creates a policy whose first block has `first_block_size` slots, with each following
    /// block having `increment` more slots than the previous one.
    #[must_use]
    pub const fn new(first_block_size: NonZero<usize>, increment: usize) -> Self {
        Self {
            first_block_size,
            increment,
        }
    }
}

impl GrowthPolicy for AdditiveGrowth {
    fn first_block_size(&self) -> NonZero<usize> {
        self.first_block_size
    }

    fn next_block_size(&self, _capacity: usize, current: NonZero<usize>) -> NonZero<usize> {
        current.saturating_add(self.increment)
    }
}
