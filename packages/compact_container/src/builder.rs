use std::marker::PhantomData;
use std::sync::Arc;

use crate::{CompactContainer, DoublingGrowth, GrowthPolicy, IndexType};

/// Builder for creating an instance of [`CompactContainer`].
///
/// You only need to use this builder if you want to customize the container configuration.
/// The default configuration used by [`CompactContainer::new()`][1] grows by doubling, starting
/// from a block of 16 slots.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use compact_container::{CompactContainer, ConstantGrowth};
///
/// let container = CompactContainer::<u32, u32>::builder()
///     .growth_policy(ConstantGrowth::new(NonZero::new(1024).unwrap()))
///     .build();
/// ```
///
/// [1]: CompactContainer::new
#[must_use]
pub struct CompactContainerBuilder<T, I: IndexType = usize> {
    growth_policy: Arc<dyn GrowthPolicy>,

    _item: PhantomData<(T, I)>,
}

impl<T, I: IndexType> std::fmt::Debug for CompactContainerBuilder<T, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompactContainerBuilder")
            .field(
                "item_type",
                &std::format_args!("{}", std::any::type_name::<T>()),
            )
            .field(
                "index_type",
                &std::format_args!("{}", std::any::type_name::<I>()),
            )
            .field("growth_policy", &self.growth_policy)
            .finish()
    }
}

impl<T, I: IndexType> CompactContainerBuilder<T, I> {
    pub(crate) fn new() -> Self {
        Self {
            growth_policy: Arc::new(DoublingGrowth::default()),
            _item: PhantomData,
        }
    }

    /// Sets the [growth policy][GrowthPolicy] of the container. This governs how many slots are
    /// added each time the container runs out of vacant slots.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::num::NonZero;
    ///
    /// use compact_container::{AdditiveGrowth, CompactContainer};
    ///
    /// let mut container = CompactContainer::<u32>::builder()
    ///     .growth_policy(AdditiveGrowth::new(NonZero::new(4).unwrap(), 4))
    ///     .build();
    ///
    /// _ = container.insert(1);
    /// assert_eq!(container.capacity(), 4);
    /// ```
    pub fn growth_policy(mut self, policy: impl GrowthPolicy + 'static) -> Self {
        self.growth_policy = Arc::new(policy);
        self
    }

    /// Builds the container with the specified configuration.
    ///
    /// The container starts with zero capacity; no memory is allocated until the first insert.
    ///
    /// # Examples
    ///
    /// ```
    /// use compact_container::CompactContainer;
    ///
    /// let container = CompactContainer::<u32>::builder().build();
    /// assert_eq!(container.capacity(), 0);
    /// ```
    #[must_use]
    pub fn build(self) -> CompactContainer<T, I> {
        CompactContainer::new_inner(self.growth_policy)
    }
}
