use std::fmt;
use std::hash::Hash;

mod private {
    pub trait Sealed {}
}

/// An unsigned integer type that can serve as the width of an [`Index`].
///
/// Narrower index types make stored cross-references smaller at the cost of a smaller
/// addressable index space. Half of the range is reserved: the most significant bit is never
/// set in a valid index, and [`IndexType::BOTTOM`] is the distinguished "no slot" value.
///
/// This trait is sealed and implemented for `u16`, `u32`, `usize` and (on 64-bit targets) `u64`.
pub trait IndexType:
    Copy + Eq + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static + private::Sealed
{
    /// The reserved value that terminates the free list and marks an invalid handle.
    ///
    /// This is the maximum value of the type with the most significant bit cleared.
    const BOTTOM: Self;

    /// Widens the value to `usize`.
    fn to_usize(self) -> usize;

    /// Narrows a `usize` to this type, returning `None` if it does not fit.
    fn from_usize(value: usize) -> Option<Self>;
}

macro_rules! impl_index_type {
    ($($t:ty),*) => {$(
        impl private::Sealed for $t {}

        impl IndexType for $t {
            const BOTTOM: Self = <$t>::MAX >> 1;

            #[inline]
            fn to_usize(self) -> usize {
                usize::try_from(self).expect("index types are never wider than usize")
            }

            #[inline]
            fn from_usize(value: usize) -> Option<Self> {
                Self::try_from(value).ok()
            }
        }
    )*};
}

impl_index_type!(u16, u32, usize);

#[cfg(target_pointer_width = "64")]
impl_index_type!(u64);

/// A lightweight handle identifying one slot of a
/// [`CompactContainer`][crate::CompactContainer].
///
/// Indices are returned by the insertion methods and stay valid for as long as the element they
/// identify stays in the container, including across capacity growth. After the element is
/// erased, the index may be handed out again for a newly inserted element.
///
/// The default value is [`Index::BOTTOM`], the "null handle". It is never returned by an
/// insertion method.
///
/// # Example
///
/// ```rust
/// use compact_container::{CompactContainer, Index};
///
/// let mut container = CompactContainer::<&str>::new();
///
/// let index = container.insert("vertex");
/// assert!(index.is_valid());
/// assert_eq!(usize::from(index), 0);
///
/// let null = Index::<usize>::default();
/// assert!(!null.is_valid());
/// ```
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Index<I: IndexType = usize> {
    raw: I,
}

impl<I: IndexType> Index<I> {
    /// The "null handle" that never refers to a slot.
    pub const BOTTOM: Self = Self { raw: I::BOTTOM };

    /// Creates an index from its raw integer value.
    ///
    /// No check is made that the value refers to an occupied slot of any container.
    #[must_use]
    pub const fn new(raw: I) -> Self {
        Self { raw }
    }

    /// Creates an index from a `usize`, returning `None` if the value does not fit `I`.
    #[must_use]
    pub fn from_usize(value: usize) -> Option<Self> {
        I::from_usize(value).map(Self::new)
    }

    /// Index of a slot position that is known to fit because it is at most the capacity.
    pub(crate) fn from_position(position: usize) -> Self {
        Self::from_usize(position)
            .expect("slot positions never exceed the capacity, which is capped at bottom")
    }

    /// The raw integer value of the index.
    #[must_use]
    pub fn get(self) -> I {
        self.raw
    }

    /// Whether this is anything other than [`Index::BOTTOM`].
    ///
    /// A valid index is not necessarily associated with an element: the element may have been
    /// erased. Ask the container via [`is_used()`][crate::CompactContainer::is_used] for that.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.raw != I::BOTTOM
    }

    /// Moves to the next raw index value.
    ///
    /// There is no guarantee that the resulting index refers to an occupied slot.
    ///
    /// # Panics
    ///
    /// Panics if the value would overflow `I`.
    pub fn increment(&mut self) {
        self.raw = self
            .raw
            .to_usize()
            .checked_add(1)
            .and_then(I::from_usize)
            .expect("incremented an index past the maximum of its index type");
    }

    /// Moves to the previous raw index value.
    ///
    /// There is no guarantee that the resulting index refers to an occupied slot.
    ///
    /// # Panics
    ///
    /// Panics if the index is zero.
    pub fn decrement(&mut self) {
        self.raw = self
            .raw
            .to_usize()
            .checked_sub(1)
            .and_then(I::from_usize)
            .expect("decremented an index below zero");
    }

    /// Converts the index to another index width, for interop between containers.
    ///
    /// [`Index::BOTTOM`] maps to the bottom of the target width. Returns `None` if a valid index
    /// does not fit the valid range of the target width.
    ///
    /// # Example
    ///
    /// ```rust
    /// use compact_container::Index;
    ///
    /// let wide = Index::<usize>::new(42);
    /// let narrow = wide.try_cast::<u16>().unwrap();
    /// assert_eq!(narrow.get(), 42_u16);
    ///
    /// assert!(!Index::<usize>::BOTTOM.try_cast::<u16>().unwrap().is_valid());
    /// assert!(Index::<usize>::new(40_000).try_cast::<u16>().is_none());
    /// ```
    #[must_use]
    pub fn try_cast<J: IndexType>(self) -> Option<Index<J>> {
        if !self.is_valid() {
            return Some(Index::BOTTOM);
        }

        J::from_usize(self.raw.to_usize())
            .filter(|raw| *raw < J::BOTTOM)
            .map(Index::new)
    }

    /// Converts the index to another index width, for interop between containers.
    ///
    /// # Panics
    ///
    /// Panics if a valid index does not fit the valid range of the target width.
    #[must_use]
    pub fn cast<J: IndexType>(self) -> Index<J> {
        self.try_cast().unwrap_or_else(|| {
            panic!(
                "index {} does not fit the valid range of an index of width {}",
                self.raw,
                std::any::type_name::<J>()
            )
        })
    }
}

impl<I: IndexType> Default for Index<I> {
    fn default() -> Self {
        Self::BOTTOM
    }
}

impl<I: IndexType> From<Index<I>> for usize {
    fn from(index: Index<I>) -> Self {
        index.raw.to_usize()
    }
}

impl<I: IndexType> fmt::Debug for Index<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "Index({})", self.raw)
        } else {
            f.write_str("Index(bottom)")
        }
    }
}

impl<I: IndexType> fmt::Display for Index<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.raw)
        } else {
            f.write_str("bottom")
        }
    }
}
