use std::any::type_name;
use std::{fmt, ptr};

use crate::{CompactContainer, Index, IndexType, Slot};

/// A bidirectional position within a [`CompactContainer`] that only stops on occupied slots
/// and at the end position.
///
/// Obtain a cursor from [`CompactContainer::begin()`], [`CompactContainer::end()`],
/// [`CompactContainer::index_to()`] or [`CompactContainer::cursor_to()`]. A cursor is a borrow
/// of the container; to keep a reference to an element beyond that, store its
/// [`index()`][Self::index] and rebuild the cursor later with
/// [`index_to()`][CompactContainer::index_to].
///
/// Two cursors are equal if they refer to the same container and the same position.
///
/// # Example
///
/// ```rust
/// use compact_container::CompactContainer;
///
/// let mut container: CompactContainer<u32> = (0..5).collect();
/// container.erase(container.begin().index());
///
/// let mut cursor = container.begin();
/// let mut visited = Vec::new();
///
/// while cursor != container.end() {
///     visited.push(*cursor.value());
///     cursor.move_next();
/// }
///
/// assert_eq!(visited, [1, 2, 3, 4]);
///
/// // And back again.
/// cursor.move_prev();
/// assert_eq!(cursor.get(), Some(&4));
/// ```
pub struct Cursor<'c, T, I: IndexType = usize> {
    container: &'c CompactContainer<T, I>,

    /// Either the position of an occupied slot or the capacity of the container (end).
    position: usize,
}

impl<'c, T, I: IndexType> Cursor<'c, T, I> {
    pub(crate) fn new(container: &'c CompactContainer<T, I>, position: usize) -> Self {
        Self {
            container,
            position,
        }
    }

    /// The container this cursor navigates.
    #[must_use]
    pub fn container(&self) -> &'c CompactContainer<T, I> {
        self.container
    }

    /// The index the cursor is positioned at. At the end position, this equals the capacity of
    /// the container.
    #[must_use]
    pub fn index(&self) -> Index<I> {
        Index::from_position(self.position)
    }

    /// Whether the cursor is positioned at the end, one past the last slot.
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.position >= self.container.capacity()
    }

    /// The value at the cursor, or `None` if the cursor is at the end or its slot is vacant.
    #[must_use]
    pub fn get(&self) -> Option<&'c T> {
        self.container.slots().get(self.position).and_then(Slot::value)
    }

    /// The value at the cursor.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is at the end or its slot is vacant.
    #[must_use]
    pub fn value(&self) -> &'c T {
        self.get().unwrap_or_else(|| {
            panic!(
                "dereferenced a cursor at {} that is not positioned on a value in compact container of {}",
                self.position,
                type_name::<T>()
            )
        })
    }

    /// Advances to the next occupied slot, or to the end if there is none.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is already at the end.
    pub fn move_next(&mut self) {
        assert!(
            !self.is_end(),
            "moved a cursor past the end of compact container of {}",
            type_name::<T>()
        );

        let start = self
            .position
            .checked_add(1)
            .expect("guarded by position being below capacity");

        self.position = self
            .container
            .slots()
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, slot)| slot.is_occupied())
            .map_or_else(|| self.container.capacity(), |(position, _)| position);
    }

    /// Retreats to the previous occupied slot.
    ///
    /// Moving back from the end positions the cursor at the occupied slot with the highest
    /// index.
    ///
    /// # Panics
    ///
    /// Panics if there is no occupied slot before the cursor, that is, if the cursor is at
    /// [`begin()`][CompactContainer::begin].
    pub fn move_prev(&mut self) {
        let end = self.position.min(self.container.capacity());

        let previous = self
            .container
            .slots()
            .get(..end)
            .and_then(|before| before.iter().rposition(Slot::is_occupied));

        let Some(position) = previous else {
            panic!(
                "moved a cursor before the beginning of compact container of {}",
                type_name::<T>()
            );
        };

        self.position = position;
    }
}

impl<T, I: IndexType> Clone for Cursor<'_, T, I> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, I: IndexType> Copy for Cursor<'_, T, I> {}

impl<T, I: IndexType> PartialEq for Cursor<'_, T, I> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.container, other.container) && self.position == other.position
    }
}

impl<T, I: IndexType> Eq for Cursor<'_, T, I> {}

impl<T, I: IndexType> fmt::Debug for Cursor<'_, T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("container", &ptr::from_ref(self.container))
            .field("position", &self.position)
            .field("is_end", &self.is_end())
            .finish()
    }
}
