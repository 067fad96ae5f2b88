use std::any::type_name;
use std::num::NonZero;
use std::sync::Arc;
use std::{fmt, mem, ops, ptr};

use tracing::{debug, trace};

use crate::error::Result;
use crate::{
    CompactContainerBuilder, Cursor, Error, GrowthPolicy, Index, IndexType, Indices, IntoIter,
    Iter, IterMut, Slot,
};

/// A pool of values of type `T`, each addressed by a stable [`Index`].
///
/// The container stores its values in one contiguous array of slots. Each slot is either
/// occupied by a value or vacant, in which case it is a link in an intrusive free list threaded
/// through the vacant slots. Inserting pops the head of the free list and erasing pushes the slot
/// back onto it, so both are O(1) and the most recently erased index is the first to be reused.
///
/// When no vacant slot remains, the container grows by one block, sized by its
/// [`GrowthPolicy`]. Growth may move values in memory but never changes which value an index
/// refers to. The new slots are handed out in ascending order, so a container filled without
/// erasures iterates in insertion order.
///
/// The index width `I` bounds the capacity: half of its range is reserved, with
/// [`Index::BOTTOM`] never referring to a slot.
///
/// # Example
///
/// ```rust
/// use compact_container::CompactContainer;
///
/// let mut container = CompactContainer::<&str>::new();
///
/// let a = container.insert("a");
/// let b = container.insert("b");
/// assert_eq!((a.get(), b.get()), (0, 1));
///
/// container.erase(a);
/// let c = container.insert("c");
///
/// // The erased slot is reused first.
/// assert_eq!(c, a);
///
/// let contents: Vec<_> = container.iter().map(|(index, value)| (index.get(), *value)).collect();
/// assert_eq!(contents, [(0, "c"), (1, "b")]);
/// ```
///
/// # Iteration
///
/// [`iter()`][Self::iter], [`iter_mut()`][Self::iter_mut] and [`into_iter()`][IntoIterator]
/// visit the occupied slots in ascending index order, which is the canonical order for dumping
/// or persisting the contents. For index-based navigation in both directions, use a
/// [`Cursor`] from [`begin()`][Self::begin], [`end()`][Self::end] or
/// [`index_to()`][Self::index_to].
pub struct CompactContainer<T, I: IndexType = usize> {
    slots: Vec<Slot<T, I>>,

    /// The number of occupied slots.
    len: usize,

    /// The number of slots the next growth event will add, as dictated by the growth policy.
    block_size: NonZero<usize>,

    /// Index of the most recently vacated slot. Think of this as a virtual stack of the vacant
    /// slots, with the stack links stored in the vacant slots themselves. `Index::BOTTOM` if
    /// there are no vacant slots.
    free_list: Index<I>,

    growth_policy: Arc<dyn GrowthPolicy>,
}

impl<T, I: IndexType> CompactContainer<T, I> {
    #[must_use]
    pub(crate) fn new_inner(growth_policy: Arc<dyn GrowthPolicy>) -> Self {
        Self {
            slots: Vec::new(),
            len: 0,
            block_size: growth_policy.first_block_size(),
            free_list: Index::BOTTOM,
            growth_policy,
        }
    }

    /// Creates a new [`CompactContainer`] with the default configuration.
    ///
    /// The container starts empty with zero capacity and grows as needed when items are inserted.
    ///
    /// # Example
    ///
    /// ```rust
    /// use compact_container::CompactContainer;
    ///
    /// let container = CompactContainer::<String>::new();
    ///
    /// assert_eq!(container.len(), 0);
    /// assert_eq!(container.capacity(), 0);
    /// assert!(container.is_empty());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a new [`CompactContainer`].
    ///
    /// Use this when you want to customize the growth policy.
    pub fn builder() -> CompactContainerBuilder<T, I> {
        CompactContainerBuilder::new()
    }

    /// The number of values in the container.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the container holds no values. An empty container may still hold capacity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The total number of slots, occupied or vacant.
    ///
    /// Every index below the capacity refers to a slot; [`end()`][Self::end] is positioned at
    /// the capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// The maximum number of slots the index type `I` can address.
    ///
    /// # Example
    ///
    /// ```rust
    /// use compact_container::CompactContainer;
    ///
    /// let container = CompactContainer::<u8, u16>::new();
    /// assert_eq!(container.max_capacity(), 32767);
    /// ```
    #[must_use]
    pub fn max_capacity(&self) -> usize {
        I::BOTTOM.to_usize()
    }

    /// Whether `index` refers to an occupied slot of this container.
    ///
    /// Out-of-range indices, including [`Index::BOTTOM`], are not used.
    #[must_use]
    pub fn is_used(&self, index: Index<I>) -> bool {
        self.slots
            .get(usize::from(index))
            .is_some_and(Slot::is_occupied)
    }

    /// Gets a shared reference to the value at `index`, if the slot is occupied.
    #[must_use]
    pub fn get(&self, index: Index<I>) -> Option<&T> {
        self.slots.get(usize::from(index)).and_then(Slot::value)
    }

    /// Gets an exclusive reference to the value at `index`, if the slot is occupied.
    #[must_use]
    pub fn get_mut(&mut self, index: Index<I>) -> Option<&mut T> {
        self.slots
            .get_mut(usize::from(index))
            .and_then(Slot::value_mut)
    }

    /// Inserts a value and returns the index of the slot it was stored in.
    ///
    /// # Example
    ///
    /// ```rust
    /// use compact_container::CompactContainer;
    ///
    /// let mut container = CompactContainer::<u64>::new();
    ///
    /// let index = container.insert(42);
    /// assert_eq!(container[index], 42);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the container needs to grow and either the index space is exhausted or memory
    /// cannot be allocated. Use [`try_insert()`][Self::try_insert] to handle these conditions.
    pub fn insert(&mut self, value: T) -> Index<I> {
        self.try_insert(value)
            .unwrap_or_else(|error| Self::panic_on_growth_failure(&error))
    }

    /// Inserts a value and returns the index of the slot it was stored in, reporting failure to
    /// grow the container as an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexSpaceExhausted`] if every index the index type can address is in
    /// use, or [`Error::AllocationFailed`] if growing the slot array failed.
    pub fn try_insert(&mut self, value: T) -> Result<Index<I>> {
        let inserter = self.try_begin_insert()?;
        let index = inserter.index();
        inserter.insert(value);
        Ok(index)
    }

    /// Inserts a value constructed in place by `make`, which receives the index the value will
    /// occupy. Returns that same index.
    ///
    /// This is useful for values that need to know their own index, such as mesh elements that
    /// link to themselves.
    ///
    /// # Example
    ///
    /// ```rust
    /// use compact_container::{CompactContainer, Index};
    ///
    /// struct Halfedge {
    ///     me: Index,
    ///     twin: Index,
    /// }
    ///
    /// let mut halfedges = CompactContainer::<Halfedge>::new();
    ///
    /// let index = halfedges.emplace(|me| Halfedge {
    ///     me,
    ///     twin: Index::BOTTOM,
    /// });
    ///
    /// assert_eq!(halfedges[index].me, index);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the container needs to grow and either the index space is exhausted or memory
    /// cannot be allocated.
    pub fn emplace(&mut self, make: impl FnOnce(Index<I>) -> T) -> Index<I> {
        let inserter = self.begin_insert();
        let index = inserter.index();
        inserter.insert(make(index));
        index
    }

    /// Creates an inserter that reserves the next slot and reveals its index before the value
    /// is provided.
    ///
    /// Abandoning the inserter without inserting leaves the container unchanged, apart from any
    /// capacity growth that was needed to obtain a vacant slot.
    ///
    /// # Example
    ///
    /// ```rust
    /// use compact_container::CompactContainer;
    ///
    /// let mut container = CompactContainer::<String>::new();
    ///
    /// let inserter = container.begin_insert();
    /// let index = inserter.index();
    ///
    /// let value = inserter.insert(format!("element {index}"));
    /// value.push('!');
    ///
    /// assert_eq!(container[index], "element 0!");
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the container needs to grow and either the index space is exhausted or memory
    /// cannot be allocated.
    #[must_use]
    pub fn begin_insert(&mut self) -> CompactContainerInserter<'_, T, I> {
        match self.try_begin_insert() {
            Ok(inserter) => inserter,
            Err(error) => Self::panic_on_growth_failure(&error),
        }
    }

    /// Creates an inserter, reporting failure to grow the container as an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexSpaceExhausted`] if every index the index type can address is in
    /// use, or [`Error::AllocationFailed`] if growing the slot array failed.
    pub fn try_begin_insert(&mut self) -> Result<CompactContainerInserter<'_, T, I>> {
        if !self.free_list.is_valid() {
            self.grow(NonZero::<usize>::MIN)?;
        }

        let index = self.free_list;

        Ok(CompactContainerInserter {
            container: self,
            index,
        })
    }

    /// Removes the value at `index` and returns it. The slot becomes the next one to be reused.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of range or the slot is vacant.
    pub fn remove(&mut self, index: Index<I>) -> T {
        let capacity = self.capacity();
        let free_list = self.free_list;

        let Some(slot) = self.slots.get_mut(usize::from(index)) else {
            panic!(
                "remove({index}) index out of bounds in compact container of {} with capacity {capacity}",
                type_name::<T>()
            );
        };

        assert!(
            slot.is_occupied(),
            "remove({index}) slot was vacant in compact container of {}",
            type_name::<T>()
        );

        let previous = mem::replace(
            slot,
            Slot::Vacant {
                next_free: free_list,
            },
        );

        // Push the removed slot onto the free stack.
        self.free_list = index;

        self.len = self
            .len
            .checked_sub(1)
            .expect("we asserted above that the slot is occupied so len must be non-zero");

        previous
            .into_value()
            .expect("we asserted above that the slot is occupied")
    }

    /// Removes and drops the value at `index`. The slot becomes the next one to be reused.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of range or the slot is vacant.
    pub fn erase(&mut self, index: Index<I>) {
        drop(self.remove(index));
    }

    /// Retains only the values for which `keep` returns `true`, erasing the rest.
    ///
    /// Values are visited in ascending index order.
    ///
    /// # Example
    ///
    /// ```rust
    /// use compact_container::CompactContainer;
    ///
    /// let mut container: CompactContainer<u32> = (0..10).collect();
    /// container.retain(|_, value| *value % 3 == 0);
    ///
    /// assert_eq!(container.len(), 4);
    /// ```
    pub fn retain(&mut self, mut keep: impl FnMut(Index<I>, &mut T) -> bool) {
        for position in 0..self.capacity() {
            let index = Index::from_position(position);

            let erase = self
                .get_mut(index)
                .is_some_and(|value| !keep(index, value));

            if erase {
                self.erase(index);
            }
        }
    }

    /// Drops every value and releases all storage, returning the container to the state of a
    /// freshly created one with the same growth policy.
    pub fn clear(&mut self) {
        if self.slots.is_empty() {
            return;
        }

        debug!(
            len = self.len,
            capacity = self.capacity(),
            item_type = type_name::<T>(),
            "clearing compact container"
        );

        self.slots = Vec::new();
        self.len = 0;
        self.free_list = Index::BOTTOM;
        self.block_size = self.growth_policy.first_block_size();
    }

    /// Replaces the contents of the container with the values of `values`.
    ///
    /// The new values are assigned indices in ascending order starting from zero.
    pub fn assign(&mut self, values: impl IntoIterator<Item = T>) {
        self.clear();
        self.extend(values);
    }

    /// Ensures that at least `additional` more values can be inserted without growing.
    ///
    /// Capacity is added in whole blocks as dictated by the growth policy, with a single
    /// reallocation. The new slots are handed out before any slots that were already vacant.
    ///
    /// # Example
    ///
    /// ```rust
    /// use compact_container::CompactContainer;
    ///
    /// let mut container = CompactContainer::<u32>::new();
    /// container.reserve(100);
    ///
    /// assert!(container.capacity() >= 100);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the index space is exhausted or memory cannot be allocated.
    pub fn reserve(&mut self, additional: usize) {
        self.try_reserve(additional)
            .unwrap_or_else(|error| Self::panic_on_growth_failure(&error));
    }

    /// Ensures that at least `additional` more values can be inserted without growing,
    /// reporting failure to grow as an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexSpaceExhausted`] if the index type cannot address the required
    /// capacity, or [`Error::AllocationFailed`] if growing the slot array failed.
    pub fn try_reserve(&mut self, additional: usize) -> Result<()> {
        let vacant = self
            .capacity()
            .checked_sub(self.len)
            .expect("len never exceeds capacity");

        let Some(missing) = additional.checked_sub(vacant).and_then(NonZero::new) else {
            trace!(additional, vacant, "reservation already satisfied");
            return Ok(());
        };

        self.grow(missing)
    }

    /// Maps a reference to a value stored in this container back to the value's index.
    ///
    /// Returns `None` if the reference does not point to a value stored in this container.
    ///
    /// # Example
    ///
    /// ```rust
    /// use compact_container::CompactContainer;
    ///
    /// let mut container = CompactContainer::<u32>::new();
    /// let index = container.insert(7);
    ///
    /// let value = &container[index];
    /// assert_eq!(container.compute_index(value), Some(index));
    ///
    /// let elsewhere = 7;
    /// assert_eq!(container.compute_index(&elsewhere), None);
    /// ```
    #[must_use]
    pub fn compute_index(&self, value: &T) -> Option<Index<I>> {
        let offset = ptr::from_ref(value)
            .addr()
            .checked_sub(self.slots.as_ptr().addr())?;

        let position = offset.checked_div(size_of::<Slot<T, I>>())?;

        match self.slots.get(position)? {
            Slot::Occupied { value: stored } if ptr::eq(stored, value) => {
                Some(Index::from_position(position))
            }
            _ => None,
        }
    }

    /// A cursor positioned at the occupied slot with the lowest index, or at
    /// [`end()`][Self::end] if the container is empty.
    #[must_use]
    pub fn begin(&self) -> Cursor<'_, T, I> {
        let position = self
            .slots
            .iter()
            .position(Slot::is_occupied)
            .unwrap_or_else(|| self.capacity());

        Cursor::new(self, position)
    }

    /// A cursor positioned one past the last slot, at the index equal to the capacity.
    #[must_use]
    pub fn end(&self) -> Cursor<'_, T, I> {
        Cursor::new(self, self.capacity())
    }

    /// A cursor positioned at `index`, for resuming navigation from a stored index.
    ///
    /// # Example
    ///
    /// ```rust
    /// use compact_container::CompactContainer;
    ///
    /// let mut container = CompactContainer::<char>::new();
    /// let a = container.insert('a');
    /// let b = container.insert('b');
    ///
    /// let mut cursor = container.index_to(a);
    /// cursor.move_next();
    ///
    /// assert_eq!(cursor.index(), b);
    /// assert_eq!(cursor.get(), Some(&'b'));
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `index` is greater than the capacity.
    #[must_use]
    pub fn index_to(&self, index: Index<I>) -> Cursor<'_, T, I> {
        let position = usize::from(index);

        assert!(
            position <= self.capacity(),
            "index_to({index}) index out of bounds in compact container of {} with capacity {}",
            type_name::<T>(),
            self.capacity()
        );

        Cursor::new(self, position)
    }

    /// A cursor positioned at the slot holding `value`, if `value` is stored in this container.
    #[must_use]
    pub fn cursor_to(&self, value: &T) -> Option<Cursor<'_, T, I>> {
        self.compute_index(value)
            .map(|index| Cursor::new(self, usize::from(index)))
    }

    /// Whether `cursor` belongs to this container and is either at [`end()`][Self::end] or
    /// positioned on an occupied slot.
    #[must_use]
    pub fn owns(&self, cursor: &Cursor<'_, T, I>) -> bool {
        ptr::eq(cursor.container(), self) && (cursor.is_end() || self.is_used(cursor.index()))
    }

    /// Whether `cursor` belongs to this container and is positioned on an occupied slot.
    #[must_use]
    pub fn owns_dereferenceable(&self, cursor: &Cursor<'_, T, I>) -> bool {
        !cursor.is_end() && self.owns(cursor)
    }

    /// Iterates over the indices and values in ascending index order.
    pub fn iter(&self) -> Iter<'_, T, I> {
        Iter::new(&self.slots, self.len)
    }

    /// Iterates over the indices and exclusive references to the values in ascending index
    /// order.
    pub fn iter_mut(&mut self) -> IterMut<'_, T, I> {
        IterMut::new(&mut self.slots, self.len)
    }

    /// Iterates over the indices of the occupied slots in ascending order.
    pub fn indices(&self) -> Indices<'_, T, I> {
        Indices::new(self.iter())
    }

    pub(crate) fn slots(&self) -> &[Slot<T, I>] {
        &self.slots
    }

    /// Adds at least `min_slots` vacant slots, in whole blocks sized by the growth policy.
    ///
    /// The new slots are threaded onto the free list ahead of any existing vacant slots, in
    /// ascending order, so that subsequent inserts fill them from the lowest index upwards.
    fn grow(&mut self, min_slots: NonZero<usize>) -> Result<()> {
        let old_capacity = self.capacity();
        let max_capacity = self.max_capacity();

        let required_capacity = old_capacity
            .checked_add(min_slots.get())
            .filter(|required| *required <= max_capacity)
            .ok_or(Error::IndexSpaceExhausted { max_capacity })?;

        let mut new_capacity = old_capacity;
        let mut block_size = self.block_size;

        while new_capacity < required_capacity {
            new_capacity = new_capacity
                .saturating_add(block_size.get())
                .min(max_capacity);
            block_size = self.growth_policy.next_block_size(new_capacity, block_size);
        }

        let added = new_capacity
            .checked_sub(old_capacity)
            .expect("capacity only ever grows");

        self.slots
            .try_reserve_exact(added)
            .map_err(|source| Error::AllocationFailed {
                requested_capacity: new_capacity,
                source,
            })?;

        let previous_head = self.free_list;

        for position in old_capacity..new_capacity {
            let next_position = position
                .checked_add(1)
                .expect("guarded by new capacity being at most bottom");

            let next_free = if next_position < new_capacity {
                Index::from_position(next_position)
            } else {
                previous_head
            };

            self.slots.push(Slot::Vacant { next_free });
        }

        self.free_list = Index::from_position(old_capacity);
        self.block_size = block_size;

        debug!(
            old_capacity,
            new_capacity,
            next_block_size = block_size.get(),
            item_type = type_name::<T>(),
            "compact container grew"
        );

        Ok(())
    }

    fn panic_on_growth_failure(error: &Error) -> ! {
        panic!(
            "cannot grow compact container of {}: {error}",
            type_name::<T>()
        )
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(test)]
    pub(crate) fn integrity_check(&self) {
        let capacity = self.capacity();

        let occupied = self.slots.iter().filter(|slot| slot.is_occupied()).count();
        assert_eq!(
            self.len,
            occupied,
            "len {} does not match the observed occupied count {occupied} in compact container of {}",
            self.len,
            type_name::<T>()
        );

        let vacant = capacity
            .checked_sub(occupied)
            .expect("occupied slots are a subset of all slots");

        // Walk the free list, which must visit every vacant slot exactly once.
        let mut visited = vec![false; capacity];
        let mut visited_count: usize = 0;
        let mut current = self.free_list;

        while current.is_valid() {
            let position = usize::from(current);

            let Some(Slot::Vacant { next_free }) = self.slots.get(position) else {
                panic!(
                    "free list links to {current} which is not a vacant slot in compact container of {}",
                    type_name::<T>()
                );
            };

            let seen = visited
                .get_mut(position)
                .expect("guarded by the slot lookup above");
            assert!(
                !*seen,
                "free list visits {current} twice in compact container of {}",
                type_name::<T>()
            );
            *seen = true;

            visited_count = visited_count
                .checked_add(1)
                .expect("bounded by capacity");
            current = *next_free;
        }

        assert_eq!(
            visited_count,
            vacant,
            "free list length {visited_count} does not match the vacant slot count {vacant} in compact container of {}",
            type_name::<T>()
        );
    }
}

impl<T, I: IndexType> Default for CompactContainer<T, I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, I: IndexType> Clone for CompactContainer<T, I> {
    /// Copies the container slot for slot. Every value keeps its index, so indices stored
    /// inside the values remain meaningful in the copy, and iteration order is preserved.
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            len: self.len,
            block_size: self.block_size,
            free_list: self.free_list,
            growth_policy: Arc::clone(&self.growth_policy),
        }
    }
}

impl<T, I: IndexType> fmt::Debug for CompactContainer<T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .field("block_size", &self.block_size)
            .field("free_list", &self.free_list)
            .field("growth_policy", &self.growth_policy)
            .finish()
    }
}

impl<T, I: IndexType> ops::Index<Index<I>> for CompactContainer<T, I> {
    type Output = T;

    /// # Panics
    ///
    /// Panics if the index is out of range or the slot is vacant.
    fn index(&self, index: Index<I>) -> &T {
        self.get(index).unwrap_or_else(|| {
            panic!(
                "index {index} is not associated with a value in compact container of {} with capacity {}",
                type_name::<T>(),
                self.capacity()
            )
        })
    }
}

impl<T, I: IndexType> ops::IndexMut<Index<I>> for CompactContainer<T, I> {
    /// # Panics
    ///
    /// Panics if the index is out of range or the slot is vacant.
    fn index_mut(&mut self, index: Index<I>) -> &mut T {
        let capacity = self.capacity();

        self.get_mut(index).unwrap_or_else(|| {
            panic!(
                "index {index} is not associated with a value in compact container of {} with capacity {capacity}",
                type_name::<T>()
            )
        })
    }
}

impl<T, I: IndexType> Extend<T> for CompactContainer<T, I> {
    fn extend<It: IntoIterator<Item = T>>(&mut self, values: It) {
        for value in values {
            _ = self.insert(value);
        }
    }
}

impl<T, I: IndexType> FromIterator<T> for CompactContainer<T, I> {
    fn from_iter<It: IntoIterator<Item = T>>(values: It) -> Self {
        let mut container = Self::new();
        container.extend(values);
        container
    }
}

impl<'c, T, I: IndexType> IntoIterator for &'c CompactContainer<T, I> {
    type Item = (Index<I>, &'c T);
    type IntoIter = Iter<'c, T, I>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'c, T, I: IndexType> IntoIterator for &'c mut CompactContainer<T, I> {
    type Item = (Index<I>, &'c mut T);
    type IntoIter = IterMut<'c, T, I>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T, I: IndexType> IntoIterator for CompactContainer<T, I> {
    type Item = (Index<I>, T);
    type IntoIter = IntoIter<T, I>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.slots, self.len)
    }
}

/// An inserter for a [`CompactContainer`], reserving the next slot before its value is known.
///
/// Created by [`CompactContainer::begin_insert()`]. The inserter already knows the index the
/// value will be stored at, via [`index()`][Self::index].
#[derive(Debug)]
pub struct CompactContainerInserter<'c, T, I: IndexType = usize> {
    container: &'c mut CompactContainer<T, I>,

    /// Index at which the value will be inserted. This is the head of the free list.
    index: Index<I>,
}

impl<'c, T, I: IndexType> CompactContainerInserter<'c, T, I> {
    /// The index the value will be stored at.
    #[must_use]
    pub fn index(&self) -> Index<I> {
        self.index
    }

    /// Stores the value and returns an exclusive reference to it.
    pub fn insert(self, value: T) -> &'c mut T {
        let container = self.container;
        let index = self.index;

        let slot = container
            .slots
            .get_mut(usize::from(index))
            .expect("the inserter index is the head of the free list, which is always in bounds");

        let previous = mem::replace(slot, Slot::Occupied { value });

        // Pop the slot off the free stack.
        container.free_list = match previous {
            Slot::Vacant { next_free } => next_free,
            Slot::Occupied { .. } => panic!(
                "slot {index} was not vacant when we inserted into it in compact container of {}",
                type_name::<T>()
            ),
        };

        container.len = container
            .len
            .checked_add(1)
            .expect("guarded by capacity being at most bottom");

        slot.value_mut()
            .expect("we just stored a value in this slot")
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};
    use std::thread;

    use new_zealand::nz;
    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::{ConstantGrowth, DoublingGrowth};

    assert_impl_all!(CompactContainer<u32>: Send, Sync, Default, Clone);
    assert_not_impl_any!(CompactContainer<Rc<u32>>: Send, Sync);
    assert_not_impl_any!(CompactContainer<Cell<u32>>: Sync);

    fn index(raw: usize) -> Index {
        Index::new(raw)
    }

    fn small_blocks<T>() -> CompactContainer<T> {
        CompactContainer::builder()
            .growth_policy(ConstantGrowth::new(nz!(2)))
            .build()
    }

    #[test]
    fn smoke_test() {
        let mut container = CompactContainer::<u32>::new();

        let a = container.insert(42);
        let b = container.insert(43);
        let c = container.insert(44);

        assert_eq!(container[a], 42);
        assert_eq!(container[b], 43);
        assert_eq!(container[c], 44);
        assert_eq!(container.len(), 3);

        container.erase(b);

        assert_eq!(container.len(), 2);
        assert!(!container.is_used(b));

        let d = container.insert(45);

        assert_eq!(d, b);
        assert_eq!(container[a], 42);
        assert_eq!(container[c], 44);
        assert_eq!(container[d], 45);

        container.integrity_check();
    }

    #[test]
    fn scenario_reuses_erased_slot() {
        let mut container = CompactContainer::<char>::new();
        assert_eq!(container.capacity(), 0);

        let a = container.insert('a');
        assert_eq!((a, container.len()), (index(0), 1));

        let b = container.insert('b');
        assert_eq!((b, container.len()), (index(1), 2));

        container.erase(a);
        assert_eq!(container.len(), 1);
        assert!(!container.is_used(index(0)));

        let c = container.insert('c');
        assert_eq!((c, container.len()), (index(0), 2));

        let contents: Vec<_> = container.iter().map(|(i, v)| (i.get(), *v)).collect();
        assert_eq!(contents, [(0, 'c'), (1, 'b')]);

        container.integrity_check();
    }

    #[test]
    fn first_insert_allocates_first_block() {
        let mut container = CompactContainer::<u32>::builder()
            .growth_policy(DoublingGrowth::new(nz!(4)))
            .build();

        _ = container.insert(1);

        assert_eq!(container.capacity(), 4);
    }

    #[test]
    fn doubling_growth_sequence() {
        let mut container = CompactContainer::<u32>::builder()
            .growth_policy(DoublingGrowth::new(nz!(4)))
            .build();

        let mut capacities = Vec::new();

        for value in 0..17 {
            _ = container.insert(value);

            if capacities.last() != Some(&container.capacity()) {
                capacities.push(container.capacity());
            }
        }

        assert_eq!(capacities, [4, 8, 16, 32]);
        container.integrity_check();
    }

    #[test]
    fn constant_growth_sequence() {
        let mut container = small_blocks::<u32>();

        for value in 0..5 {
            _ = container.insert(value);
        }

        assert_eq!(container.capacity(), 6);
    }

    #[test]
    fn indices_and_values_survive_growth() {
        let mut container = small_blocks::<String>();

        let inserted: Vec<_> = (0..9)
            .map(|n| (container.insert(n.to_string()), n.to_string()))
            .collect();

        for (position, (index, value)) in inserted.iter().enumerate() {
            assert_eq!(usize::from(*index), position);
            assert_eq!(&container[*index], value);
        }

        container.integrity_check();
    }

    #[test]
    fn erase_then_insert_is_lifo() {
        let mut container = CompactContainer::<u32>::new();

        let indices: Vec<_> = (0..5).map(|n| container.insert(n)).collect();

        container.erase(indices[1]);
        container.erase(indices[3]);

        assert_eq!(container.insert(10), indices[3]);
        assert_eq!(container.insert(11), indices[1]);
        container.integrity_check();
    }

    #[test]
    fn new_block_is_used_before_older_vacancies_after_reserve() {
        let mut container = small_blocks::<u32>();

        let a = container.insert(1);
        _ = container.insert(2);
        container.erase(a);

        // One vacant slot exists, so reserving three adds two more.
        container.reserve(3);
        assert_eq!(container.capacity(), 4);
        container.integrity_check();

        assert_eq!(container.insert(3), index(2));
        assert_eq!(container.insert(4), index(3));
        assert_eq!(container.insert(5), a);
    }

    #[test]
    fn reserve_when_satisfied_is_noop() {
        let mut container = small_blocks::<u32>();
        _ = container.insert(1);

        container.reserve(1);
        assert_eq!(container.capacity(), 2);

        container.reserve(0);
        assert_eq!(container.capacity(), 2);
    }

    #[test]
    fn reserve_adds_whole_blocks() {
        let mut container = CompactContainer::<u32>::builder()
            .growth_policy(ConstantGrowth::new(nz!(8)))
            .build();

        container.reserve(9);

        assert_eq!(container.capacity(), 16);
        container.integrity_check();
    }

    #[test]
    fn remove_returns_value() {
        let mut container = CompactContainer::<String>::new();
        let index = container.insert("hello".to_string());

        assert_eq!(container.remove(index), "hello");
        assert!(container.is_empty());
    }

    #[test]
    #[should_panic]
    fn erase_vacant_panics() {
        let mut container = CompactContainer::<u32>::new();
        let a = container.insert(1);
        container.erase(a);
        container.erase(a);
    }

    #[test]
    #[should_panic]
    fn erase_out_of_bounds_panics() {
        let mut container = CompactContainer::<u32>::new();
        container.erase(index(1234));
    }

    #[test]
    #[should_panic]
    fn index_vacant_panics() {
        let mut container = CompactContainer::<u32>::new();
        _ = container.insert(1);
        _ = container[index(1)];
    }

    #[test]
    #[should_panic]
    fn index_bottom_panics() {
        let container = CompactContainer::<u32>::new();
        _ = container[Index::BOTTOM];
    }

    #[test]
    fn get_on_vacant_is_none() {
        let mut container = CompactContainer::<u32>::new();
        let a = container.insert(1);
        container.erase(a);

        assert_eq!(container.get(a), None);
        assert_eq!(container.get_mut(a), None);
        assert_eq!(container.get(Index::BOTTOM), None);
    }

    #[test]
    fn index_mut_modifies_value() {
        let mut container = CompactContainer::<u32>::new();
        let a = container.insert(1);

        container[a] += 10;

        assert_eq!(container[a], 11);
    }

    #[test]
    fn inserted_index_is_never_bottom() {
        let mut container = CompactContainer::<u32, u16>::new();

        for value in 0..100 {
            assert!(container.insert(value).is_valid());
        }
    }

    #[test]
    fn abandoned_inserter_is_noop() {
        let mut container = CompactContainer::<u32>::new();

        let inserter = container.begin_insert();
        assert_eq!(inserter.index(), index(0));

        let inserter = container.begin_insert();
        assert_eq!(inserter.index(), index(0));
        *inserter.insert(20) += 1;

        assert_eq!(container[index(0)], 21);
        assert_eq!(container.len(), 1);
        container.integrity_check();
    }

    #[test]
    fn emplace_sees_own_index() {
        let mut container = CompactContainer::<Index>::new();

        _ = container.insert(Index::BOTTOM);
        let b = container.emplace(|me| me);

        assert_eq!(container[b], b);
        assert_eq!(b, index(1));
    }

    #[test]
    fn clear_on_empty_is_noop() {
        let mut container = CompactContainer::<u32>::new();

        container.clear();

        assert_eq!(container.len(), 0);
        assert_eq!(container.capacity(), 0);
    }

    #[test]
    fn clear_resets_to_fresh_state() {
        let mut container = small_blocks::<u32>();

        for value in 0..7 {
            _ = container.insert(value);
        }
        container.erase(index(3));

        container.clear();

        assert_eq!(container.len(), 0);
        assert_eq!(container.capacity(), 0);
        assert_eq!(container.begin(), container.end());

        assert_eq!(container.insert(100), index(0));
        assert_eq!(container.capacity(), 2);
        container.integrity_check();
    }

    #[test]
    fn clear_drops_values() {
        let counter = Rc::new(());

        let mut container = CompactContainer::<Rc<()>>::new();
        for _ in 0..5 {
            _ = container.insert(Rc::clone(&counter));
        }
        assert_eq!(Rc::strong_count(&counter), 6);

        container.clear();
        assert_eq!(Rc::strong_count(&counter), 1);
    }

    #[test]
    fn calls_drop_on_erase() {
        struct Droppable {
            dropped: Rc<Cell<bool>>,
        }

        impl Drop for Droppable {
            fn drop(&mut self) {
                self.dropped.set(true);
            }
        }

        let dropped = Rc::new(Cell::new(false));
        let mut container = CompactContainer::<Droppable>::new();

        let a = container.insert(Droppable {
            dropped: Rc::clone(&dropped),
        });
        assert!(!dropped.get());

        container.erase(a);
        assert!(dropped.get());
    }

    #[test]
    fn retain_erases_rejected() {
        let mut container: CompactContainer<u32> = (0..6).collect();

        container.retain(|_, value| *value % 2 == 0);

        let remaining: Vec<_> = container.iter().map(|(_, v)| *v).collect();
        assert_eq!(remaining, [0, 2, 4]);

        // The highest erased slot was freed last, so it is reused first.
        assert_eq!(container.insert(9), index(5));
        container.integrity_check();
    }

    #[test]
    fn retain_can_modify_kept_values() {
        let mut container: CompactContainer<u32> = (1..=3).collect();

        container.retain(|_, value| {
            *value *= 10;
            true
        });

        let values: Vec<_> = container.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, [10, 20, 30]);
    }

    #[test]
    fn assign_replaces_contents() {
        let mut container: CompactContainer<u32> = (0..10).collect();
        container.erase(index(0));

        container.assign([7, 8]);

        let contents: Vec<_> = container.iter().map(|(i, v)| (i.get(), *v)).collect();
        assert_eq!(contents, [(0, 7), (1, 8)]);
    }

    #[test]
    fn clone_preserves_indices() {
        let mut container: CompactContainer<String> =
            ["a", "b", "c", "d"].iter().map(ToString::to_string).collect();
        container.erase(index(1));

        let mut copy = container.clone();

        assert_eq!(copy.len(), 3);
        assert_eq!(copy[index(2)], "c");
        assert!(!copy.is_used(index(1)));

        // The free list is copied too.
        assert_eq!(copy.insert("e".to_string()), index(1));
        copy.integrity_check();
        container.integrity_check();
    }

    #[test]
    fn compute_index_finds_stored_values() {
        let mut container = small_blocks::<u64>();

        let indices: Vec<_> = (0..5).map(|n| container.insert(n)).collect();

        for index in indices {
            assert_eq!(container.compute_index(&container[index]), Some(index));
        }
    }

    #[test]
    fn compute_index_rejects_foreign_values() {
        let mut container = CompactContainer::<u64>::new();
        _ = container.insert(1);

        let other: CompactContainer<u64> = [1].into_iter().collect();

        assert_eq!(container.compute_index(&other[index(0)]), None);
        assert_eq!(container.compute_index(&1), None);
    }

    #[test]
    fn compute_index_on_empty_is_none() {
        let container = CompactContainer::<u64>::new();

        assert_eq!(container.compute_index(&5), None);
    }

    #[test]
    fn owns_checks_identity_and_state() {
        let mut container: CompactContainer<u32> = (0..3).collect();
        container.erase(index(1));
        let other: CompactContainer<u32> = (0..3).collect();

        assert!(container.owns(&container.begin()));
        assert!(container.owns(&container.end()));
        assert!(!container.owns(&container.index_to(index(1))));
        assert!(!container.owns(&other.begin()));

        assert!(container.owns_dereferenceable(&container.begin()));
        assert!(!container.owns_dereferenceable(&container.end()));
    }

    #[test]
    fn cursor_to_positions_on_value() {
        let container: CompactContainer<u32> = (0..3).collect();

        let cursor = container.cursor_to(&container[index(2)]).unwrap();

        assert_eq!(cursor.index(), index(2));
        assert_eq!(cursor.get(), Some(&2));
    }

    #[test]
    #[should_panic]
    fn index_to_beyond_end_panics() {
        let container: CompactContainer<u32> = (0..3).collect();
        _ = container.index_to(index(1000));
    }

    #[test]
    fn narrow_index_space_exhaustion_is_error() {
        let mut container = CompactContainer::<u8, u16>::builder()
            .growth_policy(DoublingGrowth::new(nz!(1024)))
            .build();

        for _ in 0..container.max_capacity() {
            _ = container.insert(0);
        }

        assert_eq!(container.capacity(), 32767);
        assert!(matches!(
            container.try_insert(0),
            Err(Error::IndexSpaceExhausted {
                max_capacity: 32767
            })
        ));

        // Freeing a slot makes room again.
        container.erase(index_u16(5));
        assert_eq!(container.try_insert(0).unwrap(), index_u16(5));
    }

    fn index_u16(raw: u16) -> Index<u16> {
        Index::new(raw)
    }

    #[test]
    fn reserve_beyond_index_space_is_error() {
        let mut container = CompactContainer::<u8, u16>::new();

        assert!(matches!(
            container.try_reserve(40_000),
            Err(Error::IndexSpaceExhausted { .. })
        ));
        assert_eq!(container.capacity(), 0);
    }

    #[test]
    #[should_panic]
    fn insert_into_exhausted_index_space_panics() {
        let mut container = CompactContainer::<u8, u16>::new();
        container.reserve(32767);

        for _ in 0..32768 {
            _ = container.insert(0);
        }
    }

    #[test]
    fn debug_output_mentions_state() {
        let mut container = CompactContainer::<u32>::new();
        _ = container.insert(1);

        let output = format!("{container:?}");

        assert!(output.contains("len: 1"));
        assert!(output.contains("capacity: 16"));
    }

    #[test]
    fn multithreaded_via_mutex() {
        let container = Arc::new(Mutex::new(CompactContainer::<u32>::new()));

        let a;
        let b;

        {
            let mut container = container.lock().unwrap();
            a = container.insert(42);
            b = container.insert(43);
        }

        let container_clone = Arc::clone(&container);
        thread::spawn(move || {
            let mut container = container_clone.lock().unwrap();

            container.erase(b);
            let c = container.insert(44);

            assert_eq!(c, b);
            assert_eq!(container[a], 42);
        })
        .join()
        .unwrap();

        let container = container.lock().unwrap();
        assert_eq!(container[b], 44);
    }
}
