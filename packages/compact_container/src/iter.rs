use std::iter::{Enumerate, FusedIterator};
use std::{slice, vec};

use crate::{Index, IndexType, Slot};

/// Iterator over the indices and values of a [`CompactContainer`][crate::CompactContainer],
/// in ascending index order.
///
/// Created by [`CompactContainer::iter()`][crate::CompactContainer::iter].
#[derive(Debug)]
pub struct Iter<'c, T, I: IndexType = usize> {
    slots: Enumerate<slice::Iter<'c, Slot<T, I>>>,

    /// Occupied slots not yet yielded from either end.
    remaining: usize,
}

impl<'c, T, I: IndexType> Iter<'c, T, I> {
    pub(crate) fn new(slots: &'c [Slot<T, I>], len: usize) -> Self {
        Self {
            slots: slots.iter().enumerate(),
            remaining: len,
        }
    }

    fn yielded(&mut self) {
        self.remaining = self
            .remaining
            .checked_sub(1)
            .expect("cannot yield more values than there are occupied slots");
    }
}

impl<T, I: IndexType> Clone for Iter<'_, T, I> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            remaining: self.remaining,
        }
    }
}

impl<'c, T, I: IndexType> Iterator for Iter<'c, T, I> {
    type Item = (Index<I>, &'c T);

    fn next(&mut self) -> Option<Self::Item> {
        let (position, value) = self
            .slots
            .find_map(|(position, slot)| slot.value().map(|value| (position, value)))?;

        self.yielded();
        Some((Index::from_position(position), value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T, I: IndexType> DoubleEndedIterator for Iter<'_, T, I> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let (position, value) = self
            .slots
            .by_ref()
            .rev()
            .find_map(|(position, slot)| slot.value().map(|value| (position, value)))?;

        self.yielded();
        Some((Index::from_position(position), value))
    }
}

impl<T, I: IndexType> ExactSizeIterator for Iter<'_, T, I> {}

impl<T, I: IndexType> FusedIterator for Iter<'_, T, I> {}

/// Iterator over the indices of and exclusive references to the values of a
/// [`CompactContainer`][crate::CompactContainer], in ascending index order.
///
/// Created by [`CompactContainer::iter_mut()`][crate::CompactContainer::iter_mut].
#[derive(Debug)]
pub struct IterMut<'c, T, I: IndexType = usize> {
    slots: Enumerate<slice::IterMut<'c, Slot<T, I>>>,
    remaining: usize,
}

impl<'c, T, I: IndexType> IterMut<'c, T, I> {
    pub(crate) fn new(slots: &'c mut [Slot<T, I>], len: usize) -> Self {
        Self {
            slots: slots.iter_mut().enumerate(),
            remaining: len,
        }
    }

    fn yielded(&mut self) {
        self.remaining = self
            .remaining
            .checked_sub(1)
            .expect("cannot yield more values than there are occupied slots");
    }
}

impl<'c, T, I: IndexType> Iterator for IterMut<'c, T, I> {
    type Item = (Index<I>, &'c mut T);

    fn next(&mut self) -> Option<Self::Item> {
        let (position, value) = self
            .slots
            .find_map(|(position, slot)| slot.value_mut().map(|value| (position, value)))?;

        self.yielded();
        Some((Index::from_position(position), value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T, I: IndexType> DoubleEndedIterator for IterMut<'_, T, I> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let (position, value) = self
            .slots
            .by_ref()
            .rev()
            .find_map(|(position, slot)| slot.value_mut().map(|value| (position, value)))?;

        self.yielded();
        Some((Index::from_position(position), value))
    }
}

impl<T, I: IndexType> ExactSizeIterator for IterMut<'_, T, I> {}

impl<T, I: IndexType> FusedIterator for IterMut<'_, T, I> {}

/// Owning iterator over the indices and values of a
/// [`CompactContainer`][crate::CompactContainer], in ascending index order.
///
/// Created by the [`IntoIterator`] implementation of the container.
#[derive(Debug)]
pub struct IntoIter<T, I: IndexType = usize> {
    slots: Enumerate<vec::IntoIter<Slot<T, I>>>,
    remaining: usize,
}

impl<T, I: IndexType> IntoIter<T, I> {
    pub(crate) fn new(slots: Vec<Slot<T, I>>, len: usize) -> Self {
        Self {
            slots: slots.into_iter().enumerate(),
            remaining: len,
        }
    }

    fn yielded(&mut self) {
        self.remaining = self
            .remaining
            .checked_sub(1)
            .expect("cannot yield more values than there are occupied slots");
    }
}

impl<T, I: IndexType> Iterator for IntoIter<T, I> {
    type Item = (Index<I>, T);

    fn next(&mut self) -> Option<Self::Item> {
        let (position, value) = self
            .slots
            .find_map(|(position, slot)| slot.into_value().map(|value| (position, value)))?;

        self.yielded();
        Some((Index::from_position(position), value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T, I: IndexType> DoubleEndedIterator for IntoIter<T, I> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let (position, value) = self
            .slots
            .by_ref()
            .rev()
            .find_map(|(position, slot)| slot.into_value().map(|value| (position, value)))?;

        self.yielded();
        Some((Index::from_position(position), value))
    }
}

impl<T, I: IndexType> ExactSizeIterator for IntoIter<T, I> {}

impl<T, I: IndexType> FusedIterator for IntoIter<T, I> {}

/// Iterator over the indices of the occupied slots of a
/// [`CompactContainer`][crate::CompactContainer], in ascending order.
///
/// Created by [`CompactContainer::indices()`][crate::CompactContainer::indices].
#[derive(Debug)]
pub struct Indices<'c, T, I: IndexType = usize> {
    inner: Iter<'c, T, I>,
}

impl<'c, T, I: IndexType> Indices<'c, T, I> {
    pub(crate) fn new(inner: Iter<'c, T, I>) -> Self {
        Self { inner }
    }
}

impl<T, I: IndexType> Clone for Indices<'_, T, I> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, I: IndexType> Iterator for Indices<'_, T, I> {
    type Item = Index<I>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(index, _)| index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, I: IndexType> DoubleEndedIterator for Indices<'_, T, I> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(index, _)| index)
    }
}

impl<T, I: IndexType> ExactSizeIterator for Indices<'_, T, I> {}

impl<T, I: IndexType> FusedIterator for Indices<'_, T, I> {}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use crate::CompactContainer;

    fn sparse() -> CompactContainer<String> {
        let mut container: CompactContainer<String> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(ToString::to_string)
            .collect();
        container.erase(crate::Index::new(1));
        container.erase(crate::Index::new(3));
        container
    }

    #[test]
    fn iter_visits_occupied_in_order() {
        let container = sparse();

        let visited: Vec<_> = container
            .iter()
            .map(|(index, value)| (index.get(), value.as_str()))
            .collect();

        assert_eq!(visited, [(0, "a"), (2, "c"), (4, "e")]);
    }

    #[test]
    fn iter_reversed() {
        let container = sparse();

        let visited: Vec<_> = container.iter().rev().map(|(_, value)| value.as_str()).collect();

        assert_eq!(visited, ["e", "c", "a"]);
    }

    #[test]
    fn iter_from_both_ends_meets_in_middle() {
        let container = sparse();
        let mut iter = container.iter();

        assert_eq!(iter.len(), 3);
        assert_eq!(iter.next().map(|(_, v)| v.as_str()), Some("a"));
        assert_eq!(iter.next_back().map(|(_, v)| v.as_str()), Some("e"));
        assert_eq!(iter.len(), 1);
        assert_eq!(iter.next().map(|(_, v)| v.as_str()), Some("c"));
        assert!(iter.next().is_none());
        assert!(iter.next_back().is_none());
        assert_eq!(iter.len(), 0);
    }

    #[test]
    fn iter_mut_modifies_values() {
        let mut container = sparse();

        for (_, value) in &mut container {
            value.push('!');
        }

        let values: Vec<_> = container.iter().map(|(_, v)| v.clone()).collect();
        assert_eq!(values, ["a!", "c!", "e!"]);
    }

    #[test]
    fn iter_mut_reversed() {
        let mut container = sparse();

        let indices: Vec<_> = container.iter_mut().rev().map(|(i, _)| i.get()).collect();

        assert_eq!(indices, [4, 2, 0]);
    }

    #[test]
    fn into_iter_yields_owned_values() {
        let container = sparse();

        let values: Vec<_> = container.into_iter().collect();

        assert_eq!(values.len(), 3);
        assert_eq!(values[1].0.get(), 2);
        assert_eq!(values[1].1, "c");
    }

    #[test]
    fn into_iter_reversed() {
        let container = sparse();

        let values: Vec<_> = container.into_iter().rev().map(|(_, v)| v).collect();

        assert_eq!(values, ["e", "c", "a"]);
    }

    #[test]
    fn indices_match_iter() {
        let container = sparse();

        let indices: Vec<_> = container.indices().map(crate::Index::get).collect();

        assert_eq!(indices, [0, 2, 4]);
        assert_eq!(container.indices().len(), container.len());
    }

    #[test]
    fn empty_container_iterates_nothing() {
        let container = CompactContainer::<u32>::new();

        assert_eq!(container.iter().next(), None);
        assert_eq!(container.indices().next_back(), None);
    }

    #[test]
    fn for_loop_over_reference() {
        let container = sparse();
        let mut count = 0;

        for (index, value) in &container {
            assert_eq!(&container[index], value);
            count += 1;
        }

        assert_eq!(count, 3);
    }
}
