use crate::{Index, IndexType};

/// One storage cell of a [`CompactContainer`][crate::CompactContainer].
///
/// A vacant slot is a link in the intrusive free list: it stores the index of the next vacant
/// slot, or [`Index::BOTTOM`] if it is the last one.
#[derive(Clone, Debug)]
pub(crate) enum Slot<T, I: IndexType> {
    Occupied { value: T },

    Vacant { next_free: Index<I> },
}

impl<T, I: IndexType> Slot<T, I> {
    #[must_use]
    pub(crate) fn is_occupied(&self) -> bool {
        matches!(self, Self::Occupied { .. })
    }

    #[must_use]
    pub(crate) fn value(&self) -> Option<&T> {
        match self {
            Self::Occupied { value } => Some(value),
            Self::Vacant { .. } => None,
        }
    }

    #[must_use]
    pub(crate) fn value_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Occupied { value } => Some(value),
            Self::Vacant { .. } => None,
        }
    }

    #[must_use]
    pub(crate) fn into_value(self) -> Option<T> {
        match self {
            Self::Occupied { value } => Some(value),
            Self::Vacant { .. } => None,
        }
    }
}
