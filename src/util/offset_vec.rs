use std::fmt;
use std::iter::FromIterator;

/// Elements that occupy a number of logical slots (eg. when used in an [`OffsetVec`])
pub trait Width {
    fn width(&self) -> usize;
}

/// A vector of elements of varying logical "widths", addressed by the running sum of the widths
/// of the preceding elements instead of by element count.
///
/// Class files lean on this layout in two places:
///
///   - the constant pool, where `long` and `double` entries occupy two index slots
///   - local variables, where `long` and `double` values occupy two slots
#[derive(Clone)]
pub struct OffsetVec<T> {
    entries: Vec<(Offset, T)>,
    next_offset: Offset,
    initial_offset: Offset,
}

/// Offset into an [`OffsetVec`]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Offset(pub usize);

/// Outcome of an offset lookup
#[derive(Debug, Eq, PartialEq)]
pub enum OffsetResult<'a, T> {
    /// Offset is the start of this element
    Found(&'a T),

    /// Offset falls inside a multi-slot element (the one starting at the contained offset)
    Reserved(Offset),

    /// Offset is before the first element or past the last one
    OutOfRange,
}

impl<T: Width> OffsetVec<T> {
    pub fn new() -> OffsetVec<T> {
        OffsetVec::new_starting_at(Offset(0))
    }

    pub fn new_starting_at(initial_offset: Offset) -> OffsetVec<T> {
        OffsetVec {
            entries: vec![],
            next_offset: initial_offset,
            initial_offset,
        }
    }

    /// Number of elements (not slots)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Offset one past the final element (equivalently: the offset the next pushed element
    /// would receive)
    pub fn offset_len(&self) -> Offset {
        self.next_offset
    }

    /// Total number of slots occupied
    pub fn slot_len(&self) -> usize {
        self.next_offset.0 - self.initial_offset.0
    }

    /// Append an element and return the offset assigned to it
    pub fn push(&mut self, elem: T) -> Offset {
        let offset = self.next_offset;
        self.next_offset.0 += elem.width();
        self.entries.push((offset, elem));
        offset
    }

    /// Look up an element by its offset
    ///
    /// Offsets are found with a binary search over the element start offsets.
    pub fn get_offset(&self, offset: Offset) -> OffsetResult<'_, T> {
        match self.entries.binary_search_by_key(&offset, |(off, _)| *off) {
            Ok(idx) => OffsetResult::Found(&self.entries[idx].1),
            Err(0) => OffsetResult::OutOfRange,
            Err(_) if offset >= self.next_offset => OffsetResult::OutOfRange,
            Err(idx) => OffsetResult::Reserved(self.entries[idx - 1].0),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Offset, &T)> {
        self.entries.iter().map(|(offset, elem)| (*offset, elem))
    }
}

impl<T: Width> Default for OffsetVec<T> {
    fn default() -> OffsetVec<T> {
        OffsetVec::new()
    }
}

impl<T: PartialEq> PartialEq for OffsetVec<T> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<T: Eq> Eq for OffsetVec<T> {}

impl<T: Width> FromIterator<T> for OffsetVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(elems: I) -> OffsetVec<T> {
        let mut vec = OffsetVec::new();
        for elem in elems {
            vec.push(elem);
        }
        vec
    }
}

impl<T: fmt::Debug> fmt::Debug for OffsetVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for (offset, elem) in &self.entries {
            list.entry(&format_args!("#{} = {:?}", offset.0, elem));
        }
        list.finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Copy, Clone, Eq, PartialEq, Debug)]
    enum Slot {
        Narrow(u8),
        Wide(u8),
    }

    impl Width for Slot {
        fn width(&self) -> usize {
            match self {
                Slot::Narrow(_) => 1,
                Slot::Wide(_) => 2,
            }
        }
    }

    #[test]
    fn offsets_account_for_widths() {
        let slots: OffsetVec<Slot> = vec![
            Slot::Narrow(1),
            Slot::Wide(2),
            Slot::Narrow(3),
            Slot::Wide(4),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            slots.iter().map(|(off, s)| (off, *s)).collect::<Vec<_>>(),
            vec![
                (Offset(0), Slot::Narrow(1)),
                (Offset(1), Slot::Wide(2)),
                (Offset(3), Slot::Narrow(3)),
                (Offset(4), Slot::Wide(4)),
            ]
        );
        assert_eq!(slots.slot_len(), 6);
        assert_eq!(slots.len(), 4);
    }

    #[test]
    fn reserved_and_past_end_offsets() {
        let mut slots: OffsetVec<Slot> = OffsetVec::new_starting_at(Offset(1));
        slots.push(Slot::Narrow(1));
        slots.push(Slot::Wide(2));
        slots.push(Slot::Narrow(3));

        assert_eq!(slots.get_offset(Offset(1)), OffsetResult::Found(&Slot::Narrow(1)));
        assert_eq!(slots.get_offset(Offset(2)), OffsetResult::Found(&Slot::Wide(2)));
        assert_eq!(slots.get_offset(Offset(3)), OffsetResult::Reserved(Offset(2)));
        assert_eq!(slots.get_offset(Offset(4)), OffsetResult::Found(&Slot::Narrow(3)));
        assert_eq!(slots.get_offset(Offset(5)), OffsetResult::OutOfRange);
        assert_eq!(slots.get_offset(Offset(0)), OffsetResult::OutOfRange);
    }
}
