//! Addresses and identities for table items.
//!
//! A [`RowAddress`] is a coordinate into one geometry snapshot and is
//! invalidated by every structural edit. [`RowKey`] and [`SectionKey`] are the
//! stable identities that survive commits; the update coordinator maps keys to
//! their new addresses after each batch.

use std::fmt;

/// Coordinate of a row inside one geometry snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RowAddress {
    pub section: usize,
    pub row: usize,
}

impl RowAddress {
    #[inline]
    pub const fn new(section: usize, row: usize) -> Self {
        Self { section, row }
    }
}

impl fmt::Display for RowAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.section, self.row)
    }
}

impl From<(usize, usize)> for RowAddress {
    fn from((section, row): (usize, usize)) -> Self {
        Self::new(section, row)
    }
}

/// Any item that occupies an extent along the scroll axis.
///
/// Ordering follows layout order: a section's header sorts before its rows,
/// its footer after them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableItem {
    Header(usize),
    Row(RowAddress),
    Footer(usize),
}

impl TableItem {
    pub fn section(&self) -> usize {
        match *self {
            TableItem::Header(section) | TableItem::Footer(section) => section,
            TableItem::Row(address) => address.section,
        }
    }

    pub fn as_row(&self) -> Option<RowAddress> {
        match *self {
            TableItem::Row(address) => Some(address),
            _ => None,
        }
    }

    fn layout_rank(&self) -> (usize, u8, usize) {
        match *self {
            TableItem::Header(section) => (section, 0, 0),
            TableItem::Row(address) => (address.section, 1, address.row),
            TableItem::Footer(section) => (section, 2, 0),
        }
    }
}

impl PartialOrd for TableItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TableItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.layout_rank().cmp(&other.layout_rank())
    }
}

impl fmt::Display for TableItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableItem::Header(section) => write!(f, "header {section}"),
            TableItem::Row(address) => write!(f, "row {address}"),
            TableItem::Footer(section) => write!(f, "footer {section}"),
        }
    }
}

/// Stable identity of a row across commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey(pub u64);

/// Stable identity of a section across commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionKey(pub u64);

/// Monotonic source of fresh keys, shared by a table and its scratch copies.
#[derive(Debug, Clone, Default)]
pub(crate) struct KeyAllocator {
    next: u64,
}

impl KeyAllocator {
    pub(crate) fn row(&mut self) -> RowKey {
        self.next += 1;
        RowKey(self.next)
    }

    pub(crate) fn section(&mut self) -> SectionKey {
        self.next += 1;
        SectionKey(self.next)
    }
}
