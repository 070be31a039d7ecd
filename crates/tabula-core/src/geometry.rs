//! Per-item extent bookkeeping along the scroll axis.
//!
//! Extents are cumulative prefix sums: one running sum of section starts
//! across the table and, per section, one running sum of row starts. Both are
//! materialized lazily. A query for row `r` of section `s` extends the section
//! prefix up to `s` and the row prefix of `s` up to `r`, nothing further, so a
//! table with thousands of rows only pays for the rows that were actually
//! asked about. Each prefix is a vector whose length is the "last valid
//! index"; it only ever grows on queries and is truncated back to the edit
//! point when a length changes.

use std::cell::RefCell;
use std::ops::Range;

use crate::address::{KeyAllocator, RowAddress, RowKey, SectionKey, TableItem};
use crate::collections::map::HashMap;
use crate::error::{Result, TableError};

/// Length of an item along the scroll axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    /// Supplied or measured; authoritative.
    Exact(f32),
    /// Provisional estimate, replaced once the item is measured.
    Estimated(f32),
}

impl Length {
    pub const ZERO: Length = Length::Exact(0.0);

    #[inline]
    pub fn value(self) -> f32 {
        match self {
            Length::Exact(value) | Length::Estimated(value) => value,
        }
    }

    #[inline]
    pub fn is_provisional(self) -> bool {
        matches!(self, Length::Estimated(_))
    }
}

impl Default for Length {
    fn default() -> Self {
        Length::ZERO
    }
}

/// A span along the scroll axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Extent {
    pub offset: f32,
    pub length: f32,
}

impl Extent {
    pub const fn new(offset: f32, length: f32) -> Self {
        Self { offset, length }
    }

    #[inline]
    pub fn end(&self) -> f32 {
        self.offset + self.length
    }

    /// Half-open overlap test. Zero-length extents never overlap anything.
    #[inline]
    pub fn overlaps(&self, range: &Range<f32>) -> bool {
        self.offset < range.end && self.end() > range.start
    }

    #[inline]
    pub fn contains(&self, offset: f32) -> bool {
        offset >= self.offset && offset < self.end()
    }
}

/// Sizing collaborator used to build a table.
pub trait SizeProvider {
    fn section_count(&self) -> usize;

    fn row_count(&self, section: usize) -> usize;

    fn row_length(&self, address: RowAddress) -> Length;

    fn header_length(&self, section: usize) -> Length {
        let _ = section;
        Length::ZERO
    }

    fn footer_length(&self, section: usize) -> Length {
        let _ = section;
        Length::ZERO
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RowSlot {
    pub(crate) key: RowKey,
    pub(crate) length: Length,
}

#[derive(Debug, Clone)]
pub(crate) struct SectionSlots {
    pub(crate) key: SectionKey,
    pub(crate) header: Length,
    pub(crate) footer: Length,
    pub(crate) rows: Vec<RowSlot>,
}

impl SectionSlots {
    fn length_of(&self, item: TableItem) -> Length {
        match item {
            TableItem::Header(_) => self.header,
            TableItem::Footer(_) => self.footer,
            TableItem::Row(address) => self.rows[address.row].length,
        }
    }
}

/// Which materialized prefix of an old section a new section inherits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PrefixReuse {
    /// Same rows and lengths as old section `from`.
    Carried { from: usize },
    /// Old section `from` with rows before `first_row` untouched.
    Edited { from: usize, first_row: usize },
    /// Nothing carries over.
    Fresh,
}

#[derive(Debug, Clone, Default)]
struct SectionPrefix {
    /// `row_starts[i]` is the start of row `i` relative to the section start.
    /// Entry `rows.len()` (when present) is the footer start.
    row_starts: Vec<f32>,
    length: Option<f32>,
}

#[derive(Debug, Clone, Default)]
struct PrefixCache {
    /// `section_starts[i]` is the absolute start of section `i`. Entry
    /// `sections.len()` (when present) is the end of the last section.
    section_starts: Vec<f32>,
    sections: Vec<SectionPrefix>,
}

impl PrefixCache {
    fn new(section_count: usize) -> Self {
        Self {
            section_starts: Vec::new(),
            sections: vec![SectionPrefix::default(); section_count],
        }
    }

    fn section_length(&mut self, sections: &[SectionSlots], section: usize) -> f32 {
        if let Some(length) = self.sections[section].length {
            return length;
        }
        let slots = &sections[section];
        let rows: f32 = slots.rows.iter().map(|row| row.length.value()).sum();
        let length = slots.header.value() + rows + slots.footer.value();
        self.sections[section].length = Some(length);
        length
    }

    fn section_start(&mut self, sections: &[SectionSlots], table_header: f32, section: usize) -> f32 {
        while self.section_starts.len() <= section {
            let next = self.section_starts.len();
            let start = if next == 0 {
                table_header
            } else {
                let previous = self.section_starts[next - 1];
                previous + self.section_length(sections, next - 1)
            };
            self.section_starts.push(start);
        }
        self.section_starts[section]
    }

    fn row_start(&mut self, sections: &[SectionSlots], section: usize, row: usize) -> f32 {
        let slots = &sections[section];
        let prefix = &mut self.sections[section];
        while prefix.row_starts.len() <= row {
            let next = prefix.row_starts.len();
            let start = if next == 0 {
                slots.header.value()
            } else {
                prefix.row_starts[next - 1] + slots.rows[next - 1].length.value()
            };
            prefix.row_starts.push(start);
        }
        prefix.row_starts[row]
    }

    fn invalidate_after(&mut self, item: TableItem) {
        let section = item.section();
        let prefix = &mut self.sections[section];
        match item {
            TableItem::Header(_) => prefix.row_starts.clear(),
            TableItem::Row(address) => prefix.row_starts.truncate(address.row + 1),
            TableItem::Footer(_) => {}
        }
        prefix.length = None;
        self.section_starts.truncate(section + 1);
    }
}

/// Extent bookkeeping for every section, row, header and footer.
///
/// Not safe for concurrent use: lazily extended prefixes live behind a
/// `RefCell` so that queries can take `&self`.
#[derive(Debug)]
pub struct GeometryTable {
    pub(crate) sections: Vec<SectionSlots>,
    table_header: Length,
    table_footer: Length,
    pub(crate) keys: KeyAllocator,
    cache: RefCell<PrefixCache>,
    key_index: RefCell<Option<HashMap<RowKey, RowAddress>>>,
}

impl Default for GeometryTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for GeometryTable {
    fn clone(&self) -> Self {
        Self {
            sections: self.sections.clone(),
            table_header: self.table_header,
            table_footer: self.table_footer,
            keys: self.keys.clone(),
            cache: RefCell::new(self.cache.borrow().clone()),
            key_index: RefCell::new(None),
        }
    }
}

impl GeometryTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::from_parts(Vec::new(), Length::ZERO, Length::ZERO, KeyAllocator::default())
    }

    /// Builds a table from a sizing collaborator.
    pub fn from_provider(provider: &dyn SizeProvider) -> Self {
        let mut table = Self::new();
        table.reload(provider);
        table
    }

    pub(crate) fn from_parts(
        sections: Vec<SectionSlots>,
        table_header: Length,
        table_footer: Length,
        keys: KeyAllocator,
    ) -> Self {
        let cache = PrefixCache::new(sections.len());
        Self {
            sections,
            table_header,
            table_footer,
            keys,
            cache: RefCell::new(cache),
            key_index: RefCell::new(None),
        }
    }

    /// Replaces every section with fresh ones read from `provider`.
    ///
    /// All rows and sections get new identities; table header and footer are
    /// kept.
    pub fn reload(&mut self, provider: &dyn SizeProvider) {
        let mut keys = self.keys.clone();
        let sections = (0..provider.section_count())
            .map(|section| read_section(provider, section, &mut keys))
            .collect();
        *self = Self::from_parts(sections, self.table_header, self.table_footer, keys);
    }

    /// Swaps in the sections produced by a committed batch.
    ///
    /// `reuse` has one entry per new section and says which materialized
    /// prefix survives. Section starts stay valid up to the first section
    /// that is not carried over in place. The key index, when built, is
    /// patched for `removed` keys and for rows whose address changed.
    pub(crate) fn commit_sections(
        &mut self,
        sections: Vec<SectionSlots>,
        keys: KeyAllocator,
        reuse: &[PrefixReuse],
        removed: &[RowKey],
    ) {
        debug_assert_eq!(sections.len(), reuse.len());
        let in_place = |index: usize, reuse: &PrefixReuse| matches!(reuse, PrefixReuse::Carried { from } if *from == index);

        let cache = self.cache.get_mut();
        let stable = reuse
            .iter()
            .enumerate()
            .take_while(|(index, reuse)| in_place(*index, *reuse))
            .count();
        cache.section_starts.truncate(stable + 1);
        let mut old = std::mem::take(&mut cache.sections);
        let mut take = |from: usize| old.get_mut(from).map(std::mem::take).unwrap_or_default();
        cache.sections = reuse
            .iter()
            .map(|reuse| match *reuse {
                PrefixReuse::Carried { from } => take(from),
                PrefixReuse::Edited { from, first_row } => {
                    let mut prefix = take(from);
                    prefix.row_starts.truncate(first_row + 1);
                    prefix.length = None;
                    prefix
                }
                PrefixReuse::Fresh => SectionPrefix::default(),
            })
            .collect();

        if let Some(index) = self.key_index.get_mut() {
            for key in removed {
                index.remove(key);
            }
            for (section, (slots, reuse)) in sections.iter().zip(reuse).enumerate() {
                if in_place(section, reuse) {
                    continue;
                }
                for (row, slot) in slots.rows.iter().enumerate() {
                    index.insert(slot.key, RowAddress::new(section, row));
                }
            }
        }

        log::trace!("commit kept {stable} section starts of {}", sections.len());
        self.sections = sections;
        self.keys = keys;
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn row_count(&self, section: usize) -> Result<usize> {
        Ok(self.section(section)?.rows.len())
    }

    pub fn total_row_count(&self) -> usize {
        self.sections.iter().map(|section| section.rows.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_row_count() == 0
    }

    /// Total length along the scroll axis, table header and footer included.
    pub fn content_length(&self) -> f32 {
        self.sections_end() + self.table_footer.value()
    }

    pub fn table_header_extent(&self) -> Extent {
        Extent::new(0.0, self.table_header.value())
    }

    pub fn table_footer_extent(&self) -> Extent {
        Extent::new(self.sections_end(), self.table_footer.value())
    }

    pub fn set_table_header_length(&mut self, length: Length) {
        self.table_header = length;
        self.cache.get_mut().section_starts.clear();
    }

    pub fn set_table_footer_length(&mut self, length: Length) {
        self.table_footer = length;
    }

    pub fn rect_for(&self, address: RowAddress) -> Result<Extent> {
        self.extent_of(TableItem::Row(address))
    }

    pub fn rect_for_header(&self, section: usize) -> Result<Extent> {
        self.extent_of(TableItem::Header(section))
    }

    pub fn rect_for_footer(&self, section: usize) -> Result<Extent> {
        self.extent_of(TableItem::Footer(section))
    }

    /// Extent of a whole section: header, rows and footer.
    pub fn rect_for_section(&self, section: usize) -> Result<Extent> {
        self.section(section)?;
        let mut cache = self.cache.borrow_mut();
        let start = cache.section_start(&self.sections, self.table_header.value(), section);
        let length = cache.section_length(&self.sections, section);
        Ok(Extent::new(start, length))
    }

    /// Extent of any item.
    pub fn extent_of(&self, item: TableItem) -> Result<Extent> {
        let length = self.length_of(item)?.value();
        let section = item.section();
        let mut cache = self.cache.borrow_mut();
        let start = cache.section_start(&self.sections, self.table_header.value(), section);
        let relative = match item {
            TableItem::Header(_) => 0.0,
            TableItem::Row(address) => cache.row_start(&self.sections, section, address.row),
            TableItem::Footer(_) => {
                let rows = self.sections[section].rows.len();
                cache.row_start(&self.sections, section, rows)
            }
        };
        Ok(Extent::new(start + relative, length))
    }

    pub fn length_of(&self, item: TableItem) -> Result<Length> {
        let section = self.section(item.section())?;
        if let TableItem::Row(address) = item {
            if address.row >= section.rows.len() {
                return Err(TableError::row_out_of_range(address.row, section.rows.len()));
            }
        }
        Ok(section.length_of(item))
    }

    pub fn is_provisional(&self, item: TableItem) -> Result<bool> {
        Ok(self.length_of(item)?.is_provisional())
    }

    pub fn row_key(&self, address: RowAddress) -> Result<RowKey> {
        let section = self.section(address.section)?;
        section
            .rows
            .get(address.row)
            .map(|row| row.key)
            .ok_or_else(|| TableError::row_out_of_range(address.row, section.rows.len()))
    }

    pub fn section_key(&self, section: usize) -> Result<SectionKey> {
        Ok(self.section(section)?.key)
    }

    /// Current address of the row with the given identity.
    pub fn address_of_key(&self, key: RowKey) -> Option<RowAddress> {
        let mut index = self.key_index.borrow_mut();
        let index = index.get_or_insert_with(|| {
            let mut map = HashMap::default();
            for (section, slots) in self.sections.iter().enumerate() {
                for (row, slot) in slots.rows.iter().enumerate() {
                    map.insert(slot.key, RowAddress::new(section, row));
                }
            }
            map
        });
        index.get(&key).copied()
    }

    pub fn section_of_key(&self, key: SectionKey) -> Option<usize> {
        self.sections.iter().position(|section| section.key == key)
    }

    /// Item whose extent contains `offset`, headers and footers included.
    pub fn item_at_offset(&self, offset: f32) -> Option<TableItem> {
        let section = self.locate_section(offset)?;
        let mut cache = self.cache.borrow_mut();
        let start = cache.section_start(&self.sections, self.table_header.value(), section);
        let relative = offset - start;
        let slots = &self.sections[section];
        if relative < slots.header.value() {
            return Some(TableItem::Header(section));
        }

        let rows = slots.rows.len();
        let prefix = &cache.sections[section].row_starts;
        let known = prefix.partition_point(|row_start| *row_start <= relative);
        let mut candidate = known.saturating_sub(1);
        if known == prefix.len() {
            // Past the materialized prefix: extend row by row.
            while candidate < rows {
                let next = cache.row_start(&self.sections, section, candidate + 1);
                if next > relative {
                    break;
                }
                candidate += 1;
            }
        }
        if candidate >= rows {
            return Some(TableItem::Footer(section));
        }
        Some(TableItem::Row(RowAddress::new(section, candidate)))
    }

    /// Row containing `offset`, or `None` if the offset falls before the
    /// first row, past the last, or inside a header or footer.
    pub fn address_at_offset(&self, offset: f32) -> Option<RowAddress> {
        self.item_at_offset(offset).and_then(|item| item.as_row())
    }

    /// Items overlapping `range`, in layout order.
    pub fn items_intersecting(&self, range: Range<f32>) -> ItemsIntersecting<'_> {
        let first = if range.start >= range.end {
            None
        } else if range.start < self.first_section_start() {
            self.first_item()
        } else {
            self.item_at_offset(range.start)
        };
        ItemsIntersecting {
            table: self,
            range,
            next: first,
        }
    }

    /// Row addresses overlapping `range`, ordered by address.
    pub fn addresses_intersecting(&self, range: Range<f32>) -> AddressesIntersecting<'_> {
        AddressesIntersecting {
            items: self.items_intersecting(range),
        }
    }

    /// Replaces the length of `item` with a measured, authoritative one.
    ///
    /// A non-finite or negative measurement keeps the current length.
    pub fn resolve_estimate(&mut self, item: TableItem, measured: f32) -> Result<ExtentChange> {
        let current = self.length_of(item)?;
        if !measured.is_finite() || measured < 0.0 {
            log::warn!("ignoring invalid measurement {measured} for {item}");
            return Ok(ExtentChange::unchanged(item));
        }

        let slots = &mut self.sections[item.section()];
        let slot = match item {
            TableItem::Header(_) => &mut slots.header,
            TableItem::Footer(_) => &mut slots.footer,
            TableItem::Row(address) => &mut slots.rows[address.row].length,
        };
        *slot = Length::Exact(measured);

        let delta = measured - current.value();
        if delta == 0.0 {
            return Ok(ExtentChange::unchanged(item));
        }
        self.cache.get_mut().invalidate_after(item);
        log::trace!("resolved {item}: {} -> {measured} (delta {delta})", current.value());
        Ok(ExtentChange { item, delta })
    }

    /// Item following `item` in layout order.
    pub fn next_item(&self, item: TableItem) -> Option<TableItem> {
        match item {
            TableItem::Header(section) => {
                if self.sections.get(section)?.rows.is_empty() {
                    Some(TableItem::Footer(section))
                } else {
                    Some(TableItem::Row(RowAddress::new(section, 0)))
                }
            }
            TableItem::Row(address) => {
                let rows = self.sections.get(address.section)?.rows.len();
                if address.row + 1 < rows {
                    Some(TableItem::Row(RowAddress::new(address.section, address.row + 1)))
                } else {
                    Some(TableItem::Footer(address.section))
                }
            }
            TableItem::Footer(section) => {
                (section + 1 < self.sections.len()).then_some(TableItem::Header(section + 1))
            }
        }
    }

    /// Item preceding `item` in layout order.
    pub fn previous_item(&self, item: TableItem) -> Option<TableItem> {
        match item {
            TableItem::Header(section) => {
                let previous = section.checked_sub(1)?;
                self.sections.get(previous).map(|_| TableItem::Footer(previous))
            }
            TableItem::Row(address) => Some(match address.row.checked_sub(1) {
                Some(row) => TableItem::Row(RowAddress::new(address.section, row)),
                None => TableItem::Header(address.section),
            }),
            TableItem::Footer(section) => {
                let rows = self.sections.get(section)?.rows.len();
                Some(match rows.checked_sub(1) {
                    Some(row) => TableItem::Row(RowAddress::new(section, row)),
                    None => TableItem::Header(section),
                })
            }
        }
    }

    pub fn first_item(&self) -> Option<TableItem> {
        (!self.sections.is_empty()).then_some(TableItem::Header(0))
    }

    fn section(&self, section: usize) -> Result<&SectionSlots> {
        self.sections
            .get(section)
            .ok_or_else(|| TableError::section_out_of_range(section, self.sections.len()))
    }

    fn first_section_start(&self) -> f32 {
        self.table_header.value()
    }

    fn sections_end(&self) -> f32 {
        self.cache.borrow_mut().section_start(
            &self.sections,
            self.table_header.value(),
            self.sections.len(),
        )
    }

    fn locate_section(&self, offset: f32) -> Option<usize> {
        let count = self.sections.len();
        if count == 0 || offset < self.first_section_start() {
            return None;
        }
        let mut cache = self.cache.borrow_mut();
        let header = self.table_header.value();
        // Extend the section prefix just far enough to pass `offset`.
        loop {
            let known = cache.section_starts.len();
            if known > count || (known > 0 && cache.section_starts[known - 1] > offset) {
                break;
            }
            cache.section_start(&self.sections, header, known);
        }
        let index = cache
            .section_starts
            .partition_point(|start| *start <= offset)
            .checked_sub(1)?;
        (index < count).then_some(index)
    }

    #[cfg(test)]
    pub(crate) fn materialized_rows(&self, section: usize) -> usize {
        self.cache.borrow().sections[section].row_starts.len()
    }

    #[cfg(test)]
    pub(crate) fn materialized_sections(&self) -> usize {
        self.cache.borrow().section_starts.len()
    }
}

fn read_section(provider: &dyn SizeProvider, section: usize, keys: &mut KeyAllocator) -> SectionSlots {
    let rows = (0..provider.row_count(section))
        .map(|row| RowSlot {
            key: keys.row(),
            length: provider.row_length(RowAddress::new(section, row)),
        })
        .collect();
    SectionSlots {
        key: keys.section(),
        header: provider.header_length(section),
        footer: provider.footer_length(section),
        rows,
    }
}

/// Result of [`GeometryTable::resolve_estimate`]: the resized item plus every
/// item after it in layout order, all shifted by `delta`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtentChange {
    pub item: TableItem,
    pub delta: f32,
}

impl ExtentChange {
    fn unchanged(item: TableItem) -> Self {
        Self { item, delta: 0.0 }
    }

    pub fn is_empty(&self) -> bool {
        self.delta == 0.0
    }

    /// Whether `other`'s extent changed.
    pub fn contains(&self, other: TableItem) -> bool {
        !self.is_empty() && other >= self.item
    }

    /// The changed items, in layout order.
    pub fn items<'a>(&self, table: &'a GeometryTable) -> impl Iterator<Item = TableItem> + 'a {
        let first = (!self.is_empty()).then_some(self.item);
        std::iter::successors(first, move |item| table.next_item(*item))
    }
}

/// Iterator returned by [`GeometryTable::items_intersecting`].
///
/// Cloning restarts from the current position.
#[derive(Debug, Clone)]
pub struct ItemsIntersecting<'a> {
    table: &'a GeometryTable,
    range: Range<f32>,
    next: Option<TableItem>,
}

impl Iterator for ItemsIntersecting<'_> {
    type Item = TableItem;

    fn next(&mut self) -> Option<TableItem> {
        while let Some(item) = self.next {
            let extent = self.table.extent_of(item).ok()?;
            if extent.offset >= self.range.end {
                self.next = None;
                return None;
            }
            self.next = self.table.next_item(item);
            if extent.overlaps(&self.range) {
                return Some(item);
            }
        }
        None
    }
}

/// Iterator returned by [`GeometryTable::addresses_intersecting`].
#[derive(Debug, Clone)]
pub struct AddressesIntersecting<'a> {
    items: ItemsIntersecting<'a>,
}

impl Iterator for AddressesIntersecting<'_> {
    type Item = RowAddress;

    fn next(&mut self) -> Option<RowAddress> {
        self.items.by_ref().find_map(|item| item.as_row())
    }
}

/// Sizes held in memory; handy for hosts with static layouts and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSizes {
    pub sections: Vec<StaticSection>,
}

#[derive(Debug, Clone, Default)]
pub struct StaticSection {
    pub header: Length,
    pub footer: Length,
    pub rows: Vec<Length>,
}

impl StaticSizes {
    /// One section per entry of `row_counts`, every row `row_length` long.
    pub fn uniform(row_counts: &[usize], row_length: f32) -> Self {
        let sections = row_counts
            .iter()
            .map(|count| StaticSection {
                rows: vec![Length::Exact(row_length); *count],
                ..StaticSection::default()
            })
            .collect();
        Self { sections }
    }

    pub fn with_section(mut self, section: StaticSection) -> Self {
        self.sections.push(section);
        self
    }
}

impl StaticSection {
    pub fn new(rows: Vec<Length>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn with_header(mut self, header: Length) -> Self {
        self.header = header;
        self
    }

    pub fn with_footer(mut self, footer: Length) -> Self {
        self.footer = footer;
        self
    }
}

impl SizeProvider for StaticSizes {
    fn section_count(&self) -> usize {
        self.sections.len()
    }

    fn row_count(&self, section: usize) -> usize {
        self.sections.get(section).map_or(0, |s| s.rows.len())
    }

    fn row_length(&self, address: RowAddress) -> Length {
        self.sections
            .get(address.section)
            .and_then(|s| s.rows.get(address.row))
            .copied()
            .unwrap_or_default()
    }

    fn header_length(&self, section: usize) -> Length {
        self.sections.get(section).map_or(Length::ZERO, |s| s.header)
    }

    fn footer_length(&self, section: usize) -> Length {
        self.sections.get(section).map_or(Length::ZERO, |s| s.footer)
    }
}
