//! Batched structural edits.
//!
//! Edits are queued between [`UpdateCoordinator::begin_updates`] and the
//! outermost [`UpdateCoordinator::end_updates`]. Each edit addresses the
//! table as it looks after every earlier edit of the same batch. On commit
//! the batch is replayed against a scratch model of the table; only when the
//! whole batch resolves, and the resulting counts agree with the data source,
//! is the new table swapped in. A failing batch leaves the table untouched.

use smallvec::SmallVec;

use crate::address::{KeyAllocator, RowAddress, RowKey, SectionKey};
use crate::collections::map::HashMap;
use crate::error::{Result, TableError};
use crate::geometry::{GeometryTable, Length, PrefixReuse, RowSlot, SectionSlots, SizeProvider};

/// One structural edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    InsertSection(usize),
    DeleteSection(usize),
    /// `to` is the index in the section list after `from` was removed.
    MoveSection { from: usize, to: usize },
    ReloadSection(usize),
    InsertRow(RowAddress),
    DeleteRow(RowAddress),
    /// `to` is the address in the target section after `from` was removed.
    MoveRow { from: RowAddress, to: RowAddress },
    ReloadRow(RowAddress),
}

impl Edit {
    /// Deletions for `addresses`, all interpreted against the same snapshot.
    pub fn delete_rows(addresses: &[RowAddress]) -> SmallVec<[Edit; 8]> {
        let mut sorted: SmallVec<[RowAddress; 8]> = addresses.iter().copied().collect();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();
        sorted.into_iter().map(Edit::DeleteRow).collect()
    }

    /// Insertions at `addresses`, each naming the row's final position.
    pub fn insert_rows(addresses: &[RowAddress]) -> SmallVec<[Edit; 8]> {
        let mut sorted: SmallVec<[RowAddress; 8]> = addresses.iter().copied().collect();
        sorted.sort_unstable();
        sorted.dedup();
        sorted.into_iter().map(Edit::InsertRow).collect()
    }

    pub fn reload_rows(addresses: &[RowAddress]) -> SmallVec<[Edit; 8]> {
        addresses.iter().copied().map(Edit::ReloadRow).collect()
    }

    pub fn delete_sections(sections: &[usize]) -> SmallVec<[Edit; 8]> {
        let mut sorted: SmallVec<[usize; 8]> = sections.iter().copied().collect();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();
        sorted.into_iter().map(Edit::DeleteSection).collect()
    }

    pub fn insert_sections(sections: &[usize]) -> SmallVec<[Edit; 8]> {
        let mut sorted: SmallVec<[usize; 8]> = sections.iter().copied().collect();
        sorted.sort_unstable();
        sorted.dedup();
        sorted.into_iter().map(Edit::InsertSection).collect()
    }

    pub fn reload_sections(sections: &[usize]) -> SmallVec<[Edit; 8]> {
        sections.iter().copied().map(Edit::ReloadSection).collect()
    }
}

/// How an inserted, deleted or reloaded item should be animated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RowAnimation {
    Fade,
    Right,
    Left,
    Top,
    Bottom,
    None,
    Middle,
    /// Let the presenter pick a style that fits the edit.
    #[default]
    Automatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingEdit {
    pub edit: Edit,
    pub animation: RowAnimation,
}

/// An item of the plan together with its animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Animated<T> {
    pub item: T,
    pub animation: RowAnimation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowMove {
    pub from: RowAddress,
    pub to: RowAddress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionMove {
    pub from: usize,
    pub to: usize,
}

pub type Changes<T> = SmallVec<[T; 4]>;

/// Minimal description of what a commit changed.
///
/// Deletions carry pre-commit coordinates, everything else post-commit
/// coordinates. Rows that only shifted because of other edits are not listed.
/// Rows inside inserted, deleted or reloaded sections are covered by the
/// section entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationPlan {
    pub deleted_sections: Changes<Animated<usize>>,
    pub inserted_sections: Changes<Animated<usize>>,
    pub moved_sections: Changes<SectionMove>,
    pub reloaded_sections: Changes<Animated<usize>>,
    pub deleted_rows: Changes<Animated<RowAddress>>,
    pub inserted_rows: Changes<Animated<RowAddress>>,
    pub moved_rows: Changes<RowMove>,
    pub reloaded_rows: Changes<Animated<RowAddress>>,
}

impl AnimationPlan {
    pub fn is_empty(&self) -> bool {
        self.deleted_sections.is_empty()
            && self.inserted_sections.is_empty()
            && self.moved_sections.is_empty()
            && self.reloaded_sections.is_empty()
            && self.deleted_rows.is_empty()
            && self.inserted_rows.is_empty()
            && self.moved_rows.is_empty()
            && self.reloaded_rows.is_empty()
    }
}

/// Outcome of a successful commit.
#[derive(Debug, Clone, Default)]
pub struct Commit {
    pub plan: AnimationPlan,
    /// The batch was superseded by a reload of all data; the plan is empty and
    /// no row survived.
    pub full_reload: bool,
    /// Rows of sections the batch edited, keyed by their old address.
    relocated: HashMap<RowAddress, RowAddress>,
    /// Row count of each old section carried over unchanged.
    carried: Vec<Option<usize>>,
    section_map: Vec<Option<usize>>,
    removed: Vec<RowKey>,
}

impl Commit {
    /// Post-commit address of the row that was at `old`, if it survived.
    pub fn new_address(&self, old: RowAddress) -> Option<RowAddress> {
        if let Some(Some(rows)) = self.carried.get(old.section) {
            let section = self.new_section(old.section)?;
            return (old.row < *rows).then(|| RowAddress::new(section, old.row));
        }
        self.relocated.get(&old).copied()
    }

    /// Post-commit index of the section that was at `old`, if it survived.
    pub fn new_section(&self, old: usize) -> Option<usize> {
        self.section_map.get(old).copied().flatten()
    }

    /// Identities of every row that did not survive the commit.
    pub fn removed_keys(&self) -> &[RowKey] {
        &self.removed
    }

    /// Surviving rows as `(old, new)` pairs.
    pub fn relocations(&self) -> impl Iterator<Item = (RowAddress, RowAddress)> + '_ {
        let carried = self.carried.iter().enumerate().flat_map(move |(section, rows)| {
            let target = self.new_section(section);
            (0..rows.unwrap_or(0)).filter_map(move |row| {
                target.map(|to| (RowAddress::new(section, row), RowAddress::new(to, row)))
            })
        });
        carried.chain(self.relocated.iter().map(|(old, new)| (*old, *new)))
    }
}

/// Transaction bookkeeping: nesting depth plus the queued edits.
#[derive(Debug, Default)]
pub struct UpdateCoordinator {
    depth: usize,
    pending: Vec<PendingEdit>,
    full_reload: bool,
}

impl UpdateCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_updates(&mut self) {
        self.depth += 1;
        log::trace!("begin_updates (depth {})", self.depth);
    }

    pub fn is_open(&self) -> bool {
        self.depth > 0
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn pending(&self) -> &[PendingEdit] {
        &self.pending
    }

    /// Queues an edit into the open transaction.
    pub fn push(&mut self, edit: Edit, animation: RowAnimation) {
        if self.full_reload {
            log::trace!("{edit:?} absorbed by pending reload");
            return;
        }
        self.pending.push(PendingEdit { edit, animation });
    }

    /// Replaces the queued edits with a reload of all data at commit time.
    /// Edits queued afterwards are absorbed by that reload.
    pub fn request_reload(&mut self) {
        self.pending.clear();
        self.full_reload = true;
    }

    /// Closes one nesting level. The outermost call commits the batch.
    ///
    /// Returns `Ok(None)` for inner levels and for empty batches. On error the
    /// batch is discarded and `table` is unchanged.
    pub fn end_updates(
        &mut self,
        table: &mut GeometryTable,
        provider: &dyn SizeProvider,
    ) -> Result<Option<Commit>> {
        match self.depth {
            0 => {
                log::warn!("end_updates without a matching begin_updates");
                return Ok(None);
            }
            1 => {}
            _ => {
                self.depth -= 1;
                return Ok(None);
            }
        }
        self.depth = 0;
        let edits = std::mem::take(&mut self.pending);

        if std::mem::take(&mut self.full_reload) {
            let removed = table.sections.iter().flat_map(|s| s.rows.iter().map(|row| row.key)).collect();
            let section_map = vec![None; table.section_count()];
            table.reload(provider);
            log::debug!("batch committed as a full reload");
            return Ok(Some(Commit {
                full_reload: true,
                removed,
                section_map,
                ..Commit::default()
            }));
        }
        if edits.is_empty() {
            return Ok(None);
        }

        let mut scratch = Scratch::from_table(table);
        for (position, pending) in edits.iter().enumerate() {
            if let Err(err) = scratch.apply(position, pending) {
                log::warn!("discarding batch of {} edits: {err}", edits.len());
                return Err(err);
            }
        }
        let finished = scratch.finish(provider).map_err(|err| {
            log::warn!("discarding batch of {} edits: {err}", edits.len());
            err
        })?;
        let commit = finished.install(table);
        log::debug!(
            "committed {} edits: {} sections, {} rows",
            edits.len(),
            table.section_count(),
            table.total_row_count()
        );
        Ok(Some(commit))
    }

    /// Commits `edits` as one implicit transaction, or queues them when a
    /// transaction is already open.
    pub fn submit(
        &mut self,
        edits: impl IntoIterator<Item = Edit>,
        animation: RowAnimation,
        table: &mut GeometryTable,
        provider: &dyn SizeProvider,
    ) -> Result<Option<Commit>> {
        self.begin_updates();
        for edit in edits {
            self.push(edit, animation);
        }
        self.end_updates(table, provider)
    }
}

#[derive(Debug, Clone, Copy)]
enum RowOrigin {
    Existing { key: RowKey, from: RowAddress, length: Length },
    Inserted(RowAnimation),
}

#[derive(Debug, Clone, Copy)]
struct ScratchRow {
    origin: RowOrigin,
    moved: bool,
    reloaded: Option<RowAnimation>,
}

#[derive(Debug, Clone, Copy)]
enum SectionOrigin {
    Existing { from: usize },
    Inserted(RowAnimation),
}

/// Rows of a scratch section.
#[derive(Debug)]
enum ScratchRows {
    /// Untouched by the batch; the old rows move over as they are.
    Carried,
    /// Copied out of the table by the first edit naming the section. Rows
    /// before `first_touched` were never changed.
    Edited { rows: Vec<ScratchRow>, first_touched: usize },
    /// Read from the provider at commit.
    FromSource,
}

#[derive(Debug)]
struct ScratchSection {
    origin: SectionOrigin,
    moved: bool,
    reloaded: Option<RowAnimation>,
    rows: ScratchRows,
}

/// Replay target for a batch. Only sections an edit names are copied out of
/// `table`; the rest are carried over at commit without being visited.
#[derive(Debug)]
struct Scratch<'a> {
    table: &'a GeometryTable,
    sections: Vec<ScratchSection>,
    deleted_sections: Changes<Animated<usize>>,
    deleted_rows: Changes<Animated<RowAddress>>,
}

impl<'a> Scratch<'a> {
    fn from_table(table: &'a GeometryTable) -> Self {
        let sections = (0..table.section_count())
            .map(|from| ScratchSection {
                origin: SectionOrigin::Existing { from },
                moved: false,
                reloaded: None,
                rows: ScratchRows::Carried,
            })
            .collect();
        Self {
            table,
            sections,
            deleted_sections: Changes::new(),
            deleted_rows: Changes::new(),
        }
    }

    fn apply(&mut self, position: usize, pending: &PendingEdit) -> Result<()> {
        let animation = pending.animation;
        match pending.edit {
            Edit::InsertSection(section) => {
                if section > self.sections.len() {
                    return Err(TableError::batch(
                        position,
                        format!("cannot insert section {section} into {} sections", self.sections.len()),
                    ));
                }
                self.sections.insert(
                    section,
                    ScratchSection {
                        origin: SectionOrigin::Inserted(animation),
                        moved: false,
                        reloaded: None,
                        rows: ScratchRows::FromSource,
                    },
                );
            }
            Edit::DeleteSection(section) => {
                let removed = self.take_section(position, section)?;
                if let SectionOrigin::Existing { from } = removed.origin {
                    self.deleted_sections.push(Animated { item: from, animation });
                }
                if let ScratchRows::Edited { rows, .. } = removed.rows {
                    self.drop_rows(removed.origin, rows, animation);
                }
            }
            Edit::MoveSection { from, to } => {
                let mut moving = self.take_section(position, from)?;
                if to > self.sections.len() {
                    return Err(TableError::batch(
                        position,
                        format!("cannot move section {from} to {to}"),
                    ));
                }
                moving.moved = true;
                self.sections.insert(to, moving);
            }
            Edit::ReloadSection(section) => {
                let target = self.section_mut(position, section)?;
                let origin = target.origin;
                let rows = std::mem::replace(&mut target.rows, ScratchRows::FromSource);
                if matches!(origin, SectionOrigin::Existing { .. }) {
                    target.reloaded = Some(animation);
                }
                if let ScratchRows::Edited { rows, .. } = rows {
                    self.drop_rows(origin, rows, animation);
                }
            }
            Edit::InsertRow(address) => {
                let rows = self.rows_mut(position, address.section, address.row)?;
                if address.row > rows.len() {
                    return Err(TableError::batch(
                        position,
                        format!("cannot insert row {address}; section has {} rows", rows.len()),
                    ));
                }
                rows.insert(
                    address.row,
                    ScratchRow {
                        origin: RowOrigin::Inserted(animation),
                        moved: false,
                        reloaded: None,
                    },
                );
            }
            Edit::DeleteRow(address) => {
                let removed = self.take_row(position, address)?;
                if let RowOrigin::Existing { from, .. } = removed.origin {
                    self.deleted_rows.push(Animated { item: from, animation });
                }
            }
            Edit::MoveRow { from, to } => {
                let mut moving = self.take_row(position, from)?;
                let rows = self.rows_mut(position, to.section, to.row)?;
                if to.row > rows.len() {
                    return Err(TableError::batch(
                        position,
                        format!("cannot move row {from} to {to}; section has {} rows", rows.len()),
                    ));
                }
                moving.moved = true;
                rows.insert(to.row, moving);
            }
            Edit::ReloadRow(address) => {
                let rows = self.rows_mut(position, address.section, address.row)?;
                let count = rows.len();
                let row = rows.get_mut(address.row).ok_or_else(|| {
                    TableError::batch(position, format!("row {address} does not exist ({count} rows)"))
                })?;
                if matches!(row.origin, RowOrigin::Existing { .. }) {
                    row.reloaded = Some(animation);
                }
            }
        }
        Ok(())
    }

    /// Records rows discarded with their section. Rows that originally lived
    /// in that section are covered by the section entry.
    fn drop_rows(&mut self, section: SectionOrigin, rows: Vec<ScratchRow>, animation: RowAnimation) {
        let home = match section {
            SectionOrigin::Existing { from } => Some(from),
            SectionOrigin::Inserted(_) => None,
        };
        for row in rows {
            if let RowOrigin::Existing { from, .. } = row.origin {
                if Some(from.section) != home {
                    self.deleted_rows.push(Animated { item: from, animation });
                }
            }
        }
    }

    fn section_mut(&mut self, position: usize, section: usize) -> Result<&mut ScratchSection> {
        let count = self.sections.len();
        self.sections.get_mut(section).ok_or_else(|| {
            TableError::batch(position, format!("section {section} does not exist ({count} sections)"))
        })
    }

    fn take_section(&mut self, position: usize, section: usize) -> Result<ScratchSection> {
        self.section_mut(position, section)?;
        Ok(self.sections.remove(section))
    }

    /// Rows of `section`, copied out of the table on first use. `row` is the
    /// first index the caller is about to change.
    fn rows_mut(&mut self, position: usize, section: usize, row: usize) -> Result<&mut Vec<ScratchRow>> {
        let table = self.table;
        let target = self.section_mut(position, section)?;
        if let (ScratchRows::Carried, SectionOrigin::Existing { from }) = (&target.rows, target.origin) {
            let rows: Vec<ScratchRow> = table.sections[from]
                .rows
                .iter()
                .enumerate()
                .map(|(index, slot)| ScratchRow {
                    origin: RowOrigin::Existing {
                        key: slot.key,
                        from: RowAddress::new(from, index),
                        length: slot.length,
                    },
                    moved: false,
                    reloaded: None,
                })
                .collect();
            target.rows = ScratchRows::Edited { rows, first_touched: row };
        }
        match &mut target.rows {
            ScratchRows::Edited { rows, first_touched } => {
                *first_touched = (*first_touched).min(row);
                Ok(rows)
            }
            _ => Err(TableError::batch(
                position,
                format!("section {section} is inserted or reloaded in this batch; its rows come from the data source"),
            )),
        }
    }

    fn take_row(&mut self, position: usize, address: RowAddress) -> Result<ScratchRow> {
        let rows = self.rows_mut(position, address.section, address.row)?;
        if address.row >= rows.len() {
            return Err(TableError::batch(
                position,
                format!("row {address} does not exist ({} rows)", rows.len()),
            ));
        }
        Ok(rows.remove(address.row))
    }

    fn row_count(&self, section: &ScratchSection) -> Option<usize> {
        match (&section.rows, section.origin) {
            (ScratchRows::Carried, SectionOrigin::Existing { from }) => Some(self.table.sections[from].rows.len()),
            (ScratchRows::Edited { rows, .. }, _) => Some(rows.len()),
            _ => None,
        }
    }

    /// Checks the replayed counts against `provider` and lays out the new
    /// sections. The table is not touched until [`Finished::install`].
    fn finish(self, provider: &dyn SizeProvider) -> Result<Finished> {
        let expected_sections = provider.section_count();
        if self.sections.len() != expected_sections {
            return Err(TableError::InconsistentBatch {
                edit: None,
                reason: format!(
                    "batch leaves {} sections but the data source reports {expected_sections}",
                    self.sections.len()
                ),
            });
        }
        for (index, section) in self.sections.iter().enumerate() {
            if let Some(count) = self.row_count(section) {
                let expected = provider.row_count(index);
                if count != expected {
                    return Err(TableError::InconsistentBatch {
                        edit: None,
                        reason: format!(
                            "section {index} has {count} rows after the batch but the data source reports {expected}"
                        ),
                    });
                }
            }
        }

        let table = self.table;
        let mut keys: KeyAllocator = table.keys.clone();
        let mut plan = AnimationPlan {
            deleted_sections: self.deleted_sections,
            deleted_rows: self.deleted_rows,
            ..AnimationPlan::default()
        };
        plan.deleted_sections.sort_unstable_by_key(|entry| entry.item);
        plan.deleted_rows.sort_unstable_by_key(|entry| entry.item);

        let mut section_map = vec![None; table.section_count()];
        let mut carried = vec![None; table.section_count()];
        let mut relocated = HashMap::default();
        let mut layout = Vec::with_capacity(self.sections.len());

        for (index, section) in self.sections.into_iter().enumerate() {
            let (key, header, footer) = match section.origin {
                SectionOrigin::Existing { from } => {
                    section_map[from] = Some(index);
                    if section.moved {
                        plan.moved_sections.push(SectionMove { from, to: index });
                    }
                    let old = &table.sections[from];
                    match section.reloaded {
                        Some(animation) => {
                            plan.reloaded_sections.push(Animated { item: index, animation });
                            (old.key, provider.header_length(index), provider.footer_length(index))
                        }
                        None => (old.key, old.header, old.footer),
                    }
                }
                SectionOrigin::Inserted(animation) => {
                    plan.inserted_sections.push(Animated { item: index, animation });
                    (keys.section(), provider.header_length(index), provider.footer_length(index))
                }
            };

            let rows = match (section.rows, section.origin) {
                (ScratchRows::Carried, SectionOrigin::Existing { from }) => {
                    carried[from] = Some(table.sections[from].rows.len());
                    NewRows::Carried { from }
                }
                (ScratchRows::Edited { rows: scratch_rows, first_touched }, origin) => {
                    let mut rows = Vec::with_capacity(scratch_rows.len());
                    for (row, scratch) in scratch_rows.into_iter().enumerate() {
                        let address = RowAddress::new(index, row);
                        let slot = match scratch.origin {
                            RowOrigin::Existing { key, from, length } => {
                                relocated.insert(from, address);
                                if scratch.moved {
                                    plan.moved_rows.push(RowMove { from, to: address });
                                }
                                let length = match scratch.reloaded {
                                    Some(animation) => {
                                        plan.reloaded_rows.push(Animated { item: address, animation });
                                        provider.row_length(address)
                                    }
                                    None => length,
                                };
                                RowSlot { key, length }
                            }
                            RowOrigin::Inserted(animation) => {
                                plan.inserted_rows.push(Animated { item: address, animation });
                                RowSlot {
                                    key: keys.row(),
                                    length: provider.row_length(address),
                                }
                            }
                        };
                        rows.push(slot);
                    }
                    let reuse = match origin {
                        SectionOrigin::Existing { from } if section.reloaded.is_none() => PrefixReuse::Edited {
                            from,
                            first_row: first_touched,
                        },
                        _ => PrefixReuse::Fresh,
                    };
                    NewRows::Built { rows, reuse }
                }
                _ => {
                    let rows = (0..provider.row_count(index))
                        .map(|row| RowSlot {
                            key: keys.row(),
                            length: provider.row_length(RowAddress::new(index, row)),
                        })
                        .collect();
                    NewRows::Built {
                        rows,
                        reuse: PrefixReuse::Fresh,
                    }
                }
            };
            layout.push(NewSection {
                key,
                header,
                footer,
                rows,
            });
        }

        let mut removed = Vec::new();
        for (section, old) in table.sections.iter().enumerate() {
            if carried[section].is_some() {
                continue;
            }
            for (row, slot) in old.rows.iter().enumerate() {
                if !relocated.contains_key(&RowAddress::new(section, row)) {
                    removed.push(slot.key);
                }
            }
        }

        Ok(Finished {
            layout,
            keys,
            commit: Commit {
                plan,
                full_reload: false,
                relocated,
                carried,
                section_map,
                removed,
            },
        })
    }
}

/// Rows of a section after the batch.
#[derive(Debug)]
enum NewRows {
    Carried { from: usize },
    Built { rows: Vec<RowSlot>, reuse: PrefixReuse },
}

#[derive(Debug)]
struct NewSection {
    key: SectionKey,
    header: Length,
    footer: Length,
    rows: NewRows,
}

/// A validated batch, ready to be swapped into the table it was replayed
/// against.
#[derive(Debug)]
struct Finished {
    layout: Vec<NewSection>,
    keys: KeyAllocator,
    commit: Commit,
}

impl Finished {
    /// Moves carried rows out of the old sections instead of copying them.
    fn install(self, table: &mut GeometryTable) -> Commit {
        let mut old_rows: Vec<Vec<RowSlot>> = table
            .sections
            .iter_mut()
            .map(|section| std::mem::take(&mut section.rows))
            .collect();
        let mut reuse = Vec::with_capacity(self.layout.len());
        let sections = self
            .layout
            .into_iter()
            .map(|section| {
                let rows = match section.rows {
                    NewRows::Carried { from } => {
                        reuse.push(PrefixReuse::Carried { from });
                        old_rows.get_mut(from).map(std::mem::take).unwrap_or_default()
                    }
                    NewRows::Built { rows, reuse: prefix } => {
                        reuse.push(prefix);
                        rows
                    }
                };
                SectionSlots {
                    key: section.key,
                    header: section.header,
                    footer: section.footer,
                    rows,
                }
            })
            .collect();
        table.commit_sections(sections, self.keys, &reuse, &self.commit.removed);
        self.commit
    }
}

#[cfg(test)]
#[path = "tests/updates_tests.rs"]
mod tests;
