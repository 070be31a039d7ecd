//! The layout pass: decides which items get views, mounts and measures them,
//! and returns the rest to the pool.

use tabula_core::collections::map::HashSet;
use tabula_core::{Point, Result, TableItem, ViewKind};
use tabula_physics::GeometryGate;
use web_time::Instant;

use crate::events::TableEvent;
use crate::source::TableSource;
use crate::table_view::{Mounted, Slot, TableView};

impl<D: TableSource> TableView<D> {
    /// Brings the materialized views in line with the current offset.
    ///
    /// Every operation that moves the viewport or changes geometry ends with
    /// a layout pass, so hosts only call this directly after mutating views
    /// behind the table's back.
    ///
    /// Self-sizing items are measured once they have a view. Resolving an
    /// estimate can pull new items into the viewport, so mounting and
    /// measuring repeat until nothing changes, bounded by
    /// `max_measure_passes` and `measure_budget`.
    pub fn layout(&mut self) -> Result<()> {
        if self.physics.gate() != GeometryGate::Defer {
            self.flush_deferred()?;
        }

        let start = Instant::now();
        let mut pass = 0;
        loop {
            pass += 1;
            let wanted = self.wanted_items();
            self.release_stale(&wanted)?;
            for &(item, slot) in &wanted {
                self.mount(item, slot)?;
            }
            if pass >= self.config.max_measure_passes.max(1) {
                break;
            }
            if start.elapsed() > self.config.measure_budget {
                log::warn!(
                    "layout exceeded its {:?} measure budget after {pass} passes; remaining estimates stay provisional",
                    self.config.measure_budget
                );
                break;
            }
            if !self.measure_provisional(&wanted)? {
                break;
            }
        }

        let discarded = self.pool.trim();
        if discarded > 0 {
            log::trace!("pool trim discarded {discarded} idle views");
        }
        Ok(())
    }

    /// Returns every view outside `wanted` to the pool, in layout order.
    fn release_stale(&mut self, wanted: &[(TableItem, Slot)]) -> Result<()> {
        let keep: HashSet<Slot> = wanted.iter().map(|(_, slot)| *slot).collect();
        let mut stale: Vec<(TableItem, Slot)> = self
            .mounted
            .iter()
            .filter(|(slot, _)| !keep.contains(*slot))
            .map(|(slot, mounted)| (mounted.item, *slot))
            .collect();
        stale.sort_unstable_by_key(|(item, _)| *item);
        for (_, slot) in stale {
            self.unmount(slot)?;
        }
        Ok(())
    }

    /// Items that should have a view: those intersecting the viewport plus
    /// `beyond_bounds_item_count` on each side, in layout order.
    fn wanted_items(&self) -> Vec<(TableItem, Slot)> {
        let visible: Vec<TableItem> = self
            .geometry
            .items_intersecting(self.visible_range())
            .filter(|item| self.has_view(*item))
            .collect();
        let (Some(&first), Some(&last)) = (visible.first(), visible.last()) else {
            return Vec::new();
        };

        let beyond = self.config.beyond_bounds_item_count;
        let mut before = Vec::with_capacity(beyond);
        let mut cursor = first;
        while before.len() < beyond {
            let Some(previous) = self.geometry.previous_item(cursor) else {
                break;
            };
            if self.has_view(previous) {
                before.push(previous);
            }
            cursor = previous;
        }

        let mut items: Vec<TableItem> = before.into_iter().rev().collect();
        items.extend(visible);
        let mut cursor = last;
        let mut after = 0;
        while after < beyond {
            let Some(next) = self.geometry.next_item(cursor) else {
                break;
            };
            if self.has_view(next) {
                items.push(next);
                after += 1;
            }
            cursor = next;
        }

        items
            .into_iter()
            .filter_map(|item| self.slot_of(item).map(|slot| (item, slot)))
            .collect()
    }

    /// Rows always get a view; headers and footers only when the source
    /// names a kind for them and they occupy space.
    fn has_view(&self, item: TableItem) -> bool {
        match item {
            TableItem::Row(_) => true,
            TableItem::Header(section) => {
                self.source.header_view_kind(section).is_some() && self.occupies_space(item)
            }
            TableItem::Footer(section) => {
                self.source.footer_view_kind(section).is_some() && self.occupies_space(item)
            }
        }
    }

    fn occupies_space(&self, item: TableItem) -> bool {
        self.geometry
            .length_of(item)
            .is_ok_and(|length| length.value() > 0.0)
    }

    fn view_kind_of(&self, item: TableItem) -> Option<ViewKind> {
        match item {
            TableItem::Row(address) => Some(self.source.view_kind(address)),
            TableItem::Header(section) => self.source.header_view_kind(section),
            TableItem::Footer(section) => self.source.footer_view_kind(section),
        }
    }

    /// Gives `item` a configured view unless it already has one.
    fn mount(&mut self, item: TableItem, slot: Slot) -> Result<()> {
        if let Some(mounted) = self.mounted.get_mut(&slot) {
            mounted.item = item;
            return Ok(());
        }
        let Some(kind) = self.view_kind_of(item) else {
            return Ok(());
        };
        let mut view = match self.pool.dequeue(&kind)? {
            Some(view) => view,
            None => {
                let fresh = self.source.make_view(&kind);
                self.pool.adopt(&kind, fresh)?
            }
        };
        match item {
            TableItem::Row(address) => self.source.configure(view.view_mut(), address),
            TableItem::Header(section) => self.source.configure_header(view.view_mut(), section),
            TableItem::Footer(section) => self.source.configure_footer(view.view_mut(), section),
        }
        log::trace!("mounted {kind} view for {item} (reuse #{})", view.reuse_count());
        self.mounted.insert(slot, Mounted { item, view });
        self.listeners.emit(TableEvent::WillDisplay { item });
        Ok(())
    }

    /// Measures the provisional items among `wanted`. Returns whether any
    /// extent changed.
    fn measure_provisional(&mut self, wanted: &[(TableItem, Slot)]) -> Result<bool> {
        let defer = self.physics.gate() == GeometryGate::Defer;
        let mut changed = false;
        for &(item, slot) in wanted {
            if !self.geometry.is_provisional(item)? {
                continue;
            }
            let estimate = self.geometry.length_of(item)?.value();
            let measured = self
                .mounted
                .get(&slot)
                .and_then(|mounted| self.source.measure_view(mounted.view.view(), item))
                .unwrap_or(estimate);
            if defer {
                match self.deferred.iter_mut().find(|(pending, _)| *pending == slot) {
                    Some(entry) => entry.1 = measured,
                    None => self.deferred.push((slot, measured)),
                }
                continue;
            }
            changed |= self.resolve(item, measured)?;
        }
        Ok(changed)
    }

    /// Applies measurements held back while zooming.
    fn flush_deferred(&mut self) -> Result<()> {
        if self.deferred.is_empty() {
            return Ok(());
        }
        let deferred = std::mem::take(&mut self.deferred);
        log::debug!("applying {} deferred measurements", deferred.len());
        for (slot, measured) in deferred {
            let item = match slot {
                Slot::Row(key) => self.geometry.address_of_key(key).map(TableItem::Row),
                Slot::Header(key) => self.geometry.section_of_key(key).map(TableItem::Header),
                Slot::Footer(key) => self.geometry.section_of_key(key).map(TableItem::Footer),
            };
            let Some(item) = item else {
                continue;
            };
            if self.geometry.is_provisional(item)? {
                self.resolve(item, measured)?;
            }
        }
        Ok(())
    }

    /// Replaces the estimate of `item`. When the item lies entirely above the
    /// viewport the offset follows, so visible content does not jump.
    fn resolve(&mut self, item: TableItem, measured: f32) -> Result<bool> {
        let before = self.geometry.extent_of(item)?;
        let change = self.geometry.resolve_estimate(item, measured)?;
        if change.delta == 0.0 {
            return Ok(false);
        }
        self.sync_content_size();
        if before.end() <= self.visible_range().start {
            let shift = change.delta * self.physics.zoom_scale();
            self.physics.rebase_offset(Point::new(0.0, shift));
        }
        Ok(true)
    }
}
