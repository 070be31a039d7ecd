//! The table view: data source, geometry, view pool, update batching and
//! scroll physics composed into one surface.

use std::fmt;
use std::ops::Range;

use smallvec::SmallVec;
use tabula_core::collections::map::HashMap;
use tabula_core::{
    AnimationPlan, Commit, Edit, GeometryTable, Length, Point, Rect, RecyclePool, Result, RowAddress,
    RowAnimation, RowKey, SectionKey, Size, TableItem, UpdateCoordinator, ViewKind,
};
use tabula_physics::{GeometryGate, InputEvent, ListenerId, ScrollConfig, ScrollEvent, ScrollPhase, ScrollPhysics};

use crate::config::{Capabilities, TableConfig};
use crate::events::{TableEvent, TableListenerId, TableListeners};
use crate::selection::Selection;
use crate::snapshot::{ScrollAnchor, ScrollSnapshot};
use crate::source::{SourceSizes, TableSource};

/// Where [`TableView::scroll_to`] places the row in the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollPosition {
    /// Scroll the least distance that makes the row fully visible.
    #[default]
    None,
    Top,
    Middle,
    Bottom,
}

/// Identity of a materialized item; survives commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Slot {
    Row(RowKey),
    Header(SectionKey),
    Footer(SectionKey),
}

pub(crate) struct Mounted<V> {
    pub(crate) item: TableItem,
    pub(crate) view: tabula_core::Recycled<V>,
}

/// Rows around the viewport before a commit, used to keep the visible
/// content in place when some of them are removed.
#[derive(Debug, Clone, Default)]
struct Anchor {
    /// Visible rows and the ones materialized after them, with their tops.
    following: SmallVec<[(RowKey, f32); 8]>,
    /// Rows above the viewport, nearest first, with their ends.
    preceding: SmallVec<[(RowKey, f32); 4]>,
    in_bounds: bool,
}

/// A virtualized table.
///
/// Only the rows intersecting the viewport (plus a few beyond each edge) have
/// views; they are lent from a [`RecyclePool`] and go back to it when they
/// scroll out or are removed. Structural edits are batched through an
/// [`UpdateCoordinator`]; a failing batch leaves geometry, views and
/// selection untouched.
pub struct TableView<D: TableSource> {
    pub(crate) source: D,
    pub(crate) config: TableConfig,
    capabilities: Capabilities,
    pub(crate) geometry: GeometryTable,
    pub(crate) pool: RecyclePool<D::View>,
    updates: UpdateCoordinator,
    pub(crate) physics: ScrollPhysics,
    pub(crate) mounted: HashMap<Slot, Mounted<D::View>>,
    selection: Selection,
    /// Measurements held back while zooming.
    pub(crate) deferred: Vec<(Slot, f32)>,
    pub(crate) listeners: TableListeners,
}

impl<D: TableSource> fmt::Debug for TableView<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableView")
            .field("sections", &self.geometry.section_count())
            .field("rows", &self.geometry.total_row_count())
            .field("mounted", &self.mounted.len())
            .field("phase", &self.physics.phase())
            .field("offset", &self.physics.offset())
            .finish()
    }
}

impl<D: TableSource> TableView<D> {
    pub fn new(source: D, config: TableConfig) -> Self {
        Self::with_scroll_config(source, config, ScrollConfig::default())
    }

    pub fn with_scroll_config(source: D, config: TableConfig, scroll: ScrollConfig) -> Self {
        let mut geometry = GeometryTable::from_provider(&SourceSizes::new(&source, &config));
        geometry.set_table_header_length(Length::Exact(config.table_header_length.max(0.0)));
        geometry.set_table_footer_length(Length::Exact(config.table_footer_length.max(0.0)));

        let capabilities = Capabilities::default();
        let mut physics = ScrollPhysics::new(scroll);
        physics.set_behavior(capabilities.scroll_behavior());
        physics.set_viewport(config.viewport);

        let mut table = Self {
            pool: RecyclePool::with_config(config.pool),
            source,
            config,
            capabilities,
            geometry,
            updates: UpdateCoordinator::new(),
            physics,
            mounted: HashMap::default(),
            selection: Selection::default(),
            deferred: Vec::new(),
            listeners: TableListeners::default(),
        };
        table.sync_content_size();
        table
    }

    pub fn source(&self) -> &D {
        &self.source
    }

    /// Mutable access to the data. Follow changes with the matching
    /// structural edits or [`reload_data`](Self::reload_data).
    pub fn source_mut(&mut self) -> &mut D {
        &mut self.source
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn geometry(&self) -> &GeometryTable {
        &self.geometry
    }

    pub fn pool(&self) -> &RecyclePool<D::View> {
        &self.pool
    }

    pub fn physics(&self) -> &ScrollPhysics {
        &self.physics
    }

    /// Direct access to the scroll surface (zoom bounds, insets, tuning).
    pub fn physics_mut(&mut self) -> &mut ScrollPhysics {
        &mut self.physics
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn set_capabilities(&mut self, capabilities: Capabilities) {
        self.capabilities = capabilities;
        self.physics.set_behavior(capabilities.scroll_behavior());
        if !capabilities.allows_selection {
            self.selection.clear();
        } else if !capabilities.allows_multiple_selection {
            self.selection.keep_latest();
        }
    }

    /// Declares a view kind and the hook that clears a view before reuse.
    pub fn register_kind(&mut self, kind: impl Into<ViewKind>, reset: impl FnMut(&mut D::View) + 'static) {
        self.pool.register(kind, reset);
    }

    pub fn set_viewport(&mut self, viewport: Size) -> Result<()> {
        self.config.viewport = viewport;
        self.physics.set_viewport(viewport);
        self.sync_content_size();
        self.layout()
    }

    pub fn add_listener(&mut self, mut listener: impl FnMut(&TableEvent) + 'static) -> TableListenerId {
        self.listeners.add(move |event: &mut TableEvent| listener(&*event))
    }

    pub fn remove_listener(&mut self, id: TableListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn add_scroll_listener(&mut self, listener: impl FnMut(&mut ScrollEvent) + 'static) -> ListenerId {
        self.physics.add_listener(listener)
    }

    pub fn remove_scroll_listener(&mut self, id: ListenerId) -> bool {
        self.physics.remove_listener(id)
    }

    // Structural edits.

    pub fn begin_updates(&mut self) {
        self.updates.begin_updates();
    }

    /// Closes one transaction level; the outermost call commits.
    ///
    /// Returns the animation plan of the commit, or `None` for inner levels
    /// and empty batches.
    pub fn end_updates(&mut self) -> Result<Option<AnimationPlan>> {
        let anchor = self.capture_anchor();
        let sizes = SourceSizes::new(&self.source, &self.config);
        match self.updates.end_updates(&mut self.geometry, &sizes)? {
            Some(commit) => self.apply_commit(commit, anchor).map(Some),
            None => Ok(None),
        }
    }

    pub fn insert_sections(&mut self, sections: &[usize], animation: RowAnimation) -> Result<Option<AnimationPlan>> {
        self.submit(Edit::insert_sections(sections), animation)
    }

    pub fn delete_sections(&mut self, sections: &[usize], animation: RowAnimation) -> Result<Option<AnimationPlan>> {
        self.submit(Edit::delete_sections(sections), animation)
    }

    pub fn reload_sections(&mut self, sections: &[usize], animation: RowAnimation) -> Result<Option<AnimationPlan>> {
        self.submit(Edit::reload_sections(sections), animation)
    }

    pub fn move_section(&mut self, from: usize, to: usize) -> Result<Option<AnimationPlan>> {
        self.submit([Edit::MoveSection { from, to }], RowAnimation::None)
    }

    pub fn insert_rows(&mut self, rows: &[RowAddress], animation: RowAnimation) -> Result<Option<AnimationPlan>> {
        self.submit(Edit::insert_rows(rows), animation)
    }

    pub fn delete_rows(&mut self, rows: &[RowAddress], animation: RowAnimation) -> Result<Option<AnimationPlan>> {
        self.submit(Edit::delete_rows(rows), animation)
    }

    pub fn reload_rows(&mut self, rows: &[RowAddress], animation: RowAnimation) -> Result<Option<AnimationPlan>> {
        self.submit(Edit::reload_rows(rows), animation)
    }

    pub fn move_row(&mut self, from: RowAddress, to: RowAddress) -> Result<Option<AnimationPlan>> {
        self.submit([Edit::MoveRow { from, to }], RowAnimation::None)
    }

    /// Rebuilds the table from the source. Inside an open transaction the
    /// reload replaces the queued edits and happens at commit.
    pub fn reload_data(&mut self) -> Result<()> {
        if self.updates.is_open() {
            self.updates.request_reload();
            return Ok(());
        }
        self.geometry.reload(&SourceSizes::new(&self.source, &self.config));
        log::debug!(
            "reloaded data: {} sections, {} rows",
            self.geometry.section_count(),
            self.geometry.total_row_count()
        );
        self.after_reload()
    }

    fn submit(&mut self, edits: impl IntoIterator<Item = Edit>, animation: RowAnimation) -> Result<Option<AnimationPlan>> {
        let anchor = self.capture_anchor();
        let sizes = SourceSizes::new(&self.source, &self.config);
        match self.updates.submit(edits, animation, &mut self.geometry, &sizes)? {
            Some(commit) => self.apply_commit(commit, anchor).map(Some),
            None => Ok(None),
        }
    }

    fn apply_commit(&mut self, commit: Commit, anchor: Option<Anchor>) -> Result<AnimationPlan> {
        if commit.full_reload {
            self.after_reload()?;
            return Ok(commit.plan);
        }

        // Views of rows and sections that did not survive go back to the pool.
        let mut gone: Vec<(TableItem, Slot)> = self
            .mounted
            .iter()
            .filter(|(slot, _)| match slot {
                Slot::Row(key) => self.geometry.address_of_key(*key).is_none(),
                Slot::Header(key) | Slot::Footer(key) => self.geometry.section_of_key(*key).is_none(),
            })
            .map(|(slot, mounted)| (mounted.item, *slot))
            .collect();
        gone.sort_unstable_by_key(|(item, _)| *item);
        for (_, slot) in gone {
            self.unmount(slot)?;
        }

        // Survivors follow their rows.
        for (slot, mounted) in self.mounted.iter_mut() {
            let moved = match *slot {
                Slot::Row(key) => self.geometry.address_of_key(key).map(TableItem::Row),
                Slot::Header(key) => self.geometry.section_of_key(key).map(TableItem::Header),
                Slot::Footer(key) => self.geometry.section_of_key(key).map(TableItem::Footer),
            };
            if let Some(item) = moved {
                mounted.item = item;
            }
        }

        for entry in &commit.plan.reloaded_rows {
            self.reconfigure(TableItem::Row(entry.item))?;
        }
        for entry in &commit.plan.reloaded_sections {
            self.reconfigure(TableItem::Header(entry.item))?;
            self.reconfigure(TableItem::Footer(entry.item))?;
        }

        let geometry = &self.geometry;
        self.selection.retain(|key| geometry.address_of_key(key).is_some());
        self.deferred.retain(|(slot, _)| match slot {
            Slot::Row(key) => geometry.address_of_key(*key).is_some(),
            Slot::Header(key) | Slot::Footer(key) => geometry.section_of_key(*key).is_some(),
        });

        self.sync_content_size();
        if let Some(anchor) = &anchor {
            self.restore_anchor(anchor)?;
        }
        self.physics.constrain();

        self.listeners.emit(TableEvent::DidCommitUpdates {
            plan: commit.plan.clone(),
        });
        self.layout()?;
        Ok(commit.plan)
    }

    fn after_reload(&mut self) -> Result<()> {
        let mut all: Vec<(TableItem, Slot)> = self.mounted.iter().map(|(slot, mounted)| (mounted.item, *slot)).collect();
        all.sort_unstable_by_key(|(item, _)| *item);
        for (_, slot) in all {
            self.unmount(slot)?;
        }
        self.selection.clear();
        self.deferred.clear();
        self.sync_content_size();
        self.physics.constrain();
        self.listeners.emit(TableEvent::DidReloadData);
        self.layout()
    }

    /// Re-runs `configure` on the mounted view of `item`. A view whose kind no
    /// longer matches goes back to the pool and is replaced by the next layout.
    fn reconfigure(&mut self, item: TableItem) -> Result<()> {
        let Some(slot) = self.slot_of(item) else {
            return Ok(());
        };
        let Some(mounted) = self.mounted.get_mut(&slot) else {
            return Ok(());
        };
        let kind = match item {
            TableItem::Row(address) => Some(self.source.view_kind(address)),
            TableItem::Header(section) => self.source.header_view_kind(section),
            TableItem::Footer(section) => self.source.footer_view_kind(section),
        };
        if kind.as_ref() != Some(mounted.view.kind()) {
            return self.unmount(slot);
        }
        match item {
            TableItem::Row(address) => self.source.configure(mounted.view.view_mut(), address),
            TableItem::Header(section) => self.source.configure_header(mounted.view.view_mut(), section),
            TableItem::Footer(section) => self.source.configure_footer(mounted.view.view_mut(), section),
        }
        Ok(())
    }

    fn capture_anchor(&self) -> Option<Anchor> {
        if self.physics.gate() != GeometryGate::RebaseOffset {
            return None;
        }
        let geometry = &self.geometry;
        let visible: SmallVec<[RowAddress; 8]> = geometry.addresses_intersecting(self.visible_range()).collect();
        let (first, last) = (*visible.first()?, *visible.last()?);
        let beyond = self.config.beyond_bounds_item_count;
        let rows_from = |start: RowAddress, step: fn(&GeometryTable, TableItem) -> Option<TableItem>| {
            std::iter::successors(Some(TableItem::Row(start)), move |item| step(geometry, *item))
                .skip(1)
                .filter_map(|item| item.as_row())
                .take(beyond.max(1))
        };

        let mut anchor = Anchor {
            in_bounds: !self.physics.is_out_of_bounds(),
            ..Anchor::default()
        };
        for address in visible.iter().copied().chain(rows_from(last, GeometryTable::next_item)) {
            let key = geometry.row_key(address).ok()?;
            anchor.following.push((key, geometry.rect_for(address).ok()?.offset));
        }
        for address in rows_from(first, GeometryTable::previous_item) {
            let key = geometry.row_key(address).ok()?;
            anchor.preceding.push((key, geometry.rect_for(address).ok()?.end()));
        }
        Some(anchor)
    }

    /// Shifts the offset by however far the anchored content moved: the
    /// first surviving row from the top of the viewport down, or failing
    /// that the nearest surviving row above it.
    fn restore_anchor(&mut self, anchor: &Anchor) -> Result<()> {
        let mut delta = None;
        for (key, top) in &anchor.following {
            if let Some(address) = self.geometry.address_of_key(*key) {
                delta = Some(self.geometry.rect_for(address)?.offset - top);
                break;
            }
        }
        if delta.is_none() {
            for (key, end) in &anchor.preceding {
                if let Some(address) = self.geometry.address_of_key(*key) {
                    delta = Some(self.geometry.rect_for(address)?.end() - end);
                    break;
                }
            }
        }
        match delta {
            Some(delta) if delta != 0.0 => {
                let delta = delta * self.physics.zoom_scale();
                log::debug!("commit moved the anchored rows by {delta}; rebasing offset");
                self.physics.rebase_offset(Point::new(0.0, delta));
            }
            Some(_) => {}
            None => log::debug!("no anchored row survived the commit"),
        }

        // The rubber band belongs to the finger, not to the commit.
        if anchor.in_bounds && self.physics.is_dragging() {
            let offset = self.physics.offset();
            let clamped = self.physics.clamp_offset(offset);
            if clamped != offset {
                self.physics.set_content_offset(clamped, false);
            }
        }
        Ok(())
    }

    // Input and animation.

    /// Feeds pointer input to the scroll surface. A tap selects the row
    /// under it.
    pub fn handle_input(&mut self, event: InputEvent) -> Result<()> {
        let tap = self.physics.phase() == ScrollPhase::Tracking;
        self.physics.handle(event);
        if let InputEvent::Up { position, .. } = event {
            if tap {
                self.tap(position);
            }
        }
        self.layout()
    }

    /// Advances scroll animations to `frame_nanos` and re-lays out. Returns
    /// whether another frame is needed.
    pub fn tick(&mut self, frame_nanos: u64) -> Result<bool> {
        let animating = self.physics.tick(frame_nanos);
        self.layout()?;
        Ok(animating)
    }

    /// Selects (or, with multiple selection, toggles) the row under
    /// `position`, after the source had its say through
    /// [`TableSource::will_select_row`] and [`TableSource::will_deselect_row`].
    fn tap(&mut self, position: Point) {
        if !self.capabilities.allows_selection {
            return;
        }
        let Some(address) = self.address_at(position) else {
            return;
        };
        let Ok(key) = self.geometry.row_key(address) else {
            return;
        };
        if self.capabilities.allows_multiple_selection && self.selection.contains(key) {
            let Some(target) = self.source.will_deselect_row(address) else {
                log::trace!("source kept {address} selected");
                return;
            };
            let Ok(target_key) = self.geometry.row_key(target) else {
                log::warn!("will_deselect_row redirected to missing row {target}");
                return;
            };
            if self.selection.remove(target_key) {
                self.listeners.emit(TableEvent::DidDeselectRow { address: target });
            }
            return;
        }
        let Some(target) = self.source.will_select_row(address) else {
            log::trace!("source declined selecting {address}");
            return;
        };
        match self.geometry.row_key(target) {
            Ok(target_key) => self.select(target_key, target, true),
            Err(err) => log::warn!("will_select_row redirected to {target}: {err}"),
        }
    }

    // Programmatic scrolling.

    pub fn content_offset(&self) -> Point {
        self.physics.offset()
    }

    pub fn zoom_scale(&self) -> f32 {
        self.physics.zoom_scale()
    }

    pub fn set_content_offset(&mut self, offset: Point, animated: bool) -> Result<()> {
        self.physics.set_content_offset(offset, animated);
        self.layout()
    }

    /// Scrolls so that `address` sits at `position` in the viewport.
    pub fn scroll_to(&mut self, address: RowAddress, position: ScrollPosition, animated: bool) -> Result<()> {
        let extent = self.geometry.rect_for(address)?;
        let zoom = self.physics.zoom_scale();
        let viewport = self.config.viewport.height;
        let insets = self.physics.insets();
        let (start, end) = (extent.offset * zoom, extent.end() * zoom);
        let current = self.physics.offset();
        let y = match position {
            ScrollPosition::Top => start - insets.top,
            ScrollPosition::Middle => (start + end) / 2.0 - viewport / 2.0,
            ScrollPosition::Bottom => end - viewport + insets.bottom,
            ScrollPosition::None => {
                if start < current.y + insets.top {
                    start - insets.top
                } else if end > current.y + viewport - insets.bottom {
                    end - viewport + insets.bottom
                } else {
                    current.y
                }
            }
        };
        let target = self.physics.clamp_offset(Point::new(current.x, y));
        log::trace!("scroll_to {address} ({position:?}) -> {target:?}");
        if target != current {
            self.physics.set_content_offset(target, animated);
        }
        self.layout()
    }

    /// Scrolls the selected row nearest to `position` in the viewport there.
    /// Returns the row, or `None` when nothing is selected.
    pub fn scroll_to_nearest_selected_row(
        &mut self,
        position: ScrollPosition,
        animated: bool,
    ) -> Result<Option<RowAddress>> {
        let range = self.visible_range();
        let reference = match position {
            ScrollPosition::Top | ScrollPosition::None => range.start,
            ScrollPosition::Middle => (range.start + range.end) / 2.0,
            ScrollPosition::Bottom => range.end,
        };
        let mut nearest: Option<(f32, RowAddress)> = None;
        for address in self.selected_rows() {
            let extent = self.geometry.rect_for(address)?;
            let distance = match position {
                ScrollPosition::None if extent.overlaps(&range) => 0.0,
                ScrollPosition::None => (extent.offset - range.start).abs().min((extent.end() - range.end).abs()),
                _ => (extent.offset + extent.length / 2.0 - reference).abs(),
            };
            if nearest.map_or(true, |(best, _)| distance < best) {
                nearest = Some((distance, address));
            }
        }
        let Some((_, address)) = nearest else {
            return Ok(None);
        };
        self.scroll_to(address, position, animated)?;
        Ok(Some(address))
    }

    /// Animates to the top. Returns `false` when scroll-to-top is disabled.
    pub fn scroll_to_top(&mut self) -> Result<bool> {
        let started = self.physics.scroll_to_top();
        self.layout()?;
        Ok(started)
    }

    pub fn set_zoom_scale(&mut self, scale: f32, animated: bool) -> Result<()> {
        self.physics.set_zoom_scale(scale, animated);
        self.layout()
    }

    // Queries.

    /// Visible range along the scroll axis, unscaled content coordinates.
    pub fn visible_range(&self) -> Range<f32> {
        let rect = self.physics.visible_content_rect();
        rect.y..rect.y + rect.height
    }

    /// Rows intersecting the viewport, in order.
    pub fn visible_addresses(&self) -> Vec<RowAddress> {
        self.geometry.addresses_intersecting(self.visible_range()).collect()
    }

    /// Rows whose frames intersect `rect` (unscaled content coordinates),
    /// in order.
    pub fn addresses_in_rect(&self, rect: Rect) -> Vec<RowAddress> {
        let width = self.config.viewport.width;
        if rect.width <= 0.0 || rect.height <= 0.0 || rect.x >= width || rect.x + rect.width <= 0.0 {
            return Vec::new();
        }
        self.geometry
            .addresses_intersecting(rect.y..rect.y + rect.height)
            .collect()
    }

    /// Row under `point` (viewport coordinates).
    pub fn address_at(&self, point: Point) -> Option<RowAddress> {
        let y = (self.physics.offset().y + point.y) / self.physics.zoom_scale();
        self.geometry.address_at_offset(y)
    }

    /// Frame of a row in unscaled content coordinates.
    pub fn rect_for(&self, address: RowAddress) -> Result<Rect> {
        let extent = self.geometry.rect_for(address)?;
        Ok(Rect::new(0.0, extent.offset, self.config.viewport.width, extent.length))
    }

    pub fn rect_for_section(&self, section: usize) -> Result<Rect> {
        let extent = self.geometry.rect_for_section(section)?;
        Ok(Rect::new(0.0, extent.offset, self.config.viewport.width, extent.length))
    }

    pub fn rect_for_header(&self, section: usize) -> Result<Rect> {
        let extent = self.geometry.rect_for_header(section)?;
        Ok(Rect::new(0.0, extent.offset, self.config.viewport.width, extent.length))
    }

    pub fn rect_for_footer(&self, section: usize) -> Result<Rect> {
        let extent = self.geometry.rect_for_footer(section)?;
        Ok(Rect::new(0.0, extent.offset, self.config.viewport.width, extent.length))
    }

    /// The view currently presenting `address`, if it is materialized.
    pub fn view_for(&self, address: RowAddress) -> Option<&D::View> {
        let key = self.geometry.row_key(address).ok()?;
        self.mounted.get(&Slot::Row(key)).map(|mounted| mounted.view.view())
    }

    pub fn view_for_mut(&mut self, address: RowAddress) -> Option<&mut D::View> {
        let key = self.geometry.row_key(address).ok()?;
        self.mounted
            .get_mut(&Slot::Row(key))
            .map(|mounted| mounted.view.view_mut())
    }

    pub fn header_view(&self, section: usize) -> Option<&D::View> {
        let key = self.geometry.section_key(section).ok()?;
        self.mounted.get(&Slot::Header(key)).map(|mounted| mounted.view.view())
    }

    pub fn footer_view(&self, section: usize) -> Option<&D::View> {
        let key = self.geometry.section_key(section).ok()?;
        self.mounted.get(&Slot::Footer(key)).map(|mounted| mounted.view.view())
    }

    /// Every materialized view in layout order.
    pub fn visible_views(&self) -> Vec<(TableItem, &D::View)> {
        let mut views: Vec<_> = self
            .mounted
            .values()
            .map(|mounted| (mounted.item, mounted.view.view()))
            .collect();
        views.sort_unstable_by_key(|(item, _)| *item);
        views
    }

    // Selection.

    pub fn select_row(&mut self, address: RowAddress) -> Result<()> {
        let key = self.geometry.row_key(address)?;
        if self.capabilities.allows_selection {
            self.select(key, address, false);
        }
        Ok(())
    }

    pub fn deselect_row(&mut self, address: RowAddress) -> Result<bool> {
        let key = self.geometry.row_key(address)?;
        Ok(self.selection.remove(key))
    }

    pub fn is_selected(&self, address: RowAddress) -> bool {
        self.geometry
            .row_key(address)
            .is_ok_and(|key| self.selection.contains(key))
    }

    /// Selected rows in address order.
    pub fn selected_rows(&self) -> Vec<RowAddress> {
        let mut rows: Vec<_> = self
            .selection
            .keys()
            .iter()
            .filter_map(|key| self.geometry.address_of_key(*key))
            .collect();
        rows.sort_unstable();
        rows
    }

    fn select(&mut self, key: RowKey, address: RowAddress, notify: bool) {
        let replaced = self
            .selection
            .insert(key, self.capabilities.allows_multiple_selection);
        if !notify {
            return;
        }
        for previous in replaced {
            if let Some(previous) = self.geometry.address_of_key(previous) {
                self.listeners.emit(TableEvent::DidDeselectRow { address: previous });
            }
        }
        self.listeners.emit(TableEvent::DidSelectRow { address });
    }

    // Persistence.

    pub fn snapshot(&self) -> ScrollSnapshot {
        let range = self.visible_range();
        let anchor = self
            .geometry
            .addresses_intersecting(range.clone())
            .next()
            .and_then(|address| {
                let extent = self.geometry.rect_for(address).ok()?;
                Some(ScrollAnchor {
                    address,
                    offset_in_row: range.start - extent.offset,
                })
            });
        ScrollSnapshot {
            offset: self.physics.offset(),
            zoom_scale: self.physics.zoom_scale(),
            anchor,
        }
    }

    /// Returns to a saved position. An anchor that no longer resolves falls
    /// back to the raw offset.
    pub fn restore(&mut self, snapshot: ScrollSnapshot) -> Result<()> {
        self.physics.set_zoom_scale(snapshot.zoom_scale, false);
        let zoom = self.physics.zoom_scale();
        let offset = match snapshot.anchor {
            Some(anchor) => match self.geometry.rect_for(anchor.address) {
                Ok(extent) => Point::new(snapshot.offset.x, (extent.offset + anchor.offset_in_row) * zoom),
                Err(err) => {
                    log::debug!("snapshot anchor no longer resolves: {err}");
                    snapshot.offset
                }
            },
            None => snapshot.offset,
        };
        let offset = self.physics.clamp_offset(offset);
        self.physics.set_content_offset(offset, false);
        self.layout()
    }

    // Shared helpers.

    pub(crate) fn slot_of(&self, item: TableItem) -> Option<Slot> {
        match item {
            TableItem::Row(address) => self.geometry.row_key(address).ok().map(Slot::Row),
            TableItem::Header(section) => self.geometry.section_key(section).ok().map(Slot::Header),
            TableItem::Footer(section) => self.geometry.section_key(section).ok().map(Slot::Footer),
        }
    }

    pub(crate) fn sync_content_size(&mut self) {
        let size = Size::new(self.config.viewport.width, self.geometry.content_length());
        self.physics.set_content_size(size);
    }

    /// Returns the view of `slot` to the pool.
    pub(crate) fn unmount(&mut self, slot: Slot) -> Result<()> {
        let Some(mounted) = self.mounted.remove(&slot) else {
            return Ok(());
        };
        let item = mounted.item;
        self.pool.enqueue(mounted.view)?;
        log::trace!("recycled view of {item}");
        self.listeners.emit(TableEvent::DidEndDisplaying { item });
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/table_view_tests.rs"]
mod tests;
