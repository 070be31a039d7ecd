use super::*;
use crate::source::Measurement;
use std::cell::RefCell;
use std::rc::Rc;
use tabula_core::{EdgeInsets, TableError, DEFAULT_POOL_HEADROOM};
use tabula_physics::{DecelerationRate, InputEvent};

const FRAME: u64 = 16_666_667;

#[derive(Debug, Default)]
struct Cell {
    label: String,
    resets: usize,
}

/// Rows identified by a number; the label of a configured view is `row <id>`.
#[derive(Default)]
struct Rows {
    sections: Vec<Vec<u32>>,
    /// Length reported by `measure_view`; `Some` makes every row self-sizing.
    measured: Option<f32>,
    headers: bool,
    /// Row ids a tap may neither select nor deselect.
    pinned: Vec<u32>,
    /// A tap on the first address selects the second instead.
    redirect: Option<(RowAddress, RowAddress)>,
}

impl TableSource for Rows {
    type View = Cell;

    fn section_count(&self) -> usize {
        self.sections.len()
    }

    fn row_count(&self, section: usize) -> usize {
        self.sections.get(section).map_or(0, Vec::len)
    }

    fn view_kind(&self, _: RowAddress) -> ViewKind {
        ViewKind::new("row")
    }

    fn make_view(&mut self, _: &ViewKind) -> Cell {
        Cell::default()
    }

    fn configure(&mut self, view: &mut Cell, address: RowAddress) {
        view.label = format!("row {}", self.sections[address.section][address.row]);
    }

    fn measure_row(&self, _: RowAddress) -> Measurement {
        match self.measured {
            Some(_) => Measurement::UseEstimate,
            None => Measurement::Exact(50.0),
        }
    }

    fn header_view_kind(&self, _: usize) -> Option<ViewKind> {
        self.headers.then(|| ViewKind::new("header"))
    }

    fn configure_header(&mut self, view: &mut Cell, section: usize) {
        view.label = format!("section {section}");
    }

    fn measure_view(&self, _: &Cell, _: TableItem) -> Option<f32> {
        self.measured
    }

    fn will_select_row(&mut self, address: RowAddress) -> Option<RowAddress> {
        if self.pinned.contains(&self.sections[address.section][address.row]) {
            return None;
        }
        match self.redirect {
            Some((from, to)) if from == address => Some(to),
            _ => Some(address),
        }
    }

    fn will_deselect_row(&mut self, address: RowAddress) -> Option<RowAddress> {
        (!self.pinned.contains(&self.sections[address.section][address.row])).then_some(address)
    }
}

fn column(count: u32) -> Vec<Vec<u32>> {
    vec![(0..count).collect()]
}

fn config() -> TableConfig {
    TableConfig::default()
        .with_row_length(50.0)
        .with_viewport(Size::new(300.0, 200.0))
}

fn build(source: Rows, config: TableConfig) -> TableView<Rows> {
    let mut table = TableView::new(source, config);
    table.register_kind("row", |cell: &mut Cell| {
        cell.label.clear();
        cell.resets += 1;
    });
    table.register_kind("header", |cell: &mut Cell| cell.label.clear());
    table.layout().unwrap();
    table
}

/// A table of exact 50pt rows in a 300x200 viewport.
fn table(sections: Vec<Vec<u32>>) -> TableView<Rows> {
    build(
        Rows {
            sections,
            ..Rows::default()
        },
        config(),
    )
}

fn record(table: &mut TableView<Rows>) -> Rc<RefCell<Vec<TableEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    table.add_listener(move |event| sink.borrow_mut().push(event.clone()));
    events
}

fn labels(table: &TableView<Rows>) -> Vec<String> {
    table
        .visible_views()
        .into_iter()
        .map(|(_, view)| view.label.clone())
        .collect()
}

fn label(table: &TableView<Rows>, section: usize, row: usize) -> String {
    table
        .view_for(RowAddress::new(section, row))
        .map(|view| view.label.clone())
        .unwrap_or_default()
}

fn rows(events: &[TableEvent], pick: fn(&TableEvent) -> bool) -> Vec<usize> {
    events
        .iter()
        .filter(|event| pick(event))
        .filter_map(|event| event.row().map(|address| address.row))
        .collect()
}

#[test]
fn mounts_visible_rows_plus_beyond_bounds() {
    let table = table(column(20));

    assert_eq!(table.visible_addresses().len(), 4);
    assert_eq!(
        labels(&table),
        ["row 0", "row 1", "row 2", "row 3", "row 4", "row 5"]
    );
    let stats = table.pool().stats(&ViewKind::new("row")).unwrap();
    assert_eq!(stats.created, 6);
    assert_eq!(stats.in_use, 6);
}

#[test]
fn scrolling_recycles_views_that_leave() {
    let mut table = table(column(20));
    let events = record(&mut table);

    table.set_content_offset(Point::new(0.0, 500.0), false).unwrap();

    let events = events.borrow();
    assert_eq!(
        rows(&events, |e| matches!(e, TableEvent::DidEndDisplaying { .. })),
        [0, 1, 2, 3, 4, 5]
    );
    assert_eq!(
        rows(&events, |e| matches!(e, TableEvent::WillDisplay { .. })),
        [8, 9, 10, 11, 12, 13, 14, 15]
    );
    let stats = table.pool().stats(&ViewKind::new("row")).unwrap();
    assert_eq!((stats.created, stats.reused), (8, 6));
    assert_eq!(stats.idle, 0);

    let reused = table
        .visible_views()
        .into_iter()
        .filter(|(_, view)| view.resets == 1)
        .count();
    assert_eq!(reused, 6, "recycled views went through the reset hook");
    assert_eq!(label(&table, 0, 10), "row 10");
}

#[test]
fn deleting_first_row_moves_the_rest_up() {
    let mut table = table(column(4));
    assert_eq!(
        table.rect_for(RowAddress::new(0, 1)).unwrap(),
        Rect::new(0.0, 50.0, 300.0, 50.0)
    );
    let events = record(&mut table);

    table.source_mut().sections[0].remove(0);
    let plan = table
        .delete_rows(&[RowAddress::new(0, 0)], RowAnimation::Fade)
        .unwrap()
        .unwrap();

    assert_eq!(plan.deleted_rows.len(), 1);
    assert_eq!(plan.deleted_rows[0].item, RowAddress::new(0, 0));
    assert_eq!(
        table.rect_for(RowAddress::new(0, 0)).unwrap(),
        Rect::new(0.0, 0.0, 300.0, 50.0)
    );
    assert_eq!(label(&table, 0, 0), "row 1");
    assert_eq!(table.physics().content_size().height, 150.0);

    let events = events.borrow();
    assert_eq!(
        events[0],
        TableEvent::DidEndDisplaying {
            item: TableItem::Row(RowAddress::new(0, 0))
        }
    );
    assert!(events
        .iter()
        .any(|event| matches!(event, TableEvent::DidCommitUpdates { .. })));
}

#[test]
fn batched_edits_commit_together() {
    let mut table = table(column(5));

    table.begin_updates();
    assert!(table.end_updates().unwrap().is_none(), "empty batch");

    table.begin_updates();
    table.source_mut().sections[0] = vec![1, 2, 99, 3, 4];
    assert!(table
        .delete_rows(&[RowAddress::new(0, 0)], RowAnimation::Automatic)
        .unwrap()
        .is_none());
    assert!(table
        .insert_rows(&[RowAddress::new(0, 2)], RowAnimation::Automatic)
        .unwrap()
        .is_none());
    assert_eq!(label(&table, 0, 0), "row 0", "nothing applied before commit");

    let plan = table.end_updates().unwrap().unwrap();
    assert_eq!(plan.deleted_rows[0].item, RowAddress::new(0, 0));
    assert_eq!(plan.inserted_rows[0].item, RowAddress::new(0, 2));
    assert_eq!(
        labels(&table),
        ["row 1", "row 2", "row 99", "row 3", "row 4"]
    );
}

#[test]
fn failed_batch_leaves_everything_untouched() {
    let mut table = table(column(4));
    table.select_row(RowAddress::new(0, 1)).unwrap();

    let err = table
        .delete_rows(&[RowAddress::new(0, 9)], RowAnimation::Automatic)
        .unwrap_err();

    assert!(matches!(err, TableError::InconsistentBatch { .. }), "{err}");
    assert_eq!(table.geometry().total_row_count(), 4);
    assert_eq!(labels(&table), ["row 0", "row 1", "row 2", "row 3"]);
    assert_eq!(table.selected_rows(), [RowAddress::new(0, 1)]);
}

#[test]
fn reloaded_row_is_reconfigured_in_place() {
    let mut table = table(column(4));
    let events = record(&mut table);

    table.source_mut().sections[0][1] = 42;
    table
        .reload_rows(&[RowAddress::new(0, 1)], RowAnimation::None)
        .unwrap();

    assert_eq!(label(&table, 0, 1), "row 42");
    let events = events.borrow();
    assert!(rows(&events, |e| matches!(e, TableEvent::DidEndDisplaying { .. })).is_empty());
    assert_eq!(table.pool().stats(&ViewKind::new("row")).unwrap().created, 4);
}

#[test]
fn moved_row_keeps_its_view() {
    let mut table = table(column(4));
    table.source_mut().sections[0] = vec![1, 2, 0, 3];

    let plan = table
        .move_row(RowAddress::new(0, 0), RowAddress::new(0, 2))
        .unwrap()
        .unwrap();

    assert_eq!(plan.moved_rows.len(), 1);
    assert_eq!(labels(&table), ["row 1", "row 2", "row 0", "row 3"]);
    assert_eq!(table.pool().stats(&ViewKind::new("row")).unwrap().created, 4);
}

#[test]
fn section_edits_carry_headers() {
    let mut table = build(
        Rows {
            sections: vec![vec![0, 1], vec![10, 11]],
            headers: true,
            ..Rows::default()
        },
        config().with_header_length(30.0),
    );
    assert_eq!(
        table.header_view(1).map(|view| view.label.as_str()),
        Some("section 1")
    );

    table.source_mut().sections.remove(0);
    table
        .delete_sections(&[0], RowAnimation::Automatic)
        .unwrap()
        .unwrap();

    assert_eq!(table.rect_for_header(0).unwrap(), Rect::new(0.0, 0.0, 300.0, 30.0));
    assert_eq!(label(&table, 0, 0), "row 10");
    assert!(table.header_view(1).is_none());
}

#[test]
fn self_sizing_rows_resolve_once_displayed() {
    let table = build(
        Rows {
            sections: column(20),
            measured: Some(60.0),
            ..Rows::default()
        },
        config().with_estimated_row_length(40.0),
    );

    // Rows 0..=6 were mounted at their 40pt estimate and measured at 60.
    assert!(!table.geometry().is_provisional(TableItem::Row(RowAddress::new(0, 6))).unwrap());
    assert!(table.geometry().is_provisional(TableItem::Row(RowAddress::new(0, 7))).unwrap());
    assert_eq!(table.physics().content_size().height, 7.0 * 60.0 + 13.0 * 40.0);
    assert_eq!(table.visible_addresses().len(), 4);
    assert_eq!(table.content_offset().y, 0.0);
}

#[test]
fn resolving_rows_above_the_viewport_keeps_content_still() {
    let mut table = TableView::new(
        Rows {
            sections: column(20),
            measured: Some(60.0),
            ..Rows::default()
        },
        config().with_estimated_row_length(40.0),
    );
    table.register_kind("row", |_: &mut Cell| {});

    // Row 10 starts at 400 while everything is estimated.
    table.set_content_offset(Point::new(0.0, 400.0), false).unwrap();

    // Rows 8 and 9 grew by 20 each above the viewport.
    let top = table.rect_for(RowAddress::new(0, 10)).unwrap().y;
    assert_eq!(top, 440.0);
    assert_eq!(table.content_offset().y, top);
    assert_eq!(table.visible_addresses()[0], RowAddress::new(0, 10));
}

#[test]
fn measurements_wait_for_zoom_to_end() {
    let mut table = TableView::new(
        Rows {
            sections: column(20),
            measured: Some(60.0),
            ..Rows::default()
        },
        config().with_estimated_row_length(40.0),
    );
    table.register_kind("row", |_: &mut Cell| {});
    let first = TableItem::Row(RowAddress::new(0, 0));

    table
        .handle_input(InputEvent::PinchBegin {
            focus: Point::new(150.0, 100.0),
            time_ms: 0,
        })
        .unwrap();
    assert_eq!(table.physics().gate(), GeometryGate::Defer);
    assert!(table.view_for(RowAddress::new(0, 0)).is_some());
    assert!(table.geometry().is_provisional(first).unwrap());
    assert_eq!(table.physics().content_size().height, 800.0);

    table
        .handle_input(InputEvent::PinchEnd { time_ms: 100 })
        .unwrap();
    assert_eq!(table.physics().gate(), GeometryGate::Immediate);
    assert!(!table.geometry().is_provisional(first).unwrap());
    assert_eq!(table.rect_for(RowAddress::new(0, 1)).unwrap().y, 60.0);
}

#[test]
fn selection_follows_rows_across_edits() {
    let mut table = table(column(5));
    table.select_row(RowAddress::new(0, 2)).unwrap();

    table.source_mut().sections[0].insert(0, 100);
    table
        .insert_rows(&[RowAddress::new(0, 0)], RowAnimation::Automatic)
        .unwrap();
    assert_eq!(table.selected_rows(), [RowAddress::new(0, 3)]);
    assert!(table.is_selected(RowAddress::new(0, 3)));

    table.source_mut().sections[0].remove(3);
    table
        .delete_rows(&[RowAddress::new(0, 3)], RowAnimation::Automatic)
        .unwrap();
    assert!(table.selected_rows().is_empty());
}

fn tap(table: &mut TableView<Rows>, y: f32, time_ms: i64) {
    let position = Point::new(100.0, y);
    table.handle_input(InputEvent::Down { position, time_ms }).unwrap();
    table
        .handle_input(InputEvent::Up {
            position,
            time_ms: time_ms + 50,
        })
        .unwrap();
}

#[test]
fn tap_selects_the_row_under_the_pointer() {
    let mut table = table(column(10));
    let events = record(&mut table);

    tap(&mut table, 120.0, 0);
    tap(&mut table, 170.0, 500);

    assert_eq!(table.selected_rows(), [RowAddress::new(0, 3)]);
    assert_eq!(
        *events.borrow(),
        [
            TableEvent::DidSelectRow {
                address: RowAddress::new(0, 2)
            },
            TableEvent::DidDeselectRow {
                address: RowAddress::new(0, 2)
            },
            TableEvent::DidSelectRow {
                address: RowAddress::new(0, 3)
            },
        ]
    );
}

#[test]
fn multiple_selection_toggles() {
    let mut table = table(column(10));
    table.set_capabilities(Capabilities {
        allows_multiple_selection: true,
        ..Capabilities::default()
    });

    tap(&mut table, 20.0, 0);
    tap(&mut table, 120.0, 500);
    assert_eq!(
        table.selected_rows(),
        [RowAddress::new(0, 0), RowAddress::new(0, 2)]
    );
    tap(&mut table, 20.0, 1_000);
    assert_eq!(table.selected_rows(), [RowAddress::new(0, 2)]);

    table.select_row(RowAddress::new(0, 5)).unwrap();
    table.set_capabilities(Capabilities::default());
    assert_eq!(table.selected_rows(), [RowAddress::new(0, 5)]);

    table.set_capabilities(Capabilities {
        allows_selection: false,
        ..Capabilities::default()
    });
    assert!(table.selected_rows().is_empty());
    tap(&mut table, 20.0, 2_000);
    assert!(table.selected_rows().is_empty());
}

#[test]
fn scroll_to_places_the_row() {
    let mut table = table(column(20));
    let target = RowAddress::new(0, 10);

    table.scroll_to(target, ScrollPosition::Top, false).unwrap();
    assert_eq!(table.content_offset().y, 500.0);
    table.scroll_to(target, ScrollPosition::Middle, false).unwrap();
    assert_eq!(table.content_offset().y, 425.0);
    table.scroll_to(target, ScrollPosition::Bottom, false).unwrap();
    assert_eq!(table.content_offset().y, 350.0);

    // Already fully visible.
    table.scroll_to(target, ScrollPosition::None, false).unwrap();
    assert_eq!(table.content_offset().y, 350.0);
    table
        .scroll_to(RowAddress::new(0, 2), ScrollPosition::None, false)
        .unwrap();
    assert_eq!(table.content_offset().y, 100.0);

    // The last rows cannot reach the top.
    table
        .scroll_to(RowAddress::new(0, 19), ScrollPosition::Top, false)
        .unwrap();
    assert_eq!(table.content_offset().y, 800.0);

    assert!(table
        .scroll_to(RowAddress::new(0, 20), ScrollPosition::Top, false)
        .is_err());
}

#[test]
fn scroll_to_respects_insets() {
    let mut table = table(column(20));
    table
        .physics_mut()
        .set_content_insets(EdgeInsets::vertical(20.0, 10.0));

    table
        .scroll_to(RowAddress::new(0, 10), ScrollPosition::Top, false)
        .unwrap();
    assert_eq!(table.content_offset().y, 480.0);
    table
        .scroll_to(RowAddress::new(0, 0), ScrollPosition::Top, false)
        .unwrap();
    assert_eq!(table.content_offset().y, -20.0);
}

#[test]
fn snapshot_restores_the_anchor_row() {
    let mut table = table(column(20));
    table.set_content_offset(Point::new(0.0, 520.0), false).unwrap();

    let snapshot = table.snapshot();
    assert_eq!(
        snapshot.anchor,
        Some(ScrollAnchor {
            address: RowAddress::new(0, 10),
            offset_in_row: 20.0
        })
    );

    table.set_content_offset(Point::ZERO, false).unwrap();
    table.restore(snapshot).unwrap();
    assert_eq!(table.content_offset().y, 520.0);
    assert_eq!(label(&table, 0, 10), "row 10");
}

#[test]
fn reload_data_keeps_offset_until_content_shrinks() {
    let mut table = table(column(20));
    table.select_row(RowAddress::new(0, 11)).unwrap();
    table.set_content_offset(Point::new(0.0, 520.0), false).unwrap();
    let events = record(&mut table);

    table.source_mut().sections[0][10] = 77;
    table.reload_data().unwrap();
    assert_eq!(table.content_offset().y, 520.0);
    assert_eq!(label(&table, 0, 10), "row 77");
    assert!(table.selected_rows().is_empty());
    assert!(events.borrow().contains(&TableEvent::DidReloadData));

    table.source_mut().sections[0].truncate(5);
    table.reload_data().unwrap();
    assert_eq!(table.content_offset().y, 50.0);
    assert_eq!(table.visible_addresses().len(), 4);
}

#[test]
fn reload_inside_transaction_supersedes_queued_edits() {
    let mut table = table(column(5));

    table.begin_updates();
    table
        .delete_rows(&[RowAddress::new(0, 0)], RowAnimation::Automatic)
        .unwrap();
    table.source_mut().sections[0] = vec![7, 8];
    table.reload_data().unwrap();
    assert_eq!(table.geometry().total_row_count(), 5, "deferred to commit");

    let plan = table.end_updates().unwrap().unwrap();
    assert!(plan.is_empty());
    assert_eq!(labels(&table), ["row 7", "row 8"]);
}

#[test]
fn commit_during_drag_keeps_the_visible_row_in_place() {
    let mut table = table(column(20));
    table.set_content_offset(Point::new(0.0, 500.0), false).unwrap();

    table
        .handle_input(InputEvent::Down {
            position: Point::new(150.0, 150.0),
            time_ms: 0,
        })
        .unwrap();
    table
        .handle_input(InputEvent::Move {
            position: Point::new(150.0, 100.0),
            time_ms: 16,
        })
        .unwrap();
    assert_eq!(table.physics().phase(), ScrollPhase::Dragging);
    let offset = table.content_offset().y;
    let first = table.visible_addresses()[0];
    let first_label = label(&table, first.section, first.row);

    table.source_mut().sections[0].splice(0..0, [100, 101]);
    table
        .insert_rows(
            &[RowAddress::new(0, 0), RowAddress::new(0, 1)],
            RowAnimation::Automatic,
        )
        .unwrap();

    assert_eq!(table.content_offset().y, offset + 100.0);
    assert_eq!(table.physics().phase(), ScrollPhase::Dragging);
    let shifted = table.visible_addresses()[0];
    assert_eq!(shifted.row, first.row + 2);
    assert_eq!(label(&table, shifted.section, shifted.row), first_label);
}

#[test]
fn commit_while_idle_keeps_the_offset() {
    let mut table = table(column(20));
    table.set_content_offset(Point::new(0.0, 500.0), false).unwrap();

    table.source_mut().sections[0].splice(0..0, [100, 101]);
    table
        .insert_rows(
            &[RowAddress::new(0, 0), RowAddress::new(0, 1)],
            RowAnimation::Automatic,
        )
        .unwrap();

    assert_eq!(table.content_offset().y, 500.0);
    assert_eq!(label(&table, 0, 10), "row 8");
}

#[test]
fn unregistered_kind_is_reported() {
    let mut table = TableView::new(
        Rows {
            sections: column(3),
            ..Rows::default()
        },
        config(),
    );
    let err = table.layout().unwrap_err();
    assert!(matches!(err, TableError::UnknownKind { .. }), "{err}");
}

/// Puts a finger down and drags past the slop without moving the content.
fn start_drag(table: &mut TableView<Rows>) {
    table
        .handle_input(InputEvent::Down {
            position: Point::new(150.0, 150.0),
            time_ms: 0,
        })
        .unwrap();
    table
        .handle_input(InputEvent::Move {
            position: Point::new(150.0, 100.0),
            time_ms: 16,
        })
        .unwrap();
    assert_eq!(table.physics().phase(), ScrollPhase::Dragging);
}

fn settle(table: &mut TableView<Rows>, mut now: u64) {
    for _ in 0..2_000 {
        if !table.tick(now).unwrap() {
            return;
        }
        now += FRAME;
    }
    panic!("animation did not settle");
}

#[test]
fn deleting_the_anchor_row_during_a_drag_follows_the_next_survivor() {
    let mut table = table(column(20));
    table.set_content_offset(Point::new(0.0, 500.0), false).unwrap();
    start_drag(&mut table);
    assert_eq!(table.visible_addresses()[0], RowAddress::new(0, 10));

    let doomed: Vec<RowAddress> = (0..=10).map(|row| RowAddress::new(0, row)).collect();
    table.source_mut().sections[0].drain(0..=10);
    table.delete_rows(&doomed, RowAnimation::Automatic).unwrap();

    // Row 11 was 50 below the top of the viewport and is now the first row;
    // the offset would land at -50 and is held at the top bound.
    assert_eq!(table.physics().max_offset().y, 250.0);
    assert_eq!(table.content_offset().y, 0.0);
    assert_eq!(table.physics().phase(), ScrollPhase::Dragging);
    assert_eq!(table.visible_addresses().len(), 4);
    assert_eq!(label(&table, 0, 0), "row 11");
}

#[test]
fn deleting_every_visible_row_during_a_drag_keeps_the_row_above() {
    let mut table = table(column(20));
    table.set_content_offset(Point::new(0.0, 500.0), false).unwrap();
    start_drag(&mut table);

    let doomed: Vec<RowAddress> = (10..=15).map(|row| RowAddress::new(0, row)).collect();
    table.source_mut().sections[0].drain(10..=15);
    table.delete_rows(&doomed, RowAnimation::Automatic).unwrap();

    assert_eq!(table.content_offset().y, 500.0);
    assert_eq!(table.visible_addresses()[0], RowAddress::new(0, 10));
    assert_eq!(label(&table, 0, 10), "row 16");
    assert_eq!(label(&table, 0, 9), "row 9");
}

#[test]
fn reload_onto_shorter_content_during_a_fling_settles_in_bounds() {
    let mut table = table(column(40));
    table.set_content_offset(Point::new(0.0, 1_480.0), false).unwrap();
    // A slow upward flick that would rest near 1380.
    table
        .physics_mut()
        .fling(Point::new(0.0, DecelerationRate::NORMAL.velocity_for_distance(-100.0)));
    assert!(table.tick(0).unwrap());
    assert!(table.tick(FRAME).unwrap());

    table.source_mut().sections[0].truncate(10);
    table.reload_data().unwrap();
    settle(&mut table, 2 * FRAME);

    assert_eq!(table.physics().phase(), ScrollPhase::Idle);
    assert_eq!(table.content_offset().y, 300.0);
    assert_eq!(table.visible_addresses()[0], RowAddress::new(0, 6));
    assert_eq!(label(&table, 0, 9), "row 9");
}

#[test]
fn commit_during_a_fling_onto_shorter_content_settles_in_bounds() {
    let mut table = table(column(40));
    table.set_content_offset(Point::new(0.0, 1_480.0), false).unwrap();
    table
        .physics_mut()
        .fling(Point::new(0.0, DecelerationRate::NORMAL.velocity_for_distance(-100.0)));
    assert!(table.tick(0).unwrap());

    let doomed: Vec<RowAddress> = (10..40).map(|row| RowAddress::new(0, row)).collect();
    table.source_mut().sections[0].truncate(10);
    table.delete_rows(&doomed, RowAnimation::Automatic).unwrap();
    settle(&mut table, FRAME);

    assert_eq!(table.content_offset().y, 300.0);
    assert_eq!(table.visible_addresses().len(), 4);
}

#[test]
fn source_can_veto_or_redirect_a_tap() {
    let mut table = build(
        Rows {
            sections: column(10),
            pinned: vec![1],
            redirect: Some((RowAddress::new(0, 2), RowAddress::new(0, 7))),
            ..Rows::default()
        },
        config(),
    );
    let events = record(&mut table);

    tap(&mut table, 70.0, 0);
    assert!(table.selected_rows().is_empty());
    tap(&mut table, 120.0, 500);
    assert_eq!(table.selected_rows(), [RowAddress::new(0, 7)]);
    assert_eq!(
        *events.borrow(),
        [TableEvent::DidSelectRow {
            address: RowAddress::new(0, 7)
        }]
    );
}

#[test]
fn source_can_keep_a_row_selected() {
    let mut table = build(
        Rows {
            sections: column(10),
            pinned: vec![0],
            ..Rows::default()
        },
        config(),
    );
    table.set_capabilities(Capabilities {
        allows_multiple_selection: true,
        ..Capabilities::default()
    });
    table.select_row(RowAddress::new(0, 0)).unwrap();
    tap(&mut table, 120.0, 0);
    assert_eq!(table.selected_rows(), [RowAddress::new(0, 0), RowAddress::new(0, 2)]);

    tap(&mut table, 20.0, 500);
    tap(&mut table, 120.0, 1_000);
    assert_eq!(table.selected_rows(), [RowAddress::new(0, 0)]);
}

#[test]
fn addresses_in_rect_lists_intersecting_rows() {
    let table = table(column(10));
    assert_eq!(
        table.addresses_in_rect(Rect::new(10.0, 120.0, 50.0, 60.0)),
        [RowAddress::new(0, 2), RowAddress::new(0, 3)]
    );
    assert_eq!(
        table.addresses_in_rect(Rect::new(0.0, 0.0, 300.0, 1_000.0)).len(),
        10
    );
    assert!(table.addresses_in_rect(Rect::new(400.0, 0.0, 50.0, 100.0)).is_empty());
    assert!(table.addresses_in_rect(Rect::new(0.0, 60.0, 300.0, 0.0)).is_empty());
}

#[test]
fn scroll_to_nearest_selected_row_picks_the_closest_one() {
    let mut table = table(column(40));
    assert_eq!(
        table
            .scroll_to_nearest_selected_row(ScrollPosition::Top, false)
            .unwrap(),
        None
    );

    table.select_row(RowAddress::new(0, 12)).unwrap();
    table.set_capabilities(Capabilities {
        allows_multiple_selection: true,
        ..Capabilities::default()
    });
    table.select_row(RowAddress::new(0, 30)).unwrap();
    table.set_content_offset(Point::new(0.0, 1_200.0), false).unwrap();

    let row = table
        .scroll_to_nearest_selected_row(ScrollPosition::Top, false)
        .unwrap();
    assert_eq!(row, Some(RowAddress::new(0, 30)));
    assert_eq!(table.content_offset().y, 1_500.0);

    table.set_content_offset(Point::new(0.0, 700.0), false).unwrap();
    let row = table
        .scroll_to_nearest_selected_row(ScrollPosition::None, false)
        .unwrap();
    assert_eq!(row, Some(RowAddress::new(0, 12)));
    assert_eq!(table.content_offset().y, 600.0);
}

#[test]
fn pool_holds_the_materialized_window_plus_headroom() {
    let mut table = table(column(100));
    let beyond = table.config().beyond_bounds_item_count;
    let mut offset = 0.0;
    while offset <= 4_800.0 {
        table.set_content_offset(Point::new(0.0, offset), false).unwrap();
        let window = 5 + 2 * beyond;
        let stats = table.pool().stats(&ViewKind::new("row")).unwrap();
        assert!(stats.in_use <= window, "{} in use at {offset}", stats.in_use);
        assert!(
            stats.in_use + stats.idle <= window + DEFAULT_POOL_HEADROOM,
            "{stats:?} at {offset}"
        );
        offset += 37.0;
    }
    let created = table.pool().stats(&ViewKind::new("row")).unwrap().created;
    assert!(created <= 5 + 2 * beyond + DEFAULT_POOL_HEADROOM, "{created} created");
}
