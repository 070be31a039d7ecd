//! End-to-end scenarios through the public API: gestures, flings and edits
//! landing while content is in motion.

use std::cell::RefCell;
use std::rc::Rc;

use tabula::{
    InputEvent, Point, RowAddress, RowAnimation, ScrollEvent, ScrollPhase, Size, TableConfig, TableEvent,
    TableSource, TableView, ViewKind,
};

const FRAME: u64 = 16_666_667;

struct Contacts {
    names: Vec<String>,
}

impl Contacts {
    fn new(count: usize) -> Self {
        Self {
            names: (0..count).map(|index| format!("contact {index}")).collect(),
        }
    }
}

impl TableSource for Contacts {
    type View = String;

    fn section_count(&self) -> usize {
        1
    }

    fn row_count(&self, _: usize) -> usize {
        self.names.len()
    }

    fn view_kind(&self, _: RowAddress) -> ViewKind {
        ViewKind::new("contact")
    }

    fn make_view(&mut self, _: &ViewKind) -> String {
        String::new()
    }

    fn configure(&mut self, view: &mut String, address: RowAddress) {
        view.clone_from(&self.names[address.row]);
    }
}

fn contacts(count: usize) -> TableView<Contacts> {
    let config = TableConfig::default()
        .with_row_length(50.0)
        .with_viewport(Size::new(320.0, 400.0));
    let mut table = TableView::new(Contacts::new(count), config);
    table.register_kind("contact", String::clear);
    table.layout().unwrap();
    table
}

/// Mounted rows must be exactly the visible ones plus the beyond-bounds
/// margin, each showing its own contact.
fn assert_views_consistent(table: &TableView<Contacts>) {
    let visible = table.visible_addresses();
    for address in &visible {
        let view = table.view_for(*address).expect("visible row has a view");
        assert_eq!(view, &table.source().names[address.row]);
    }
    let mounted = table.visible_views().len();
    assert!(mounted >= visible.len() && mounted <= visible.len() + 4, "{mounted} views");
}

fn run(table: &mut TableView<Contacts>, start: u64) -> u64 {
    let mut now = start;
    for _ in 0..2_000 {
        let more = table.tick(now).unwrap();
        assert_views_consistent(table);
        if !more {
            return now;
        }
        now += FRAME;
    }
    panic!("fling did not settle");
}

#[test]
fn flick_scrolls_with_momentum_and_recycles() {
    let mut table = contacts(200);
    let scroll_events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&scroll_events);
    table.add_scroll_listener(move |event| sink.borrow_mut().push(*event));

    let mut time_ms = 0;
    table
        .handle_input(InputEvent::Down {
            position: Point::new(160.0, 380.0),
            time_ms,
        })
        .unwrap();
    for step in 1..=6 {
        time_ms += 16;
        table
            .handle_input(InputEvent::Move {
                position: Point::new(160.0, 380.0 - step as f32 * 40.0),
                time_ms,
            })
            .unwrap();
    }
    table
        .handle_input(InputEvent::Up {
            position: Point::new(160.0, 140.0),
            time_ms,
        })
        .unwrap();
    assert_eq!(table.physics().phase(), ScrollPhase::Decelerating);
    let released_at = table.content_offset().y;

    run(&mut table, time_ms as u64 * 1_000_000);

    assert_eq!(table.physics().phase(), ScrollPhase::Idle);
    assert!(table.content_offset().y > released_at);
    assert!(table.content_offset().y <= 200.0 * 50.0 - 400.0);
    let created = table.pool().stats(&ViewKind::new("contact")).unwrap().created;
    assert!(created <= 16, "{created} views created for 200 rows");

    let events = scroll_events.borrow();
    assert!(matches!(events.first(), Some(ScrollEvent::WillBeginDragging { .. })));
    assert!(events
        .iter()
        .any(|event| matches!(event, ScrollEvent::DidEndDecelerating { .. })));
}

#[test]
fn rows_inserted_above_a_fling_do_not_disturb_it() {
    let mut table = contacts(200);
    table.set_content_offset(Point::new(0.0, 2_000.0), false).unwrap();
    table.physics_mut().fling(Point::new(0.0, 3_000.0));

    let mut now = 0;
    for _ in 0..5 {
        assert!(table.tick(now).unwrap());
        now += FRAME;
    }
    let before = table.content_offset().y;
    let first = table.visible_addresses()[0];
    let showing = table.view_for(first).cloned();

    let added: Vec<RowAddress> = (0..3).map(|row| RowAddress::new(0, row)).collect();
    table
        .source_mut()
        .names
        .splice(0..0, ["new 0", "new 1", "new 2"].map(String::from));
    table.insert_rows(&added, RowAnimation::Top).unwrap();

    assert!((table.content_offset().y - (before + 150.0)).abs() < 1e-3);
    assert_eq!(table.physics().phase(), ScrollPhase::Decelerating);
    let shifted = RowAddress::new(0, first.row + 3);
    assert_eq!(table.view_for(shifted).cloned(), showing);

    run(&mut table, now);
    assert!(table.content_offset().y > before + 150.0);
}

#[test]
fn deleting_visible_rows_while_idle_refills_the_viewport() {
    let mut table = contacts(30);
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    table.add_listener(move |event| sink.borrow_mut().push(event.clone()));

    let doomed: Vec<RowAddress> = (2..5).map(|row| RowAddress::new(0, row)).collect();
    table.source_mut().names.drain(2..5);
    let plan = table.delete_rows(&doomed, RowAnimation::Fade).unwrap().unwrap();

    assert_eq!(plan.deleted_rows.len(), 3);
    assert_views_consistent(&table);
    assert_eq!(table.view_for(RowAddress::new(0, 2)).unwrap(), "contact 5");
    let ended: Vec<_> = events
        .borrow()
        .iter()
        .filter_map(|event| match event {
            TableEvent::DidEndDisplaying { item } => item.as_row().map(|address| address.row),
            _ => None,
        })
        .collect();
    assert_eq!(ended, [2, 3, 4]);
}

#[test]
fn snapshot_survives_a_new_table() {
    let mut table = contacts(100);
    table
        .scroll_to(RowAddress::new(0, 40), tabula::ScrollPosition::Top, false)
        .unwrap();
    table
        .set_content_offset(Point::new(0.0, table.content_offset().y + 15.0), false)
        .unwrap();
    let snapshot = table.snapshot();

    let mut restored = contacts(100);
    restored.restore(snapshot).unwrap();
    assert_eq!(restored.content_offset().y, 2_015.0);
    assert_eq!(restored.visible_addresses()[0], RowAddress::new(0, 40));
    assert_views_consistent(&restored);
}
