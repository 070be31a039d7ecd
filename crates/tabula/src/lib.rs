//! Tabula: a virtualized, sectioned table.
//!
//! [`TableView`] keeps views only for the rows near the viewport, recycles
//! them by kind, applies batched structural edits atomically and scrolls with
//! momentum, rubber-banding, paging and zoom.

mod config;
mod events;
mod layout;
mod selection;
mod snapshot;
mod source;
mod table_view;

pub use config::{Capabilities, TableConfig, DEFAULT_MEASURE_BUDGET, DEFAULT_ROW_LENGTH};
pub use events::{TableEvent, TableListener, TableListenerId};
pub use snapshot::{ScrollAnchor, ScrollSnapshot};
pub use source::{Measurement, TableSource};
pub use table_view::{ScrollPosition, TableView};

pub use tabula_core;
pub use tabula_core::{
    AnimationPlan, EdgeInsets, Point, Rect, Result, RowAddress, RowAnimation, Size, TableError, TableItem,
    ViewKind,
};
pub use tabula_physics;
pub use tabula_physics::{InputEvent, ScrollConfig, ScrollEvent, ScrollPhase};
