use tabula_core::{Point, RowAddress};

/// Scroll position a host can persist and hand back to
/// [`TableView::restore`](crate::TableView::restore).
///
/// The anchor pins the position to a row so that a restore lands on the same
/// content even when row lengths were estimated differently.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollSnapshot {
    pub offset: Point,
    pub zoom_scale: f32,
    pub anchor: Option<ScrollAnchor>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollAnchor {
    /// First row intersecting the viewport.
    pub address: RowAddress,
    /// Distance from the row's top to the viewport top, unscaled.
    pub offset_in_row: f32,
}
