//! The data-source seam: counts, view kinds, view construction and sizing.

use tabula_core::{Length, RowAddress, SizeProvider, TableItem, ViewKind};

use crate::config::TableConfig;

/// Answer to a sizing question.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    /// Authoritative length.
    Exact(f32),
    /// Use the configured estimate and measure the view once it is
    /// materialized.
    UseEstimate,
}

/// Supplies the rows, and the views that present them, to a
/// [`TableView`](crate::TableView).
///
/// Counts must agree with the structural edits applied to the table: after
/// each commit the table checks its section and row counts against
/// [`section_count`](Self::section_count) and [`row_count`](Self::row_count).
pub trait TableSource {
    type View;

    fn section_count(&self) -> usize;

    fn row_count(&self, section: usize) -> usize;

    fn view_kind(&self, address: RowAddress) -> ViewKind;

    /// Constructs a fresh view when the pool has no idle instance of `kind`.
    fn make_view(&mut self, kind: &ViewKind) -> Self::View;

    fn configure(&mut self, view: &mut Self::View, address: RowAddress);

    fn measure_row(&self, address: RowAddress) -> Measurement {
        let _ = address;
        Measurement::UseEstimate
    }

    fn measure_header(&self, section: usize) -> Measurement {
        let _ = section;
        Measurement::UseEstimate
    }

    fn measure_footer(&self, section: usize) -> Measurement {
        let _ = section;
        Measurement::UseEstimate
    }

    /// Kind of the header view of `section`; `None` leaves the header as
    /// plain spacing.
    fn header_view_kind(&self, section: usize) -> Option<ViewKind> {
        let _ = section;
        None
    }

    fn footer_view_kind(&self, section: usize) -> Option<ViewKind> {
        let _ = section;
        None
    }

    fn configure_header(&mut self, view: &mut Self::View, section: usize) {
        let _ = (view, section);
    }

    fn configure_footer(&mut self, view: &mut Self::View, section: usize) {
        let _ = (view, section);
    }

    /// Asked before a tap selects `address`. Return the row to select
    /// instead, or `None` to ignore the tap.
    fn will_select_row(&mut self, address: RowAddress) -> Option<RowAddress> {
        Some(address)
    }

    /// Asked before a tap deselects `address` under multiple selection.
    /// Return the row to deselect instead, or `None` to keep the selection.
    fn will_deselect_row(&mut self, address: RowAddress) -> Option<RowAddress> {
        Some(address)
    }

    /// Length of a configured view of a self-sizing item. `None` accepts
    /// the estimate as final.
    fn measure_view(&self, view: &Self::View, item: TableItem) -> Option<f32> {
        let _ = (view, item);
        None
    }
}

/// Reads lengths from a source, falling back to the configured defaults.
pub(crate) struct SourceSizes<'a, D> {
    source: &'a D,
    config: &'a TableConfig,
}

impl<'a, D: TableSource> SourceSizes<'a, D> {
    pub(crate) fn new(source: &'a D, config: &'a TableConfig) -> Self {
        Self { source, config }
    }
}

fn resolve(measurement: Measurement, exact: f32, estimate: f32, what: TableItem) -> Length {
    match measurement {
        Measurement::Exact(length) if length.is_finite() && length >= 0.0 => Length::Exact(length),
        Measurement::Exact(length) => {
            log::warn!("source reported length {length} for {what}; using the estimate");
            fallback(exact, estimate)
        }
        Measurement::UseEstimate => fallback(exact, estimate),
    }
}

fn fallback(exact: f32, estimate: f32) -> Length {
    if estimate > 0.0 {
        Length::Estimated(estimate)
    } else {
        Length::Exact(exact.max(0.0))
    }
}

impl<D: TableSource> SizeProvider for SourceSizes<'_, D> {
    fn section_count(&self) -> usize {
        self.source.section_count()
    }

    fn row_count(&self, section: usize) -> usize {
        self.source.row_count(section)
    }

    fn row_length(&self, address: RowAddress) -> Length {
        resolve(
            self.source.measure_row(address),
            self.config.row_length,
            self.config.estimated_row_length,
            TableItem::Row(address),
        )
    }

    fn header_length(&self, section: usize) -> Length {
        resolve(
            self.source.measure_header(section),
            self.config.header_length,
            self.config.estimated_header_length,
            TableItem::Header(section),
        )
    }

    fn footer_length(&self, section: usize) -> Length {
        resolve(
            self.source.measure_footer(section),
            self.config.footer_length,
            self.config.estimated_footer_length,
            TableItem::Footer(section),
        )
    }
}
