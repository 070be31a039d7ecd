use tabula_core::{PoolConfig, Size};
use tabula_physics::ScrollBehavior;
use web_time::Duration;

/// Default row length when the source reports no exact length and estimates
/// are disabled.
pub const DEFAULT_ROW_LENGTH: f32 = 44.0;

/// Time budget for measuring self-sizing rows in one layout pass.
pub const DEFAULT_MEASURE_BUDGET: Duration = Duration::from_millis(50);

/// Layout tuning for a [`TableView`](crate::TableView).
#[derive(Debug, Clone, PartialEq)]
pub struct TableConfig {
    /// Row length used when the source answers `UseEstimate` and
    /// `estimated_row_length` is zero.
    pub row_length: f32,
    /// Provisional length of self-sizing rows. Zero disables self-sizing.
    pub estimated_row_length: f32,
    pub header_length: f32,
    pub estimated_header_length: f32,
    pub footer_length: f32,
    pub estimated_footer_length: f32,
    /// Leading accessory region above the first section.
    pub table_header_length: f32,
    /// Trailing accessory region below the last section.
    pub table_footer_length: f32,
    pub viewport: Size,
    /// Items kept materialized past each edge of the viewport.
    pub beyond_bounds_item_count: usize,
    pub pool: PoolConfig,
    pub measure_budget: Duration,
    /// Upper bound on measure/re-flow rounds per layout pass.
    pub max_measure_passes: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            row_length: DEFAULT_ROW_LENGTH,
            estimated_row_length: 0.0,
            header_length: 0.0,
            estimated_header_length: 0.0,
            footer_length: 0.0,
            estimated_footer_length: 0.0,
            table_header_length: 0.0,
            table_footer_length: 0.0,
            viewport: Size::ZERO,
            beyond_bounds_item_count: 2,
            pool: PoolConfig::default(),
            measure_budget: DEFAULT_MEASURE_BUDGET,
            max_measure_passes: 4,
        }
    }
}

impl TableConfig {
    pub fn with_row_length(mut self, length: f32) -> Self {
        self.row_length = length;
        self
    }

    pub fn with_estimated_row_length(mut self, length: f32) -> Self {
        self.estimated_row_length = length.max(0.0);
        self
    }

    pub fn with_header_length(mut self, length: f32) -> Self {
        self.header_length = length;
        self
    }

    pub fn with_footer_length(mut self, length: f32) -> Self {
        self.footer_length = length;
        self
    }

    pub fn with_table_header(mut self, length: f32) -> Self {
        self.table_header_length = length;
        self
    }

    pub fn with_table_footer(mut self, length: f32) -> Self {
        self.table_footer_length = length;
        self
    }

    pub fn with_viewport(mut self, viewport: Size) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn with_beyond_bounds_item_count(mut self, count: usize) -> Self {
        self.beyond_bounds_item_count = count;
        self
    }

    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }
}

/// Feature switches of a table view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub scroll_enabled: bool,
    pub bounces: bool,
    pub always_bounce_vertical: bool,
    pub always_bounce_horizontal: bool,
    pub bounces_zoom: bool,
    pub paging: bool,
    pub directional_lock: bool,
    pub scrolls_to_top: bool,
    pub allows_selection: bool,
    pub allows_multiple_selection: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            scroll_enabled: true,
            bounces: true,
            always_bounce_vertical: false,
            always_bounce_horizontal: false,
            bounces_zoom: true,
            paging: false,
            directional_lock: false,
            scrolls_to_top: true,
            allows_selection: true,
            allows_multiple_selection: false,
        }
    }
}

impl Capabilities {
    /// The scroll-surface part of the capabilities.
    pub fn scroll_behavior(&self) -> ScrollBehavior {
        ScrollBehavior {
            scroll_enabled: self.scroll_enabled,
            bounces: self.bounces,
            always_bounce_vertical: self.always_bounce_vertical,
            always_bounce_horizontal: self.always_bounce_horizontal,
            bounces_zoom: self.bounces_zoom,
            paging: self.paging,
            directional_lock: self.directional_lock,
            scrolls_to_top: self.scrolls_to_top,
        }
    }
}
