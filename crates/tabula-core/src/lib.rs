#![doc = r"Layout bookkeeping for virtualized tables: extents, view reuse and batched edits."]

pub mod address;
pub mod collections;
mod error;
pub mod geometry;
pub mod listeners;
pub mod pool;
pub mod units;
pub mod updates;

pub use address::{RowAddress, RowKey, SectionKey, TableItem};
pub use error::{Result, TableError};
pub use geometry::{
    AddressesIntersecting, Extent, ExtentChange, GeometryTable, ItemsIntersecting, Length,
    SizeProvider, StaticSection, StaticSizes,
};
pub use listeners::{Listener, ListenerId, Listeners};
pub use pool::{KindStats, PoolConfig, RecyclePool, Recycled, ViewKind, DEFAULT_POOL_HEADROOM};
pub use units::{EdgeInsets, Point, Rect, Size};
pub use updates::{
    Animated, AnimationPlan, Commit, Edit, PendingEdit, RowAnimation, RowMove, SectionMove,
    UpdateCoordinator,
};
