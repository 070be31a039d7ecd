//! Table notifications.

use tabula_core::{AnimationPlan, Listener, ListenerId, Listeners, RowAddress, TableItem};

#[derive(Debug, Clone, PartialEq)]
pub enum TableEvent {
    /// A view was configured for `item` and is about to be shown.
    WillDisplay { item: TableItem },
    /// The view of `item` went back to the pool. For rows removed by a
    /// commit, `item` is the pre-commit address.
    DidEndDisplaying { item: TableItem },
    DidSelectRow { address: RowAddress },
    DidDeselectRow { address: RowAddress },
    DidCommitUpdates { plan: AnimationPlan },
    DidReloadData,
}

impl TableEvent {
    /// Row address of a display event, if it concerns a row.
    pub fn row(&self) -> Option<RowAddress> {
        match self {
            TableEvent::WillDisplay { item } | TableEvent::DidEndDisplaying { item } => item.as_row(),
            TableEvent::DidSelectRow { address } | TableEvent::DidDeselectRow { address } => {
                Some(*address)
            }
            TableEvent::DidCommitUpdates { .. } | TableEvent::DidReloadData => None,
        }
    }
}

pub type TableListener = Listener<TableEvent>;

pub type TableListenerId = ListenerId;

pub(crate) type TableListeners = Listeners<TableEvent>;
