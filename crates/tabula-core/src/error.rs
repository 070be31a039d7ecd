//! Error taxonomy shared by the table, the pool and the update coordinator.

use crate::pool::ViewKind;

pub type Result<T, E = TableError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TableError {
    /// An address points past the current counts. State is untouched.
    #[error("{what} {index} out of range (count {count})")]
    OutOfRange {
        what: &'static str,
        index: usize,
        count: usize,
    },

    /// The edits of a batch cannot be applied jointly. The batch has been
    /// discarded and the geometry is exactly as it was before the commit.
    #[error("{}", describe_batch_failure(.edit, .reason))]
    InconsistentBatch { edit: Option<usize>, reason: String },

    /// The pool was asked for a kind that was never registered.
    #[error("unknown view kind `{kind}`")]
    UnknownKind { kind: ViewKind },
}

impl TableError {
    pub(crate) fn section_out_of_range(index: usize, count: usize) -> Self {
        TableError::OutOfRange {
            what: "section",
            index,
            count,
        }
    }

    pub(crate) fn row_out_of_range(index: usize, count: usize) -> Self {
        TableError::OutOfRange {
            what: "row",
            index,
            count,
        }
    }

    pub(crate) fn batch(edit: usize, reason: impl Into<String>) -> Self {
        TableError::InconsistentBatch {
            edit: Some(edit),
            reason: reason.into(),
        }
    }
}

fn describe_batch_failure(edit: &Option<usize>, reason: &str) -> String {
    match edit {
        Some(position) => format!("inconsistent batch at edit #{position}: {reason}"),
        None => format!("inconsistent batch: {reason}"),
    }
}
