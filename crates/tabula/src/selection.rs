//! Row selection tracked by identity, so it follows rows across commits.

use tabula_core::RowKey;

#[derive(Debug, Clone, Default)]
pub(crate) struct Selection {
    /// Oldest first.
    keys: Vec<RowKey>,
}

impl Selection {
    pub(crate) fn contains(&self, key: RowKey) -> bool {
        self.keys.contains(&key)
    }

    pub(crate) fn keys(&self) -> &[RowKey] {
        &self.keys
    }

    /// Adds `key`. In single mode the previous selection is replaced and
    /// returned.
    pub(crate) fn insert(&mut self, key: RowKey, multiple: bool) -> Vec<RowKey> {
        if self.contains(key) {
            return Vec::new();
        }
        let replaced = if multiple {
            Vec::new()
        } else {
            std::mem::take(&mut self.keys)
        };
        self.keys.push(key);
        replaced
    }

    pub(crate) fn remove(&mut self, key: RowKey) -> bool {
        let before = self.keys.len();
        self.keys.retain(|selected| *selected != key);
        self.keys.len() != before
    }

    pub(crate) fn retain(&mut self, mut keep: impl FnMut(RowKey) -> bool) {
        self.keys.retain(|key| keep(*key));
    }

    /// Keeps only the most recent selection.
    pub(crate) fn keep_latest(&mut self) {
        let excess = self.keys.len().saturating_sub(1);
        self.keys.drain(..excess);
    }

    pub(crate) fn clear(&mut self) {
        self.keys.clear();
    }
}
