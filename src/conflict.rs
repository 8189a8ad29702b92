//! Conflict pairing and resolution helpers.
//!
//! A [`SyncConflict`] exists only when a remotely changed record meets a
//! local record that is marked modified and carries a different value.
//! Resolution is caller-driven: pick a side (or a new value), write the
//! resolution records back through [`Dataset::resolve`], then let the sync
//! retry push them.
//!
//! [`Dataset::resolve`]: crate::Dataset::resolve

use crate::Record;
use serde::{Deserialize, Serialize};

/// A remote/local record pair that disagrees on value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConflict {
    /// The remotely changed record
    pub remote: Record,
    /// The locally modified record with a differing value
    pub local: Record,
}

impl SyncConflict {
    /// Pair a remote record with the local record of the same key.
    pub fn new(remote: Record, local: Record) -> Self {
        debug_assert_eq!(remote.key, local.key);
        Self { remote, local }
    }

    /// Key the two sides disagree on.
    pub fn key(&self) -> &str {
        &self.remote.key
    }

    /// Resolve by keeping the remote value.
    pub fn resolve_with_remote(&self) -> Record {
        self.resolve_with_value(self.remote.value.clone())
    }

    /// Resolve by keeping the local value.
    pub fn resolve_with_local(&self) -> Record {
        self.resolve_with_value(self.local.value.clone())
    }

    /// Resolve with an arbitrary value (`None` deletes the record).
    ///
    /// The resolution record carries the remote sync count, so the next
    /// push is based on the version the remote already knows, and is
    /// marked modified so it gets pushed.
    pub fn resolve_with_value(&self, value: Option<String>) -> Record {
        Record::new(
            self.remote.key.clone(),
            value,
            self.remote.sync_count,
            crate::now_millis(),
            true,
        )
    }
}
