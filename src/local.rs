//! Local storage contract.
//!
//! The engine never touches the physical store directly; it goes through
//! this trait. Implementations must support concurrent access from sync
//! tasks of different dataset handles. Within one handle, the engine's
//! single-flight lock means there is never more than one writer.

use crate::{DatasetMetadata, Record, Result, SyncCount};
use std::collections::HashMap;

/// A keyed, queryable record store with per-record modification tracking.
///
/// Records are addressed by (identity, dataset, key). All write operations
/// that originate locally must mark the affected records modified so
/// [`get_modified_records`] picks them up for the next push;
/// [`put_records`] stores records verbatim, since it is also used for
/// authoritative data pulled from the remote.
///
/// [`get_modified_records`]: LocalStorage::get_modified_records
/// [`put_records`]: LocalStorage::put_records
pub trait LocalStorage: Send + Sync {
    /// Get the live value of a record, `None` if absent or deleted.
    fn get_value(&self, identity: &str, dataset: &str, key: &str) -> Result<Option<String>>;

    /// Set a record's value and mark it modified. `None` writes a
    /// tombstone.
    fn put_value(
        &self,
        identity: &str,
        dataset: &str,
        key: &str,
        value: Option<&str>,
    ) -> Result<()>;

    /// Set several values at once, marking each modified.
    fn put_all_values(
        &self,
        identity: &str,
        dataset: &str,
        values: &HashMap<String, String>,
    ) -> Result<()>;

    /// Get a whole record, tombstones included.
    fn get_record(&self, identity: &str, dataset: &str, key: &str) -> Result<Option<Record>>;

    /// All records of a dataset, tombstones included.
    fn get_records(&self, identity: &str, dataset: &str) -> Result<Vec<Record>>;

    /// Store records verbatim, preserving their flags.
    fn put_records(&self, identity: &str, dataset: &str, records: &[Record]) -> Result<()>;

    /// Records changed locally since the last successful push, tombstones
    /// included.
    fn get_modified_records(&self, identity: &str, dataset: &str) -> Result<Vec<Record>>;

    /// The last fully incorporated remote version, with the sentinels of
    /// [`DatasetMetadata`]. `0` for an unknown dataset.
    fn get_last_sync_count(&self, identity: &str, dataset: &str) -> Result<SyncCount>;

    /// Advance (or reset) the sync marker.
    fn update_last_sync_count(&self, identity: &str, dataset: &str, count: SyncCount)
        -> Result<()>;

    /// Mark the dataset deleted locally: drop its records and set the
    /// marker to [`DatasetMetadata::SYNC_COUNT_DELETED`] so the deletion
    /// propagates on the next sync.
    fn delete_dataset(&self, identity: &str, dataset: &str) -> Result<()>;

    /// Remove every trace of the dataset, metadata included.
    fn purge_dataset(&self, identity: &str, dataset: &str) -> Result<()>;

    /// Metadata for one dataset, `None` if unknown.
    fn get_dataset_metadata(&self, identity: &str, dataset: &str)
        -> Result<Option<DatasetMetadata>>;

    /// Metadata for all datasets of an identity.
    fn list_datasets(&self, identity: &str) -> Result<Vec<DatasetMetadata>>;

    /// Drop all local data for every identity (e.g. on identity change).
    fn wipe(&self) -> Result<()>;
}
