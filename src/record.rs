//! Record and dataset metadata types.

use crate::{DatasetName, RecordKey, Result, SyncCount, SyncError, Timestamp};
use serde::{Deserialize, Serialize};

/// Maximum record key length in bytes.
pub const MAX_RECORD_KEY_LEN: usize = 1024;

/// Maximum dataset name length in bytes.
pub const MAX_DATASET_NAME_LEN: usize = 128;

/// A key/value record in a dataset.
///
/// A record with `value == None` is a tombstone: a deletion that still has
/// to propagate. `modified` marks a record changed locally since its last
/// successful push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Record key, unique within a dataset
    pub key: RecordKey,
    /// Record value; `None` is a tombstone
    pub value: Option<String>,
    /// Dataset version this record was last synced at
    pub sync_count: u64,
    /// When the record was last changed (milliseconds since epoch)
    pub last_modified_at: Timestamp,
    /// Changed locally since the last successful push
    pub modified: bool,
    /// Deleted (always paired with `value == None`)
    pub deleted: bool,
}

impl Record {
    /// Create a record. A `None` value produces a tombstone.
    pub fn new(
        key: impl Into<RecordKey>,
        value: Option<String>,
        sync_count: u64,
        last_modified_at: Timestamp,
        modified: bool,
    ) -> Self {
        let deleted = value.is_none();
        Self {
            key: key.into(),
            value,
            sync_count,
            last_modified_at,
            modified,
            deleted,
        }
    }

    /// Check whether this record is a tombstone.
    pub fn is_tombstone(&self) -> bool {
        self.deleted
    }

    /// Size of the record in bytes: UTF-8 length of key plus value.
    pub fn size_bytes(&self) -> u64 {
        let value_len = self.value.as_deref().map(str::len).unwrap_or(0);
        (self.key.len() + value_len) as u64
    }

    /// Copy of this record with the `modified` flag cleared, as stored
    /// after the remote acknowledges it.
    pub(crate) fn acknowledged(mut self) -> Self {
        self.modified = false;
        self
    }
}

/// Durable per-dataset bookkeeping held by the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    /// Dataset name
    pub dataset_name: DatasetName,
    /// Last remote version fully incorporated locally
    pub last_sync_count: SyncCount,
    /// When the dataset was created locally (milliseconds since epoch)
    pub created_at: Timestamp,
    /// When the dataset was last changed locally
    pub last_modified_at: Timestamp,
    /// Total size of all records in bytes
    pub size_bytes: u64,
    /// Number of live (non-tombstone) records
    pub record_count: u64,
}

impl DatasetMetadata {
    /// Sentinel: dataset marked deleted locally, deletion not yet pushed.
    pub const SYNC_COUNT_DELETED: SyncCount = -1;

    /// Sentinel: dataset never synced.
    pub const SYNC_COUNT_NEVER_SYNCED: SyncCount = 0;

    /// Check whether the dataset is locally marked deleted.
    pub fn is_locally_deleted(&self) -> bool {
        self.last_sync_count == Self::SYNC_COUNT_DELETED
    }
}

/// Validate a record key: non-blank, at most [`MAX_RECORD_KEY_LEN`] bytes.
pub fn validate_record_key(key: &str) -> Result<&str> {
    if key.trim().is_empty() {
        return Err(SyncError::InvalidKey("key is blank".into()));
    }
    if key.len() > MAX_RECORD_KEY_LEN {
        return Err(SyncError::InvalidKey(format!(
            "key exceeds {} bytes",
            MAX_RECORD_KEY_LEN
        )));
    }
    Ok(key)
}

/// Validate a dataset name: 1..=[`MAX_DATASET_NAME_LEN`] bytes from
/// `[A-Za-z0-9_.:-]`.
pub fn validate_dataset_name(name: &str) -> Result<&str> {
    if name.is_empty() {
        return Err(SyncError::InvalidDatasetName("name is empty".into()));
    }
    if name.len() > MAX_DATASET_NAME_LEN {
        return Err(SyncError::InvalidDatasetName(format!(
            "name exceeds {} bytes",
            MAX_DATASET_NAME_LEN
        )));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-')))
    {
        return Err(SyncError::InvalidDatasetName(format!(
            "invalid character {:?}",
            c
        )));
    }
    Ok(name)
}
