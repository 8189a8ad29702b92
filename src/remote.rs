//! Remote storage contract.

use crate::{DatasetName, Record, Result, SyncCount};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Everything the remote reports for one pull, produced fresh per
/// reconciliation attempt and discarded afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetUpdates {
    /// Dataset name as the remote knows it
    pub dataset_name: DatasetName,
    /// Records changed since the requested version, in remote order
    pub records: Vec<Record>,
    /// The remote's current version of the dataset
    pub sync_count: SyncCount,
    /// Whether the dataset exists remotely
    pub exists: bool,
    /// Whether the remote explicitly marks the dataset deleted
    pub deleted: bool,
    /// Datasets whose history was folded into this one
    pub merged_dataset_names: Vec<DatasetName>,
    /// Opaque token scoping the follow-up push; single-use per attempt
    pub sync_session_token: String,
}

/// The canonical, authoritative copy of every dataset.
///
/// Failures map onto [`SyncError`](crate::SyncError):
/// [`Storage`](crate::SyncError::Storage) for transport or service
/// failures, [`Conflict`](crate::SyncError::Conflict) when a push is
/// rejected because of an interleaved writer.
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// List all changes to a dataset since the given version. `since == 0`
    /// returns the full dataset.
    async fn list_updates(&self, dataset: &str, since: SyncCount) -> Result<DatasetUpdates>;

    /// Push locally changed records under the session token obtained from
    /// the preceding pull. Returns the records stamped with their
    /// authoritative post-write versions.
    async fn put_records(
        &self,
        dataset: &str,
        records: &[Record],
        sync_session_token: &str,
    ) -> Result<Vec<Record>>;

    /// Delete a dataset remotely.
    async fn delete_dataset(&self, dataset: &str) -> Result<()>;
}
