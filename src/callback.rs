//! Caller-supplied synchronization hooks.

use crate::{DatasetName, Record, SyncConflict, SyncError};

/// Hooks invoked during a synchronization pass.
///
/// Exactly one of [`on_success`] / [`on_failure`] fires per `synchronize`
/// call. The advisory hooks may fire several times, once per discovery,
/// and their return value decides whether the pass continues.
///
/// Hooks run synchronously on the background sync task. They must not call
/// back into `synchronize` for the same dataset handle; the single-flight
/// lock would deadlock.
///
/// [`on_success`]: SyncCallback::on_success
/// [`on_failure`]: SyncCallback::on_failure
pub trait SyncCallback: Send + Sync {
    /// The pass finished; `pulled` is the list of remotely changed records
    /// that were incorporated (empty when nothing changed or the dataset
    /// was deleted).
    fn on_success(&self, dataset: &str, pulled: &[Record]);

    /// The pass failed terminally.
    fn on_failure(&self, dataset: &str, error: SyncError);

    /// Records conflict between local and remote. Return `true` after
    /// resolving them locally (see [`SyncConflict`]) to retry, `false` to
    /// cancel the pass.
    fn on_conflict(&self, dataset: &str, conflicts: &[SyncConflict]) -> bool {
        tracing::warn!(
            dataset,
            conflicts = conflicts.len(),
            "conflicts detected but no handler installed, cancelling"
        );
        false
    }

    /// The dataset was deleted remotely. Return `true` to delete the local
    /// copy and finish, `false` to cancel and keep local data.
    fn on_dataset_deleted(&self, dataset: &str) -> bool {
        tracing::warn!(
            dataset,
            "remote deletion detected but no handler installed, cancelling"
        );
        false
    }

    /// Other datasets were merged into this one. Return `true` once the
    /// merge has been handled to continue, `false` to cancel.
    fn on_datasets_merged(&self, dataset: &str, merged: &[DatasetName]) -> bool {
        tracing::warn!(
            dataset,
            ?merged,
            "merged datasets detected but no handler installed, cancelling"
        );
        false
    }
}
