//! The reconciliation loop.
//!
//! One invocation performs one bounded synchronization pass between the
//! local and remote stores.
//!
//! # Algorithm, per attempt
//!
//! 1. Local-deletion sentinel: push a remote delete, purge locally, done.
//! 2. Pull remote changes since the local sync marker.
//! 3. Remote-reported merges: escalate to the callback; accept consumes
//!    one retry unit and restarts the loop.
//! 4. Remote deletion: escalate; accept deletes the local copy, done.
//! 5. Conflict scan over pulled records; any conflicts escalate; accept
//!    consumes one retry unit and restarts.
//! 6. Apply pulled records locally, advance the marker to the pulled
//!    version.
//! 7. Push locally modified records under the pull's session token. A
//!    version conflict consumes one retry unit and restarts silently;
//!    success advances the marker only when no writer interleaved.
//!
//! The marker is only ever advanced after the corresponding records are
//! written locally. Every restart re-enters step 1 and re-pulls, so a
//! session token is used for at most one push.

use crate::record::DatasetMetadata;
use crate::{LocalStorage, Record, RemoteStorage, Result, SyncCallback, SyncConflict, SyncError};

/// Default retry budget for merge-, conflict- and push-race restarts.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Run one synchronization pass.
///
/// Returns the pulled records on success; the caller reports the terminal
/// outcome. Advisory callbacks are invoked from inside the loop.
pub(crate) async fn run(
    identity: &str,
    dataset: &str,
    local: &dyn LocalStorage,
    remote: &dyn RemoteStorage,
    callback: &dyn SyncCallback,
    max_retries: u32,
) -> Result<Vec<Record>> {
    let mut retries = max_retries as i64;

    loop {
        let last_sync_count = local.get_last_sync_count(identity, dataset)?;

        // Dataset deleted locally: propagate the deletion and stop.
        if last_sync_count == DatasetMetadata::SYNC_COUNT_DELETED {
            tracing::debug!(dataset, "pushing local dataset deletion to remote");
            remote.delete_dataset(dataset).await?;
            local.purge_dataset(identity, dataset)?;
            return Ok(Vec::new());
        }

        tracing::debug!(dataset, since = last_sync_count, "pulling remote changes");
        let updates = remote.list_updates(dataset, last_sync_count).await?;

        if !updates.merged_dataset_names.is_empty() {
            tracing::info!(
                dataset,
                merged = ?updates.merged_dataset_names,
                "remote reports merged datasets"
            );
            if !callback.on_datasets_merged(dataset, &updates.merged_dataset_names) {
                return Err(SyncError::Cancelled("dataset merge declined".into()));
            }
            retries -= 1;
            if retries < 0 {
                return Err(SyncError::RetriesExhausted);
            }
            continue;
        }

        // Deleted remotely, or gone after having been synced before.
        let never_synced = last_sync_count == DatasetMetadata::SYNC_COUNT_NEVER_SYNCED;
        if (!never_synced && !updates.exists) || updates.deleted {
            if !callback.on_dataset_deleted(dataset) {
                return Err(SyncError::Cancelled("remote dataset deletion declined".into()));
            }
            local.delete_dataset(identity, dataset)?;
            local.purge_dataset(identity, dataset)?;
            return Ok(Vec::new());
        }

        let pulled: Vec<Record> = updates
            .records
            .into_iter()
            .map(Record::acknowledged)
            .collect();

        if !pulled.is_empty() {
            let conflicts = detect_conflicts(identity, dataset, local, &pulled)?;
            if !conflicts.is_empty() {
                tracing::info!(dataset, count = conflicts.len(), "records in conflict");
                if !callback.on_conflict(dataset, &conflicts) {
                    return Err(SyncError::Cancelled("conflict resolution declined".into()));
                }
                retries -= 1;
                if retries < 0 {
                    return Err(SyncError::RetriesExhausted);
                }
                continue;
            }

            tracing::debug!(dataset, count = pulled.len(), "applying pulled records");
            local.put_records(identity, dataset, &pulled)?;
            local.update_last_sync_count(identity, dataset, updates.sync_count)?;
        }

        let outgoing = local.get_modified_records(identity, dataset)?;
        if !outgoing.is_empty() {
            tracing::debug!(dataset, count = outgoing.len(), "pushing local changes");
            match remote
                .put_records(dataset, &outgoing, &updates.sync_session_token)
                .await
            {
                Ok(acked) => {
                    let acked: Vec<Record> =
                        acked.into_iter().map(Record::acknowledged).collect();
                    local.put_records(identity, dataset, &acked)?;

                    // Advance the marker only if no other writer
                    // interleaved; otherwise the next pass reconciles.
                    let new_sync_count =
                        acked.iter().map(|r| r.sync_count).max().unwrap_or(0) as i64;
                    if new_sync_count == last_sync_count + 1 {
                        tracing::debug!(dataset, sync_count = new_sync_count, "marker advanced");
                        local.update_last_sync_count(identity, dataset, new_sync_count)?;
                    } else {
                        tracing::debug!(
                            dataset,
                            reported = new_sync_count,
                            expected = last_sync_count + 1,
                            "interleaved write detected, leaving marker unchanged"
                        );
                    }
                }
                Err(SyncError::Conflict(cause)) => {
                    tracing::info!(dataset, %cause, "push rejected by interleaved writer, retrying");
                    retries -= 1;
                    if retries < 0 {
                        return Err(SyncError::RetriesExhausted);
                    }
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        return Ok(pulled);
    }
}

/// Pair each pulled record against its local counterpart. A conflict
/// exists only when the local record is marked modified and the values
/// differ; equal values never conflict.
fn detect_conflicts(
    identity: &str,
    dataset: &str,
    local: &dyn LocalStorage,
    pulled: &[Record],
) -> Result<Vec<SyncConflict>> {
    let mut conflicts = Vec::new();
    for remote_record in pulled {
        if let Some(local_record) = local.get_record(identity, dataset, &remote_record.key)? {
            if local_record.modified && local_record.value != remote_record.value {
                conflicts.push(SyncConflict::new(remote_record.clone(), local_record));
            }
        }
    }
    Ok(conflicts)
}
