//! Dataset handle.
//!
//! A [`Dataset`] is a cheaply cloneable handle over one named record
//! collection. Record access goes straight to local storage;
//! [`synchronize`] runs the reconciliation loop on a background task with
//! single-flight semantics per handle, and
//! [`synchronize_on_connectivity`] defers a sync until the network comes
//! back.
//!
//! [`synchronize`]: Dataset::synchronize
//! [`synchronize_on_connectivity`]: Dataset::synchronize_on_connectivity

use crate::record::validate_record_key;
use crate::{
    reconcile, ConnectivityMonitor, DatasetMetadata, DatasetName, IdentityId, LocalStorage,
    Record, RemoteStorage, Result, SyncCallback, SyncError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;

/// A deferred sync registration: the waiting task plus the cancellation
/// token it checks before firing.
struct DeferredSync {
    token: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

pub(crate) struct DatasetInner {
    identity: IdentityId,
    name: DatasetName,
    local: Arc<dyn LocalStorage>,
    remote: Arc<dyn RemoteStorage>,
    connectivity: Arc<dyn ConnectivityMonitor>,
    max_retries: u32,
    /// Single-flight guard: only one reconciliation body per handle.
    sync_lock: tokio::sync::Mutex<()>,
    /// At most one deferred (connectivity-gated) request per handle.
    pending: Mutex<Option<DeferredSync>>,
}

/// Handle to a named key/value dataset.
#[derive(Clone)]
pub struct Dataset {
    inner: Arc<DatasetInner>,
}

impl Dataset {
    pub(crate) fn new(
        identity: IdentityId,
        name: DatasetName,
        local: Arc<dyn LocalStorage>,
        remote: Arc<dyn RemoteStorage>,
        connectivity: Arc<dyn ConnectivityMonitor>,
        max_retries: u32,
    ) -> Self {
        Self {
            inner: Arc::new(DatasetInner {
                identity,
                name,
                local,
                remote,
                connectivity,
                max_retries,
                sync_lock: tokio::sync::Mutex::new(()),
                pending: Mutex::new(None),
            }),
        }
    }

    /// Dataset name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Get the live value of a record.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let key = validate_record_key(key)?;
        self.inner
            .local
            .get_value(&self.inner.identity, &self.inner.name, key)
    }

    /// Set a record's value.
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        let key = validate_record_key(key)?;
        self.inner
            .local
            .put_value(&self.inner.identity, &self.inner.name, key, Some(value))
    }

    /// Remove a record (writes a tombstone that propagates on sync).
    pub fn remove(&self, key: &str) -> Result<()> {
        let key = validate_record_key(key)?;
        self.inner
            .local
            .put_value(&self.inner.identity, &self.inner.name, key, None)
    }

    /// Set several values at once.
    pub fn put_all(&self, values: &HashMap<String, String>) -> Result<()> {
        for key in values.keys() {
            validate_record_key(key)?;
        }
        self.inner
            .local
            .put_all_values(&self.inner.identity, &self.inner.name, values)
    }

    /// All live key/value pairs.
    pub fn get_all(&self) -> Result<HashMap<String, String>> {
        let records = self
            .inner
            .local
            .get_records(&self.inner.identity, &self.inner.name)?;
        Ok(records
            .into_iter()
            .filter(|record| !record.deleted)
            .filter_map(|record| Some((record.key, record.value?)))
            .collect())
    }

    /// All records, tombstones included.
    pub fn all_records(&self) -> Result<Vec<Record>> {
        self.inner
            .local
            .get_records(&self.inner.identity, &self.inner.name)
    }

    /// Whether a record changed locally since the last successful push.
    pub fn is_changed(&self, key: &str) -> Result<bool> {
        let key = validate_record_key(key)?;
        Ok(self
            .inner
            .local
            .get_record(&self.inner.identity, &self.inner.name, key)?
            .map(|record| record.modified)
            .unwrap_or(false))
    }

    /// Total size of all records in bytes.
    pub fn total_size_bytes(&self) -> Result<u64> {
        Ok(self.all_records()?.iter().map(Record::size_bytes).sum())
    }

    /// Size of one record in bytes, `0` if absent.
    pub fn size_bytes(&self, key: &str) -> Result<u64> {
        let key = validate_record_key(key)?;
        Ok(self
            .inner
            .local
            .get_record(&self.inner.identity, &self.inner.name, key)?
            .map(|record| record.size_bytes())
            .unwrap_or(0))
    }

    /// Mark the dataset deleted locally. The deletion is pushed to the
    /// remote by the next [`synchronize`](Dataset::synchronize).
    pub fn delete(&self) -> Result<()> {
        self.inner
            .local
            .delete_dataset(&self.inner.identity, &self.inner.name)
    }

    /// Local metadata, `None` for a dataset never written to.
    pub fn metadata(&self) -> Result<Option<DatasetMetadata>> {
        self.inner
            .local
            .get_dataset_metadata(&self.inner.identity, &self.inner.name)
    }

    /// Write conflict-resolution records (see
    /// [`SyncConflict`](crate::SyncConflict)) so the retried sync pushes
    /// them.
    pub fn resolve(&self, records: &[Record]) -> Result<()> {
        self.inner
            .local
            .put_records(&self.inner.identity, &self.inner.name, records)
    }

    /// Run one synchronization pass on a background task.
    ///
    /// Never blocks the caller. Reports exactly one terminal outcome
    /// through `callback`, after zero or more advisory calls. Must be
    /// called from within a tokio runtime.
    pub fn synchronize(&self, callback: Arc<dyn SyncCallback>) {
        if !self.inner.connectivity.is_reachable() {
            callback.on_failure(&self.inner.name, SyncError::NetworkUnavailable);
            return;
        }

        self.inner.discard_pending();

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.run_sync(callback).await;
        });
    }

    /// Synchronize now if reachable, otherwise once connectivity returns.
    ///
    /// A deferred request replaces any previously deferred one for this
    /// handle, and silently becomes a no-op if every handle to the
    /// dataset is dropped first.
    pub fn synchronize_on_connectivity(&self, callback: Arc<dyn SyncCallback>) {
        if self.inner.connectivity.is_reachable() {
            self.synchronize(callback);
            return;
        }

        self.inner.discard_pending();
        tracing::debug!(
            dataset = %self.inner.name,
            "connectivity unavailable, deferring synchronization"
        );

        let token = Arc::new(AtomicBool::new(true));
        let task_token = Arc::clone(&token);
        let mut rx = self.inner.connectivity.subscribe();
        let weak = Arc::downgrade(&self.inner);

        let task = tokio::spawn(async move {
            loop {
                if rx.changed().await.is_err() {
                    return; // monitor gone
                }
                if *rx.borrow_and_update() {
                    break;
                }
            }
            drop(rx); // one-shot subscription ends here

            let Some(inner) = weak.upgrade() else {
                tracing::debug!("dropping deferred sync, dataset handle is gone");
                return;
            };
            if !inner.take_pending_if(&task_token) {
                return; // superseded in the meantime
            }

            tracing::debug!(dataset = %inner.name, "connectivity restored, synchronizing");
            if !inner.connectivity.is_reachable() {
                // Flapped back offline before we got to run.
                callback.on_failure(&inner.name, SyncError::NetworkUnavailable);
                return;
            }
            inner.run_sync(callback).await;
        });

        *self.inner.pending_slot() = Some(DeferredSync { token, task });
    }
}

impl DatasetInner {
    async fn run_sync(self: Arc<Self>, callback: Arc<dyn SyncCallback>) {
        let _flight = self.sync_lock.lock().await;
        tracing::debug!(dataset = %self.name, "starting synchronization");

        // Surface datasets the remote merged into this one that are still
        // sitting in local storage. Advisory only; the return value does
        // not gate the loop here.
        match self.locally_merged_datasets() {
            Ok(merged) if !merged.is_empty() => {
                tracing::info!(dataset = %self.name, ?merged, "detected locally merged datasets");
                let _ = callback.on_datasets_merged(&self.name, &merged);
            }
            Ok(_) => {}
            Err(error) => {
                callback.on_failure(&self.name, error);
                return;
            }
        }

        let result = reconcile::run(
            &self.identity,
            &self.name,
            self.local.as_ref(),
            self.remote.as_ref(),
            callback.as_ref(),
            self.max_retries,
        )
        .await;

        match result {
            Ok(pulled) => {
                tracing::debug!(dataset = %self.name, "synchronization succeeded");
                callback.on_success(&self.name, &pulled);
            }
            Err(error) => {
                tracing::warn!(dataset = %self.name, %error, "synchronization failed");
                callback.on_failure(&self.name, error);
            }
        }
    }

    /// Datasets merged into this one server-side keep living locally under
    /// `"<name>.<suffix>"` until the caller disposes of them.
    fn locally_merged_datasets(&self) -> Result<Vec<DatasetName>> {
        let prefix = format!("{}.", self.name);
        Ok(self
            .local
            .list_datasets(&self.identity)?
            .into_iter()
            .map(|meta| meta.dataset_name)
            .filter(|name| name.starts_with(&prefix))
            .collect())
    }

    fn pending_slot(&self) -> MutexGuard<'_, Option<DeferredSync>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Cancel and drop any deferred sync registration.
    fn discard_pending(&self) {
        if let Some(pending) = self.pending_slot().take() {
            tracing::debug!(dataset = %self.name, "discarding pending deferred sync");
            pending.token.store(false, Ordering::SeqCst);
            pending.task.abort();
        }
    }

    /// Claim the pending slot if it still holds the given token. Returns
    /// whether the caller won the claim; losing means the registration
    /// was superseded.
    fn take_pending_if(&self, token: &Arc<AtomicBool>) -> bool {
        let mut slot = self.pending_slot();
        let registered = slot
            .as_ref()
            .map(|pending| Arc::ptr_eq(&pending.token, token))
            .unwrap_or(false);
        if registered {
            *slot = None;
        }
        drop(slot);
        registered && token.swap(false, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DatasetUpdates, InMemoryStorage, SyncCount, WatchConnectivity};
    use async_trait::async_trait;

    /// Remote that reports an empty, existing dataset.
    struct NullRemote;

    #[async_trait]
    impl RemoteStorage for NullRemote {
        async fn list_updates(&self, dataset: &str, _since: SyncCount) -> Result<DatasetUpdates> {
            Ok(DatasetUpdates {
                dataset_name: dataset.to_string(),
                records: Vec::new(),
                sync_count: 0,
                exists: true,
                deleted: false,
                merged_dataset_names: Vec::new(),
                sync_session_token: "token".into(),
            })
        }

        async fn put_records(
            &self,
            _dataset: &str,
            records: &[Record],
            _sync_session_token: &str,
        ) -> Result<Vec<Record>> {
            Ok(records.to_vec())
        }

        async fn delete_dataset(&self, _dataset: &str) -> Result<()> {
            Ok(())
        }
    }

    fn dataset() -> Dataset {
        Dataset::new(
            "identity-1".into(),
            "notes".into(),
            Arc::new(InMemoryStorage::new()),
            Arc::new(NullRemote),
            Arc::new(WatchConnectivity::new(true)),
            reconcile::DEFAULT_MAX_RETRIES,
        )
    }

    #[test]
    fn put_get_remove() {
        let dataset = dataset();
        dataset.put("color", "blue").unwrap();

        assert_eq!(dataset.get("color").unwrap().as_deref(), Some("blue"));
        assert!(dataset.is_changed("color").unwrap());

        dataset.remove("color").unwrap();
        assert_eq!(dataset.get("color").unwrap(), None);

        // Tombstone still tracked for push
        let records = dataset.all_records().unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].is_tombstone());
    }

    #[test]
    fn get_all_skips_tombstones() {
        let dataset = dataset();
        dataset.put("a", "1").unwrap();
        dataset.put("b", "2").unwrap();
        dataset.remove("b").unwrap();

        let all = dataset.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all.get("a").map(String::as_str), Some("1"));
    }

    #[test]
    fn put_all_validates_every_key() {
        let dataset = dataset();
        let mut values = HashMap::new();
        values.insert("ok".to_string(), "1".to_string());
        values.insert("".to_string(), "2".to_string());

        assert!(matches!(
            dataset.put_all(&values),
            Err(SyncError::InvalidKey(_))
        ));
        // Nothing was written
        assert!(dataset.get_all().unwrap().is_empty());
    }

    #[test]
    fn sizes() {
        let dataset = dataset();
        dataset.put("key", "value").unwrap();

        assert_eq!(dataset.size_bytes("key").unwrap(), 8);
        assert_eq!(dataset.size_bytes("missing").unwrap(), 0);
        assert_eq!(dataset.total_size_bytes().unwrap(), 8);
    }

    #[test]
    fn delete_marks_local_sentinel() {
        let dataset = dataset();
        dataset.put("color", "blue").unwrap();
        dataset.delete().unwrap();

        let meta = dataset.metadata().unwrap().unwrap();
        assert!(meta.is_locally_deleted());
    }

    #[test]
    fn invalid_keys_rejected() {
        let dataset = dataset();
        assert!(matches!(
            dataset.put("", "v"),
            Err(SyncError::InvalidKey(_))
        ));
        assert!(matches!(
            dataset.get("   "),
            Err(SyncError::InvalidKey(_))
        ));
    }
}
