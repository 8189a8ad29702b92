//! In-memory local storage.
//!
//! A complete [`LocalStorage`] implementation backed by a process-local
//! map. Suitable for applications without a durable store and used by
//! every test in this crate. Durable implementations (e.g. SQLite) plug in
//! through the same trait.

use crate::record::DatasetMetadata;
use crate::{now_millis, DatasetName, IdentityId, LocalStorage, Record, Result, SyncCount,
    SyncError, Timestamp};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Per-dataset state held by the store.
#[derive(Debug, Clone)]
struct DatasetState {
    records: HashMap<String, Record>,
    last_sync_count: SyncCount,
    created_at: Timestamp,
    last_modified_at: Timestamp,
}

impl DatasetState {
    fn new(now: Timestamp) -> Self {
        Self {
            records: HashMap::new(),
            last_sync_count: DatasetMetadata::SYNC_COUNT_NEVER_SYNCED,
            created_at: now,
            last_modified_at: now,
        }
    }

    fn metadata(&self, name: &str) -> DatasetMetadata {
        DatasetMetadata {
            dataset_name: name.to_string(),
            last_sync_count: self.last_sync_count,
            created_at: self.created_at,
            last_modified_at: self.last_modified_at,
            size_bytes: self.records.values().map(Record::size_bytes).sum(),
            record_count: self.records.values().filter(|r| !r.deleted).count() as u64,
        }
    }
}

type StateMap = HashMap<(IdentityId, DatasetName), DatasetState>;

/// In-memory [`LocalStorage`] implementation.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    inner: RwLock<StateMap>,
}

impl InMemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StateMap>> {
        self.inner
            .read()
            .map_err(|_| SyncError::Storage("local store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StateMap>> {
        self.inner
            .write()
            .map_err(|_| SyncError::Storage("local store lock poisoned".into()))
    }
}

impl LocalStorage for InMemoryStorage {
    fn get_value(&self, identity: &str, dataset: &str, key: &str) -> Result<Option<String>> {
        let map = self.read()?;
        Ok(map
            .get(&(identity.to_string(), dataset.to_string()))
            .and_then(|state| state.records.get(key))
            .filter(|record| !record.deleted)
            .and_then(|record| record.value.clone()))
    }

    fn put_value(
        &self,
        identity: &str,
        dataset: &str,
        key: &str,
        value: Option<&str>,
    ) -> Result<()> {
        let now = now_millis();
        let mut map = self.write()?;
        let state = map
            .entry((identity.to_string(), dataset.to_string()))
            .or_insert_with(|| DatasetState::new(now));

        let sync_count = state
            .records
            .get(key)
            .map(|existing| existing.sync_count)
            .unwrap_or(0);
        state.records.insert(
            key.to_string(),
            Record::new(key, value.map(str::to_string), sync_count, now, true),
        );
        state.last_modified_at = now;
        Ok(())
    }

    fn put_all_values(
        &self,
        identity: &str,
        dataset: &str,
        values: &HashMap<String, String>,
    ) -> Result<()> {
        for (key, value) in values {
            self.put_value(identity, dataset, key, Some(value))?;
        }
        Ok(())
    }

    fn get_record(&self, identity: &str, dataset: &str, key: &str) -> Result<Option<Record>> {
        let map = self.read()?;
        Ok(map
            .get(&(identity.to_string(), dataset.to_string()))
            .and_then(|state| state.records.get(key))
            .cloned())
    }

    fn get_records(&self, identity: &str, dataset: &str) -> Result<Vec<Record>> {
        let map = self.read()?;
        Ok(map
            .get(&(identity.to_string(), dataset.to_string()))
            .map(|state| state.records.values().cloned().collect())
            .unwrap_or_default())
    }

    fn put_records(&self, identity: &str, dataset: &str, records: &[Record]) -> Result<()> {
        let now = now_millis();
        let mut map = self.write()?;
        let state = map
            .entry((identity.to_string(), dataset.to_string()))
            .or_insert_with(|| DatasetState::new(now));

        for record in records {
            state.records.insert(record.key.clone(), record.clone());
        }
        state.last_modified_at = now;
        Ok(())
    }

    fn get_modified_records(&self, identity: &str, dataset: &str) -> Result<Vec<Record>> {
        let map = self.read()?;
        Ok(map
            .get(&(identity.to_string(), dataset.to_string()))
            .map(|state| {
                state
                    .records
                    .values()
                    .filter(|record| record.modified)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn get_last_sync_count(&self, identity: &str, dataset: &str) -> Result<SyncCount> {
        let map = self.read()?;
        Ok(map
            .get(&(identity.to_string(), dataset.to_string()))
            .map(|state| state.last_sync_count)
            .unwrap_or(DatasetMetadata::SYNC_COUNT_NEVER_SYNCED))
    }

    fn update_last_sync_count(
        &self,
        identity: &str,
        dataset: &str,
        count: SyncCount,
    ) -> Result<()> {
        let now = now_millis();
        let mut map = self.write()?;
        let state = map
            .entry((identity.to_string(), dataset.to_string()))
            .or_insert_with(|| DatasetState::new(now));
        state.last_sync_count = count;
        Ok(())
    }

    fn delete_dataset(&self, identity: &str, dataset: &str) -> Result<()> {
        let now = now_millis();
        let mut map = self.write()?;
        if let Some(state) = map.get_mut(&(identity.to_string(), dataset.to_string())) {
            state.records.clear();
            state.last_sync_count = DatasetMetadata::SYNC_COUNT_DELETED;
            state.last_modified_at = now;
        }
        Ok(())
    }

    fn purge_dataset(&self, identity: &str, dataset: &str) -> Result<()> {
        let mut map = self.write()?;
        map.remove(&(identity.to_string(), dataset.to_string()));
        Ok(())
    }

    fn get_dataset_metadata(
        &self,
        identity: &str,
        dataset: &str,
    ) -> Result<Option<DatasetMetadata>> {
        let map = self.read()?;
        Ok(map
            .get(&(identity.to_string(), dataset.to_string()))
            .map(|state| state.metadata(dataset)))
    }

    fn list_datasets(&self, identity: &str) -> Result<Vec<DatasetMetadata>> {
        let map = self.read()?;
        let mut datasets: Vec<DatasetMetadata> = map
            .iter()
            .filter(|((id, _), _)| id == identity)
            .map(|((_, name), state)| state.metadata(name))
            .collect();
        datasets.sort_by(|a, b| a.dataset_name.cmp(&b.dataset_name));
        Ok(datasets)
    }

    fn wipe(&self) -> Result<()> {
        let mut map = self.write()?;
        map.clear();
        Ok(())
    }
}
