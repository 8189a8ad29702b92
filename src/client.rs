//! Client entry point.

use crate::record::validate_dataset_name;
use crate::{
    reconcile, ConnectivityMonitor, Dataset, DatasetMetadata, IdentityId, LocalStorage,
    RemoteStorage, Result,
};
use std::sync::Arc;

/// Opens dataset handles for one identity and manages local data across
/// them.
pub struct SyncClient {
    identity: IdentityId,
    local: Arc<dyn LocalStorage>,
    remote: Arc<dyn RemoteStorage>,
    connectivity: Arc<dyn ConnectivityMonitor>,
    max_retries: u32,
}

impl SyncClient {
    /// Create a client for the given identity over the supplied stores.
    pub fn new(
        identity: impl Into<IdentityId>,
        local: Arc<dyn LocalStorage>,
        remote: Arc<dyn RemoteStorage>,
        connectivity: Arc<dyn ConnectivityMonitor>,
    ) -> Self {
        Self {
            identity: identity.into(),
            local,
            remote,
            connectivity,
            max_retries: reconcile::DEFAULT_MAX_RETRIES,
        }
    }

    /// Override the retry budget used by datasets opened afterwards.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Open a handle to a dataset, creating nothing until the first write.
    pub fn open_or_create_dataset(&self, name: &str) -> Result<Dataset> {
        let name = validate_dataset_name(name)?;
        Ok(Dataset::new(
            self.identity.clone(),
            name.to_string(),
            Arc::clone(&self.local),
            Arc::clone(&self.remote),
            Arc::clone(&self.connectivity),
            self.max_retries,
        ))
    }

    /// Metadata for every locally known dataset of this identity.
    pub fn list_datasets(&self) -> Result<Vec<DatasetMetadata>> {
        self.local.list_datasets(&self.identity)
    }

    /// Drop all local data, e.g. when the signed-in identity changes.
    /// Unpushed local changes are lost.
    pub fn wipe_data(&self) -> Result<()> {
        tracing::info!("wiping all local sync data");
        self.local.wipe()
    }
}
