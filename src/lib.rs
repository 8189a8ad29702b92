//! # Tether Engine
//!
//! A synchronization engine for named key/value datasets that must stay
//! consistent between a local store and a remote authoritative store,
//! despite intermittent connectivity and concurrent edits on both sides.
//!
//! The engine owns the reconciliation protocol only. The physical stores
//! and the platform's connectivity signal are external collaborators
//! plugged in through traits:
//!
//! - [`LocalStorage`] - keyed record store with per-record modification
//!   tracking ([`InMemoryStorage`] ships as a ready-made implementation)
//! - [`RemoteStorage`] - the canonical copy: list changes since a version,
//!   push changes under a session token
//! - [`ConnectivityMonitor`] - reachability now plus change notifications
//!   ([`WatchConnectivity`] ships as a channel-backed implementation)
//! - [`SyncCallback`] - caller hooks for success, failure, conflicts,
//!   merges and deletions
//!
//! ## Guarantees
//!
//! - Exactly one terminal callback ([`SyncCallback::on_success`] or
//!   [`SyncCallback::on_failure`]) per [`Dataset::synchronize`] call.
//! - Single-flight per dataset handle: reconciliation bodies never
//!   interleave; a deferred connectivity-gated request is superseded by
//!   any newer request.
//! - The local sync marker never claims knowledge of data not yet written
//!   locally: pull precedes push, and the marker advances only after the
//!   corresponding records are stored.
//! - Merge-, conflict- and push-race restarts share one retry budget
//!   (default 3); exhaustion surfaces as
//!   [`SyncError::RetriesExhausted`].
//!
//! ## Conflicts
//!
//! A record conflicts only when it changed remotely while the local copy
//! is marked modified with a different value. The engine never resolves
//! conflicts on its own: it hands the full set to
//! [`SyncCallback::on_conflict`], the caller writes resolution records
//! (see [`SyncConflict`]) through [`Dataset::resolve`], returns `true`,
//! and the loop retries.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tether_engine::{
//!     DatasetUpdates, InMemoryStorage, Record, RemoteStorage, Result, SyncCallback,
//!     SyncClient, SyncCount, SyncError, WatchConnectivity,
//! };
//!
//! // The application supplies the transport to its own backend.
//! struct MyRemote;
//!
//! #[async_trait::async_trait]
//! impl RemoteStorage for MyRemote {
//!     async fn list_updates(&self, dataset: &str, since: SyncCount) -> Result<DatasetUpdates> {
//!         # let _ = (dataset, since);
//!         todo!("GET /datasets/{dataset}/updates?since={since}")
//!     }
//!     async fn put_records(
//!         &self,
//!         dataset: &str,
//!         records: &[Record],
//!         sync_session_token: &str,
//!     ) -> Result<Vec<Record>> {
//!         # let _ = (dataset, records, sync_session_token);
//!         todo!("POST /datasets/{dataset}/records")
//!     }
//!     async fn delete_dataset(&self, dataset: &str) -> Result<()> {
//!         # let _ = dataset;
//!         todo!("DELETE /datasets/{dataset}")
//!     }
//! }
//!
//! struct LogOutcome;
//!
//! impl SyncCallback for LogOutcome {
//!     fn on_success(&self, dataset: &str, pulled: &[Record]) {
//!         println!("{dataset}: synced, {} records pulled", pulled.len());
//!     }
//!     fn on_failure(&self, dataset: &str, error: SyncError) {
//!         eprintln!("{dataset}: sync failed: {error}");
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let connectivity = Arc::new(WatchConnectivity::new(true));
//!     let client = SyncClient::new(
//!         "identity-1",
//!         Arc::new(InMemoryStorage::new()),
//!         Arc::new(MyRemote),
//!         connectivity,
//!     );
//!
//!     let notes = client.open_or_create_dataset("notes")?;
//!     notes.put("color", "blue")?;
//!     notes.synchronize(Arc::new(LogOutcome));
//!     Ok(())
//! }
//! ```

pub mod callback;
pub mod client;
pub mod conflict;
pub mod connectivity;
pub mod dataset;
pub mod error;
pub mod local;
pub mod memory;
pub mod reconcile;
pub mod record;
pub mod remote;

// Re-export main types at crate root
pub use callback::SyncCallback;
pub use client::SyncClient;
pub use conflict::SyncConflict;
pub use connectivity::{ConnectivityMonitor, WatchConnectivity};
pub use dataset::Dataset;
pub use error::{Result, SyncError};
pub use local::LocalStorage;
pub use memory::InMemoryStorage;
pub use reconcile::DEFAULT_MAX_RETRIES;
pub use record::{
    validate_dataset_name, validate_record_key, DatasetMetadata, Record, MAX_DATASET_NAME_LEN,
    MAX_RECORD_KEY_LEN,
};
pub use remote::{DatasetUpdates, RemoteStorage};

/// Type aliases for clarity
pub type IdentityId = String;
pub type DatasetName = String;
pub type RecordKey = String;
pub type SyncCount = i64;
pub type Timestamp = u64;

/// Milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> Timestamp {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as Timestamp
}
