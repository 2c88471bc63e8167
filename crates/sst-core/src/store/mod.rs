//! Namespaced key/value document store.
//!
//! The store layer knows nothing about records: it swaps whole documents
//! under string keys. [`LocalStore`] is the typed view on top of it and owns
//! the key names, which are shared with existing installs and must not change.
//!
//! Processes sharing one store serialize their read-modify-write cycles with
//! [`LocalStore::transaction`]. Two devices editing the same date reconcile
//! through the sync engine's timestamp rule instead.

pub mod local;
pub mod memory;
pub mod sqlite;

pub use local::LocalStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::path::PathBuf;

use crate::error::ErrorCode;

/// Stable document keys.
pub mod keys {
    /// Ordered list of unit ranges.
    pub const RANGES: &str = "sst_ranges_v1";
    /// Opaque unit display metadata.
    pub const THEME: &str = "sst_unit_meta_v1";
    /// Per-unit forward contact fields.
    pub const FORWARD_FIELDS: &str = "sst_forward_v1";
    /// Per-unit forward status sets.
    pub const FORWARD_STATUS: &str = "sst_status_forward_v1";
    /// Prefix of per-date documents; the suffix is the ISO date.
    pub const DATE_PREFIX: &str = "sst_date_";
    /// Start instant of the last successful sync.
    pub const LAST_SYNC: &str = "sst_lastSync_cloud";
}

/// Errors raised by a document store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("document '{key}' is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("document '{key}' could not be encoded: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Machine-readable code associated with this store error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Sqlite(_) | Self::Io { .. } => ErrorCode::StoreUnavailable,
            Self::Corrupt { .. } => ErrorCode::CorruptDocument,
            Self::Encode { .. } => ErrorCode::InternalUnexpected,
        }
    }
}

/// Whole-document key/value storage.
///
/// `put` replaces the document atomically; readers never observe a partial
/// write. Reads after a write in the same context see that write.
pub trait DocumentStore {
    /// Fetch a document body, `None` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the document under `key`.
    fn put(&mut self, key: &str, body: &str) -> Result<(), StoreError>;

    /// Delete one document. Missing keys are not an error.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;

    /// Every key starting with `prefix`, in lexicographic order.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Delete every document.
    fn clear(&mut self) -> Result<(), StoreError>;

    /// Start a write transaction that holds off other writers until
    /// [`commit`](Self::commit) or [`rollback`](Self::rollback).
    fn begin_write(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Discard every write since [`begin_write`](Self::begin_write).
    fn rollback(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Opaque counter that changes when another writer commits.
    ///
    /// Watchers poll it to turn foreign commits into "changed" signals.
    fn change_counter(&self) -> Result<u64, StoreError>;
}
