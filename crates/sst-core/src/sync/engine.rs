//! Pull, merge, push.
//!
//! One cycle of [`SyncEngine::sync_now`]:
//!
//! 1. Enter the [`SyncGate`]; an overlapping cycle fails with
//!    [`SyncError::Busy`].
//! 2. Read `started_at` from the clock.
//! 3. Pull the remote body and validate it as a [`GlobalSnapshot`].
//! 4. Merge it into the local store (see [`merge`](super::merge)).
//! 5. Bundle the merged local state and push it.
//! 6. Persist `last_sync = started_at`.
//!
//! Any failure aborts the cycle and leaves `last_sync` where it was. A push
//! failure leaves the merge committed; the next cycle simply repeats it.
//! Edits made while a cycle runs carry stamps after `started_at`, so they
//! count as pending and go out with the next cycle.

use serde::Serialize;

use super::merge::{MergeReport, merge_into_store};
use super::transport::{SnapshotTransport, TransportError};
use crate::clock::Clock;
use crate::error::ErrorCode;
use crate::lock::{GateError, SyncGate};
use crate::model::snapshot::SnapshotError;
use crate::model::{GlobalSnapshot, ModifiedAt, SnapshotMeta};
use crate::store::{DocumentStore, LocalStore, StoreError};

/// Errors that abort a sync cycle.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("remote snapshot is malformed: {0}")]
    MalformedRemoteSnapshot(#[source] SnapshotError),
    #[error("remote snapshot version {found} is newer than supported version {supported}")]
    UnsupportedSnapshotVersion { found: u32, supported: u32 },
    #[error("local store unavailable: {0}")]
    Store(#[from] StoreError),
    #[error("sync already in progress")]
    Busy,
    #[error("sync lock unavailable: {0}")]
    Lock(#[source] GateError),
    #[error("local snapshot could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
}

impl SyncError {
    /// Machine-readable code associated with this sync error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Transport(_) => ErrorCode::TransportFailed,
            Self::MalformedRemoteSnapshot(_) => ErrorCode::MalformedRemoteSnapshot,
            Self::UnsupportedSnapshotVersion { .. } => ErrorCode::UnsupportedSnapshotVersion,
            Self::Store(err) => err.code(),
            Self::Busy => ErrorCode::SyncBusy,
            Self::Lock(err) => err.code(),
            Self::Encode(_) => ErrorCode::SnapshotEncodeFailed,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }

    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Busy)
    }
}

impl From<SnapshotError> for SyncError {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::UnsupportedVersion { found, supported } => {
                Self::UnsupportedSnapshotVersion { found, supported }
            }
            other => Self::MalformedRemoteSnapshot(other),
        }
    }
}

impl From<GateError> for SyncError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Busy => Self::Busy,
            other @ GateError::IoError { .. } => Self::Lock(other),
        }
    }
}

/// Sync bookkeeping as reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    /// Start instant of the last successful cycle.
    pub last_sync: ModifiedAt,
    /// Records modified after `last_sync`.
    pub pending: usize,
}

/// Result of a successful cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    #[serde(flatten)]
    pub status: SyncStatus,
    pub merge: MergeReport,
}

/// Reconciles a local store with one remote snapshot.
#[derive(Debug)]
pub struct SyncEngine<S, T, C> {
    store: LocalStore<S>,
    transport: T,
    clock: C,
    gate: SyncGate,
}

impl<S, T, C> SyncEngine<S, T, C>
where
    S: DocumentStore,
    T: SnapshotTransport,
    C: Clock,
{
    pub fn new(store: LocalStore<S>, transport: T, clock: C) -> Self {
        Self {
            store,
            transport,
            clock,
            gate: SyncGate::new(),
        }
    }

    /// Use `gate` instead of a private in-process gate.
    #[must_use]
    pub fn with_gate(mut self, gate: SyncGate) -> Self {
        self.gate = gate;
        self
    }

    pub const fn store(&self) -> &LocalStore<S> {
        &self.store
    }

    pub const fn store_mut(&mut self) -> &mut LocalStore<S> {
        &mut self.store
    }

    pub const fn clock(&self) -> &C {
        &self.clock
    }

    pub const fn gate(&self) -> &SyncGate {
        &self.gate
    }

    pub fn into_store(self) -> LocalStore<S> {
        self.store
    }

    /// Copy every local document into a snapshot. Reads only.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when a document cannot be read.
    pub fn bundle_local(&self) -> Result<GlobalSnapshot, StoreError> {
        bundle(&self.store)
    }

    /// Merge an already-parsed remote snapshot into the local store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when a document cannot be read or written.
    pub fn merge_remote(&mut self, remote: &GlobalSnapshot) -> Result<MergeReport, StoreError> {
        merge_into_store(&mut self.store, remote)
    }

    /// Run one full cycle.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] for any failed step; see the module docs for
    /// what state each failure leaves behind.
    pub fn sync_now(&mut self) -> Result<SyncOutcome, SyncError> {
        let _permit = self.gate.try_enter()?;
        let started_at = self.clock.now();
        tracing::debug!(started_at = %ModifiedAt::At(started_at), "sync cycle started");

        let body = self.transport.pull()?;
        let remote = GlobalSnapshot::from_wire(&body)?;
        let merge = self.merge_remote(&remote)?;
        tracing::debug!(
            adopted = merge.records.adopted,
            replaced = merge.records.replaced,
            kept = merge.records.kept,
            meta = ?merge.meta_bootstrapped,
            "merged remote snapshot"
        );

        let snapshot = self.bundle_local()?;
        let payload = snapshot.to_wire().map_err(SyncError::Encode)?;
        self.transport.push(&payload)?;

        self.store.set_last_sync(started_at)?;
        let status = self.status()?;
        tracing::info!(
            last_sync = %status.last_sync,
            pending = status.pending,
            records = snapshot.record_count(),
            "sync complete"
        );
        Ok(SyncOutcome { status, merge })
    }

    /// Last successful sync and the number of records changed since.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when a document cannot be read.
    pub fn status(&self) -> Result<SyncStatus, StoreError> {
        sync_status(&self.store)
    }
}

/// Copy every local document into a snapshot.
///
/// # Errors
///
/// Returns [`StoreError`] when a document cannot be read.
pub fn bundle<S: DocumentStore>(store: &LocalStore<S>) -> Result<GlobalSnapshot, StoreError> {
    let mut snapshot = GlobalSnapshot {
        meta: SnapshotMeta {
            ranges: store.ranges()?,
            theme: store.theme()?,
            forward: crate::model::ForwardDefaults {
                fields: store.forward_fields()?,
                status: store.status_forward()?,
            },
        },
        ..GlobalSnapshot::default()
    };
    for date in store.dates()? {
        snapshot.dates.insert(date, store.date_snapshot(date)?);
    }
    Ok(snapshot)
}

/// Sync status computed from the store alone.
///
/// # Errors
///
/// Returns [`StoreError`] when a document cannot be read.
pub fn sync_status<S: DocumentStore>(store: &LocalStore<S>) -> Result<SyncStatus, StoreError> {
    let last_sync = store.last_sync()?;
    let mut pending = 0;
    for date in store.dates()? {
        pending += store
            .date_snapshot(date)?
            .values()
            .filter(|record| record.last_modified > last_sync)
            .count();
    }
    Ok(SyncStatus { last_sync, pending })
}
