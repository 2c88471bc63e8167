//! Reconciliation of local state with a remote snapshot.
//!
//! [`transport`] moves snapshot bodies, [`merge`] folds a remote snapshot
//! into the local store, and [`engine`] runs the pull/merge/push cycle.

pub mod engine;
pub mod merge;
pub mod transport;

pub use engine::{SyncEngine, SyncError, SyncOutcome, SyncStatus, bundle, sync_status};
pub use merge::{MergeReport, RecordTally};
pub use transport::{Direction, SharedRemote, SnapshotTransport, TransportError};
