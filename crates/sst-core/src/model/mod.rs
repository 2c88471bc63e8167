//! Document model shared by the store, the resolver, and the sync engine.

pub mod meta;
pub mod range;
pub mod record;
pub mod snapshot;
pub mod status;

pub use meta::UnitMeta;
pub use range::{ParseRangeError, Unit, UnitRange};
pub use record::{ForwardFields, HistoryEntry, ModifiedAt, RecordContent, UnitRecord};
pub use snapshot::{DateSnapshot, ForwardDefaults, GlobalSnapshot, SnapshotMeta, Theme};
pub use status::{StatusKind, StatusSet};
