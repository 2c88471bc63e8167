//! `GlobalSnapshot`: the unit exchanged with the remote during sync.
//!
//! Wire shape:
//!
//! ```text
//! { "version": 1,
//!   "meta": { "ranges": [{"start":1,"end":80}],
//!             "theme": { ... },
//!             "forward": { "fields": { "<unit>": {comment,name,phone,note} },
//!                          "status": { "<unit>": ["Locked", ...] } } },
//!   "dates": { "2024-01-10": { "<unit>": UnitRecord } } }
//! ```
//!
//! Containers that arrive as `null` read as empty. Anything else that does not
//! fit the shape is rejected as a whole; a snapshot is never half-parsed.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use super::range::{Unit, UnitRange};
use super::record::{ForwardFields, ModifiedAt, UnitRecord};
use super::status::StatusSet;

/// Highest snapshot schema version this build reads and the one it writes.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Every record for one calendar date.
pub type DateSnapshot = BTreeMap<Unit, UnitRecord>;

/// Opaque per-unit display metadata carried alongside the ranges.
pub type Theme = serde_json::Map<String, serde_json::Value>;

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

const fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

/// Forward defaults for every unit that has any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardDefaults {
    #[serde(default, deserialize_with = "null_as_default")]
    pub fields: BTreeMap<Unit, ForwardFields>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: BTreeMap<Unit, StatusSet>,
}

/// Configuration half of a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    #[serde(default, deserialize_with = "null_as_default")]
    pub ranges: Vec<UnitRange>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub theme: Theme,
    #[serde(default, deserialize_with = "null_as_default")]
    pub forward: ForwardDefaults,
}

/// Complete point-in-time copy of one device's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSnapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: SnapshotMeta,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dates: BTreeMap<NaiveDate, DateSnapshot>,
}

impl Default for GlobalSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            meta: SnapshotMeta::default(),
            dates: BTreeMap::new(),
        }
    }
}

/// Why a remote body could not be turned into a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot body is not valid: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("snapshot version {0} is not a valid schema version")]
    InvalidVersion(u32),
    #[error("snapshot version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

impl GlobalSnapshot {
    /// Parse and validate a wire body.
    ///
    /// An empty body or a JSON `null` is an empty snapshot (a fresh remote).
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] when the body does not match the wire shape
    /// or carries a version this build cannot read.
    pub fn from_wire(body: &str) -> Result<Self, SnapshotError> {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }

        let parsed: Option<Self> = serde_json::from_str(trimmed)?;
        let snapshot = parsed.unwrap_or_default();
        if snapshot.version == 0 {
            return Err(SnapshotError::InvalidVersion(0));
        }
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        Ok(snapshot)
    }

    /// Serialize for the wire.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; with the types used here that only
    /// happens on allocation failure or a non-string theme key.
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Number of records across all dates.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.dates.values().map(BTreeMap::len).sum()
    }

    /// Records whose `lastModified` is strictly after `since`.
    #[must_use]
    pub fn count_modified_after(&self, since: ModifiedAt) -> usize {
        self.dates
            .values()
            .flat_map(BTreeMap::values)
            .filter(|record| record.last_modified > since)
            .count()
    }

    /// Look up one record.
    #[must_use]
    pub fn record(&self, date: NaiveDate, unit: Unit) -> Option<&UnitRecord> {
        self.dates.get(&date).and_then(|units| units.get(&unit))
    }
}
