//! Per-`(date, unit)` records, their history, and forward defaults.
//!
//! # Timestamps
//!
//! `lastModified` is a [`ModifiedAt`]: either [`ModifiedAt::Never`] (JSON
//! `null`, an absent field, or an empty string) or an instant with millisecond
//! precision. `Never` orders below every instant, so "absent" and "the epoch"
//! are never confused when records are compared during a merge.

use chrono::{DateTime, SecondsFormat, TimeDelta, TimeZone, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::status::StatusSet;

/// Format an instant the way the wire and the store carry it.
#[must_use]
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC 3339 instant, normalizing to UTC at millisecond precision.
///
/// # Errors
///
/// Returns the chrono parse error for anything that is not RFC 3339.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw.trim()).map(|ts| truncate_to_millis(ts.with_timezone(&Utc)))
}

/// Drop sub-millisecond precision so a stamp survives a wire round-trip.
#[must_use]
pub fn truncate_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ts.timestamp_millis())
        .single()
        .unwrap_or(ts)
}

/// Serde adapter for required timestamps (`HistoryEntry::at`).
mod wire_timestamp {
    use super::{DateTime, Deserialize, Deserializer, Serializer, Utc, format_timestamp, parse_timestamp};
    use serde::de::Error as _;

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_timestamp(*ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).map_err(|e| D::Error::custom(format!("invalid timestamp '{raw}': {e}")))
    }
}

// ---------------------------------------------------------------------------
// ModifiedAt
// ---------------------------------------------------------------------------

/// Last content-changing mutation of a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModifiedAt {
    /// Never modified (created lazily or received without a stamp).
    #[default]
    Never,
    /// Modified at this instant.
    At(DateTime<Utc>),
}

impl ModifiedAt {
    #[must_use]
    pub fn at(ts: DateTime<Utc>) -> Self {
        Self::At(truncate_to_millis(ts))
    }

    #[must_use]
    pub const fn instant(self) -> Option<DateTime<Utc>> {
        match self {
            Self::Never => None,
            Self::At(ts) => Some(ts),
        }
    }

    #[must_use]
    pub const fn is_never(self) -> bool {
        matches!(self, Self::Never)
    }

    /// Stamp for a mutation happening at `now`, never earlier than or equal
    /// to `self`. A clock that reads at or before the previous stamp yields
    /// the previous stamp plus one millisecond.
    #[must_use]
    pub fn advance(self, now: DateTime<Utc>) -> DateTime<Utc> {
        let now = truncate_to_millis(now);
        match self {
            Self::At(previous) if now <= previous => previous + TimeDelta::milliseconds(1),
            _ => now,
        }
    }
}

impl From<DateTime<Utc>> for ModifiedAt {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::at(ts)
    }
}

impl fmt::Display for ModifiedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Never => f.write_str("never"),
            Self::At(ts) => f.write_str(&format_timestamp(*ts)),
        }
    }
}

impl Serialize for ModifiedAt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Never => serializer.serialize_none(),
            Self::At(ts) => serializer.serialize_str(&format_timestamp(*ts)),
        }
    }
}

impl<'de> Deserialize<'de> for ModifiedAt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(Self::Never),
            Some(text) => parse_timestamp(text)
                .map(Self::At)
                .map_err(|e| D::Error::custom(format!("invalid lastModified '{text}': {e}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Record content
// ---------------------------------------------------------------------------

/// The user-editable part of a record; what a history entry captures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordContent {
    pub statuses: StatusSet,
    pub comment: String,
    pub name: String,
    pub phone: String,
    pub note: String,
}

/// One appended history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "t", with = "wire_timestamp")]
    pub at: DateTime<Utc>,
    #[serde(rename = "data")]
    pub snapshot: RecordContent,
}

/// Status and contact record for one unit on one date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UnitRecord {
    pub statuses: StatusSet,
    pub comment: String,
    pub name: String,
    pub phone: String,
    pub note: String,
    pub last_modified: ModifiedAt,
    pub history: Vec<HistoryEntry>,
}

impl UnitRecord {
    /// A new, never-modified record seeded from the unit's forward defaults.
    #[must_use]
    pub fn seeded(fields: Option<&ForwardFields>, statuses: Option<&StatusSet>) -> Self {
        let fields = fields.cloned().unwrap_or_default();
        Self {
            statuses: statuses.cloned().unwrap_or_default(),
            comment: fields.comment,
            name: fields.name,
            phone: fields.phone,
            note: fields.note,
            last_modified: ModifiedAt::Never,
            history: Vec::new(),
        }
    }

    #[must_use]
    pub fn content(&self) -> RecordContent {
        RecordContent {
            statuses: self.statuses.clone(),
            comment: self.comment.clone(),
            name: self.name.clone(),
            phone: self.phone.clone(),
            note: self.note.clone(),
        }
    }

    /// Stamp a content change made at `now` and append its history entry.
    ///
    /// Returns the stamp used.
    pub fn record_change(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let stamp = self.last_modified.advance(now);
        self.last_modified = ModifiedAt::At(stamp);
        self.history.push(HistoryEntry {
            at: stamp,
            snapshot: self.content(),
        });
        stamp
    }
}

/// Last known non-empty contact fields for a unit, independent of date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardFields {
    pub comment: String,
    pub name: String,
    pub phone: String,
    pub note: String,
}

impl ForwardFields {
    /// Fold a saved record into the defaults. Non-empty record fields win;
    /// empty ones leave the existing default in place.
    #[must_use]
    pub fn absorb(&self, record: &UnitRecord) -> Self {
        fn prefer(latest: &str, previous: &str) -> String {
            let chosen = if latest.is_empty() { previous } else { latest };
            chosen.to_string()
        }

        Self {
            comment: prefer(&record.comment, &self.comment),
            name: prefer(&record.name, &self.name),
            phone: prefer(&record.phone, &self.phone),
            note: prefer(&record.note, &self.note),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.comment.is_empty() && self.name.is_empty() && self.phone.is_empty() && self.note.is_empty()
    }
}
