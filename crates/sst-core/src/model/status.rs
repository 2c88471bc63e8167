//! Unit status kinds and the set type records carry.
//!
//! A record holds any combination of the four kinds. Membership is all that
//! matters: the wire form is a JSON array, duplicates collapse on read, and
//! the in-memory order is the enum order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// One status a unit can be in on a given date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    Locked,
    Vacant,
    Overlocked,
    Issue,
}

impl StatusKind {
    /// Every kind, in canonical order.
    pub const ALL: [Self; 4] = [Self::Locked, Self::Vacant, Self::Overlocked, Self::Issue];

    /// Wire/display name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Locked => "Locked",
            Self::Vacant => "Vacant",
            Self::Overlocked => "Overlocked",
            Self::Issue => "Issue",
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status '{0}' (expected one of: locked, vacant, overlocked, issue)")]
pub struct ParseStatusError(pub String);

impl FromStr for StatusKind {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "locked" | "l" => Ok(Self::Locked),
            "vacant" | "v" => Ok(Self::Vacant),
            "overlocked" | "o" => Ok(Self::Overlocked),
            "issue" | "i" => Ok(Self::Issue),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

/// Set of statuses held by a record or a forward default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusSet(BTreeSet<StatusKind>);

impl StatusSet {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn contains(&self, kind: StatusKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn insert(&mut self, kind: StatusKind) -> bool {
        self.0.insert(kind)
    }

    pub fn remove(&mut self, kind: StatusKind) -> bool {
        self.0.remove(&kind)
    }

    /// Flip membership of `kind`. Returns `true` when it is now present.
    pub fn toggle(&mut self, kind: StatusKind) -> bool {
        if self.0.remove(&kind) {
            false
        } else {
            self.0.insert(kind);
            true
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = StatusKind> + '_ {
        self.0.iter().copied()
    }

    /// True when the set shares at least one kind with `filter`.
    #[must_use]
    pub fn intersects(&self, filter: &Self) -> bool {
        self.0.iter().any(|kind| filter.0.contains(kind))
    }

    /// The single kind that colors a unit: Issue > Overlocked > Locked > Vacant.
    ///
    /// An empty set reads as `Vacant`.
    #[must_use]
    pub fn priority(&self) -> StatusKind {
        if self.contains(StatusKind::Issue) {
            StatusKind::Issue
        } else if self.contains(StatusKind::Overlocked) {
            StatusKind::Overlocked
        } else if self.contains(StatusKind::Locked) {
            StatusKind::Locked
        } else {
            StatusKind::Vacant
        }
    }

    /// One-letter mark used in printed sheets. Locked and empty sets print blank.
    #[must_use]
    pub fn sheet_mark(&self) -> &'static str {
        if self.contains(StatusKind::Issue) {
            "I"
        } else if self.contains(StatusKind::Overlocked) {
            "O"
        } else if self.contains(StatusKind::Vacant) {
            "V"
        } else {
            ""
        }
    }

    /// True for exactly `{Locked}`, the "nothing to report" state.
    #[must_use]
    pub fn is_only_locked(&self) -> bool {
        self.0.len() == 1 && self.contains(StatusKind::Locked)
    }
}

impl FromIterator<StatusKind> for StatusSet {
    fn from_iter<I: IntoIterator<Item = StatusKind>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[StatusKind; N]> for StatusSet {
    fn from(kinds: [StatusKind; N]) -> Self {
        kinds.into_iter().collect()
    }
}

impl fmt::Display for StatusSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("—");
        }
        let names: Vec<&str> = self.iter().map(StatusKind::as_str).collect();
        f.write_str(&names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_collapse_on_read() {
        let set: StatusSet =
            serde_json::from_str(r#"["Locked","Issue","Locked"]"#).expect("parse");
        assert_eq!(set.len(), 2);
        assert_eq!(
            serde_json::to_string(&set).expect("serialize"),
            r#"["Locked","Issue"]"#
        );
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(serde_json::from_str::<StatusSet>(r#"["Flooded"]"#).is_err());
    }

    #[test]
    fn priority_order() {
        assert_eq!(StatusSet::new().priority(), StatusKind::Vacant);
        assert_eq!(
            StatusSet::from([StatusKind::Locked, StatusKind::Vacant]).priority(),
            StatusKind::Locked
        );
        assert_eq!(
            StatusSet::from([StatusKind::Locked, StatusKind::Overlocked]).priority(),
            StatusKind::Overlocked
        );
        assert_eq!(
            StatusSet::from([StatusKind::Overlocked, StatusKind::Issue]).priority(),
            StatusKind::Issue
        );
    }

    #[test]
    fn sheet_marks() {
        assert_eq!(StatusSet::from([StatusKind::Locked]).sheet_mark(), "");
        assert_eq!(StatusSet::from([StatusKind::Vacant]).sheet_mark(), "V");
        assert_eq!(
            StatusSet::from([StatusKind::Vacant, StatusKind::Overlocked]).sheet_mark(),
            "O"
        );
        assert_eq!(
            StatusSet::from([StatusKind::Issue, StatusKind::Overlocked]).sheet_mark(),
            "I"
        );
    }

    #[test]
    fn toggle_flips_membership() {
        let mut set = StatusSet::new();
        assert!(set.toggle(StatusKind::Overlocked));
        assert!(set.contains(StatusKind::Overlocked));
        assert!(!set.toggle(StatusKind::Overlocked));
        assert!(set.is_empty());
    }

    #[test]
    fn parse_accepts_names_and_letters() {
        assert_eq!("Overlocked".parse::<StatusKind>(), Ok(StatusKind::Overlocked));
        assert_eq!("i".parse::<StatusKind>(), Ok(StatusKind::Issue));
        assert!("sealed".parse::<StatusKind>().is_err());
    }
}
