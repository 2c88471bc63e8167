//! Inclusive unit ranges and the unit universe they define.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage unit number.
pub type Unit = u32;

/// Number of units in a range appended by [`next_range`].
pub const APPENDED_RANGE_LEN: u32 = 10;

/// Most units a single range may cover.
pub const MAX_RANGE_LEN: u32 = 10_000;

/// Inclusive `start..=end` span of unit numbers.
///
/// A range with `end < start`, or one wider than [`MAX_RANGE_LEN`], is kept
/// as written and contributes no units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitRange {
    pub start: Unit,
    pub end: Unit,
}

impl UnitRange {
    #[must_use]
    pub const fn new(start: Unit, end: Unit) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.end >= self.start && !self.is_oversized()
    }

    /// `true` when the range spans more than [`MAX_RANGE_LEN`] units.
    #[must_use]
    pub const fn is_oversized(self) -> bool {
        self.end >= self.start && self.end - self.start >= MAX_RANGE_LEN
    }

    #[must_use]
    pub const fn contains(self, unit: Unit) -> bool {
        self.is_valid() && unit >= self.start && unit <= self.end
    }
}

impl fmt::Display for UnitRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseRangeError {
    #[error("invalid range '{0}': expected START-END or a single unit")]
    Syntax(String),
    #[error("range '{0}' covers more than {MAX_RANGE_LEN} units")]
    TooWide(String),
}

impl FromStr for UnitRange {
    type Err = ParseRangeError;

    /// `12-20`, or `7` for a single unit. Inverted ranges parse as written;
    /// ranges wider than [`MAX_RANGE_LEN`] are rejected.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let err = || ParseRangeError::Syntax(raw.to_string());
        let trimmed = raw.trim();
        let (start, end) = trimmed.split_once('-').unwrap_or((trimmed, trimmed));
        let start = start.trim().parse().map_err(|_| err())?;
        let end = end.trim().parse().map_err(|_| err())?;
        let range = Self::new(start, end);
        if range.is_oversized() {
            return Err(ParseRangeError::TooWide(raw.to_string()));
        }
        Ok(range)
    }
}

/// Expand ranges into the ordered unit list: range order, then numeric order.
///
/// Inverted and oversized ranges are dropped. Overlapping ranges yield a unit
/// once per range that contains it.
#[must_use]
pub fn units_from_ranges(ranges: &[UnitRange]) -> Vec<Unit> {
    ranges
        .iter()
        .filter(|range| range.is_valid())
        .flat_map(|range| range.start..=range.end)
        .collect()
}

/// The range appended after the last one: ten units starting right after it.
#[must_use]
pub fn next_range(ranges: &[UnitRange]) -> UnitRange {
    let start = ranges
        .last()
        .map_or(1, |last| last.end.saturating_add(1));
    UnitRange::new(start, start.saturating_add(APPENDED_RANGE_LEN - 1))
}

/// Compact a list of units into sorted, contiguous ranges of at most
/// [`MAX_RANGE_LEN`] units each.
#[must_use]
pub fn compact_units_to_ranges(units: &[Unit]) -> Vec<UnitRange> {
    let mut sorted = units.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut out: Vec<UnitRange> = Vec::new();
    for unit in sorted {
        match out.last_mut() {
            Some(current)
                if current.end.checked_add(1) == Some(unit)
                    && unit - current.start < MAX_RANGE_LEN =>
            {
                current.end = unit;
            }
            _ => out.push(UnitRange::new(unit, unit)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expansion_follows_range_order() {
        let ranges = [UnitRange::new(10, 12), UnitRange::new(1, 2)];
        assert_eq!(units_from_ranges(&ranges), vec![10, 11, 12, 1, 2]);
    }

    #[test]
    fn inverted_ranges_are_dropped_not_normalized() {
        let ranges = [UnitRange::new(5, 3), UnitRange::new(7, 7)];
        assert_eq!(units_from_ranges(&ranges), vec![7]);
        assert!(!ranges[0].contains(4));
    }

    #[test]
    fn oversized_ranges_contribute_nothing() {
        let whole_space = UnitRange::new(0, u32::MAX);
        assert!(whole_space.is_oversized());
        assert!(!whole_space.contains(5));
        assert_eq!(units_from_ranges(&[whole_space, UnitRange::new(1, 2)]), vec![1, 2]);

        let widest = UnitRange::new(1, MAX_RANGE_LEN);
        assert!(widest.is_valid());
        assert_eq!(
            units_from_ranges(&[widest]).len(),
            usize::try_from(MAX_RANGE_LEN).expect("fits")
        );
    }

    #[test]
    fn next_range_starts_after_last() {
        assert_eq!(next_range(&[]), UnitRange::new(1, 10));
        assert_eq!(
            next_range(&[UnitRange::new(1, 80)]),
            UnitRange::new(81, 90)
        );
    }

    #[test]
    fn parses_spans_and_single_units() {
        assert_eq!("81-90".parse(), Ok(UnitRange::new(81, 90)));
        assert_eq!(" 7 ".parse(), Ok(UnitRange::new(7, 7)));
        assert_eq!("9-3".parse(), Ok(UnitRange::new(9, 3)));
        assert!("a-3".parse::<UnitRange>().is_err());
        assert!("1-".parse::<UnitRange>().is_err());
        assert_eq!(
            "0-4294967295".parse::<UnitRange>(),
            Err(ParseRangeError::TooWide("0-4294967295".to_string()))
        );
    }

    #[test]
    fn compaction_merges_runs() {
        assert_eq!(
            compact_units_to_ranges(&[5, 1, 2, 3, 3, 9, 10]),
            vec![
                UnitRange::new(1, 3),
                UnitRange::new(5, 5),
                UnitRange::new(9, 10)
            ]
        );
        assert!(compact_units_to_ranges(&[]).is_empty());

        let run: Vec<Unit> = (1..=MAX_RANGE_LEN + 5).collect();
        assert_eq!(
            compact_units_to_ranges(&run),
            vec![
                UnitRange::new(1, MAX_RANGE_LEN),
                UnitRange::new(MAX_RANGE_LEN + 1, MAX_RANGE_LEN + 5)
            ]
        );
    }
}
