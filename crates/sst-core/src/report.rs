//! Per-date report over the unit universe.

use chrono::NaiveDate;
use serde::Serialize;

use crate::forward::DateView;
use crate::model::range::units_from_ranges;
use crate::model::{ModifiedAt, StatusKind, StatusSet, Unit};
use crate::store::{DocumentStore, LocalStore, StoreError};

/// Row filters. The default shows every reportable unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    /// Keep units whose effective set shares at least one status with this
    /// set. Empty means no status filter.
    pub statuses: StatusSet,
    /// Keep units whose record was last modified on this (UTC) day.
    pub modified_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub unit: Unit,
    pub statuses: StatusSet,
    pub priority: StatusKind,
    pub multi: bool,
    pub comment: String,
    pub name: String,
    pub phone: String,
    pub last_modified: ModifiedAt,
}

impl ReportRow {
    /// `name / phone`, skipping whichever is empty.
    #[must_use]
    pub fn contact_line(&self) -> String {
        [self.name.as_str(), self.phone.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

/// Build the report for `date`.
///
/// Units whose effective set is exactly `{Locked}` and that carry no comment
/// are omitted. A record's comment is used when the record exists, otherwise
/// the forwarded comment; name and phone fall back to the forward defaults
/// when empty.
///
/// # Errors
///
/// Returns [`StoreError`] when a document cannot be read.
pub fn build_report<S: DocumentStore>(
    store: &LocalStore<S>,
    date: NaiveDate,
    filter: &ReportFilter,
) -> Result<Vec<ReportRow>, StoreError> {
    let units = units_from_ranges(&store.ranges()?);
    let view = DateView::load(store, date)?;
    let forward = store.forward_fields()?;

    let mut rows = Vec::new();
    for unit in units {
        let statuses = view.effective(unit);
        let record = view.records.get(&unit);
        let defaults = forward.get(&unit).cloned().unwrap_or_default();

        let comment = record
            .map_or(defaults.comment.as_str(), |r| r.comment.as_str())
            .trim()
            .to_string();
        if statuses.is_only_locked() && comment.is_empty() {
            continue;
        }
        if !filter.statuses.is_empty() && !statuses.intersects(&filter.statuses) {
            continue;
        }

        let last_modified = record.map(|r| r.last_modified).unwrap_or_default();
        if let Some(day) = filter.modified_on {
            let on_day = last_modified
                .instant()
                .is_some_and(|at| at.date_naive() == day);
            if !on_day {
                continue;
            }
        }

        let pick = |own: Option<&str>, fallback: &str| {
            own.filter(|value| !value.is_empty())
                .unwrap_or(fallback)
                .to_string()
        };
        rows.push(ReportRow {
            unit,
            priority: statuses.priority(),
            multi: statuses.len() > 1,
            comment,
            name: pick(record.map(|r| r.name.as_str()), &defaults.name),
            phone: pick(record.map(|r| r.phone.as_str()), &defaults.phone),
            last_modified,
            statuses,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::edit::{ContactUpdate, set_comment, set_contact, set_statuses};
    use crate::model::UnitRange;
    use crate::store::MemoryStore;

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("date")
    }

    fn fixture() -> (LocalStore<MemoryStore>, ManualClock) {
        let mut store = LocalStore::new(MemoryStore::new());
        store.set_ranges(&[UnitRange::new(1, 6)]).expect("ranges");
        (store, ManualClock::fixture())
    }

    fn set(
        store: &mut LocalStore<MemoryStore>,
        clock: &ManualClock,
        day: &str,
        unit: Unit,
        kinds: &[StatusKind],
    ) {
        set_statuses(store, clock, date(day), unit, kinds.iter().copied().collect())
            .expect("save");
    }

    #[test]
    fn locked_without_comment_is_omitted() -> Result<(), StoreError> {
        let (mut store, clock) = fixture();
        set(&mut store, &clock, "2024-01-10", 1, &[StatusKind::Locked]);
        set(&mut store, &clock, "2024-01-10", 2, &[StatusKind::Locked]);
        set_comment(&mut store, &clock, date("2024-01-10"), 2, "check hinge")?;
        set(&mut store, &clock, "2024-01-10", 3, &[StatusKind::Locked, StatusKind::Issue]);

        let rows = build_report(&store, date("2024-01-10"), &ReportFilter::default())?;
        let units: Vec<Unit> = rows.iter().map(|row| row.unit).collect();
        assert_eq!(units, vec![2, 3, 4, 5, 6]);
        let three = &rows[1];
        assert!(three.multi);
        assert_eq!(three.priority, StatusKind::Issue);
        Ok(())
    }

    #[test]
    fn status_filter_matches_any() -> Result<(), StoreError> {
        let (mut store, clock) = fixture();
        set(&mut store, &clock, "2024-01-10", 1, &[StatusKind::Vacant]);
        set(&mut store, &clock, "2024-01-10", 2, &[StatusKind::Overlocked]);
        set(&mut store, &clock, "2024-01-10", 3, &[StatusKind::Issue, StatusKind::Locked]);

        let filter = ReportFilter {
            statuses: StatusSet::from([StatusKind::Overlocked, StatusKind::Issue]),
            modified_on: None,
        };
        let rows = build_report(&store, date("2024-01-10"), &filter)?;
        let units: Vec<Unit> = rows.iter().map(|row| row.unit).collect();
        assert_eq!(units, vec![2, 3]);
        Ok(())
    }

    #[test]
    fn forwarded_values_fill_missing_records() -> Result<(), StoreError> {
        let (mut store, clock) = fixture();
        set_contact(
            &mut store,
            &clock,
            date("2024-01-10"),
            4,
            ContactUpdate {
                name: Some("Ada".to_string()),
                phone: Some("555-0100".to_string()),
                note: None,
            },
        )?;
        set_comment(&mut store, &clock, date("2024-01-10"), 4, "leak")?;

        let rows = build_report(&store, date("2024-01-11"), &ReportFilter::default())?;
        let row = rows.iter().find(|row| row.unit == 4).expect("row");
        assert_eq!(row.comment, "leak");
        assert_eq!(row.contact_line(), "Ada / 555-0100");
        assert!(row.last_modified.is_never());
        assert!(store.record(date("2024-01-11"), 4)?.is_none());
        Ok(())
    }

    #[test]
    fn modified_on_filter_uses_record_stamp() -> Result<(), StoreError> {
        let (mut store, clock) = fixture();
        set(&mut store, &clock, "2024-01-10", 5, &[StatusKind::Vacant]);

        let filter = ReportFilter {
            statuses: StatusSet::new(),
            modified_on: Some(date("2024-01-10")),
        };
        let rows = build_report(&store, date("2024-01-10"), &filter)?;
        assert_eq!(rows.iter().map(|row| row.unit).collect::<Vec<_>>(), vec![5]);

        let later = ReportFilter {
            modified_on: Some(date("2024-01-11")),
            ..filter
        };
        assert!(build_report(&store, date("2024-01-10"), &later)?.is_empty());
        Ok(())
    }
}
