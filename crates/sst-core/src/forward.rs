//! Forward-fill resolution of a unit's effective statuses.
//!
//! Every caller that shows, filters, or reports statuses goes through
//! [`effective_statuses`]. Nothing else decides which set applies.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::model::{DateSnapshot, StatusSet, Unit};
use crate::store::{DocumentStore, LocalStore, StoreError};

/// Resolve from already-loaded documents.
///
/// The date record's set wins when non-empty; otherwise the unit's forward
/// status default; otherwise the empty set.
#[must_use]
pub fn resolve(
    date_records: &DateSnapshot,
    status_forward: &BTreeMap<Unit, StatusSet>,
    unit: Unit,
) -> StatusSet {
    match date_records.get(&unit) {
        Some(record) if !record.statuses.is_empty() => record.statuses.clone(),
        _ => status_forward.get(&unit).cloned().unwrap_or_default(),
    }
}

/// Effective statuses for `unit` on `date`.
///
/// Read-only: never creates the record.
///
/// # Errors
///
/// Returns [`StoreError`] when a document cannot be read.
pub fn effective_statuses<S: DocumentStore>(
    store: &LocalStore<S>,
    date: NaiveDate,
    unit: Unit,
) -> Result<StatusSet, StoreError> {
    let records = store.date_snapshot(date)?;
    let forward = store.status_forward()?;
    Ok(resolve(&records, &forward, unit))
}

/// Snapshot of the documents the resolver needs for one date, for callers
/// that resolve many units at once.
#[derive(Debug, Clone)]
pub struct DateView {
    pub date: NaiveDate,
    pub records: DateSnapshot,
    pub status_forward: BTreeMap<Unit, StatusSet>,
}

impl DateView {
    /// Load the date's records and the forward statuses.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when a document cannot be read.
    pub fn load<S: DocumentStore>(store: &LocalStore<S>, date: NaiveDate) -> Result<Self, StoreError> {
        Ok(Self {
            date,
            records: store.date_snapshot(date)?,
            status_forward: store.status_forward()?,
        })
    }

    #[must_use]
    pub fn effective(&self, unit: Unit) -> StatusSet {
        resolve(&self.records, &self.status_forward, unit)
    }
}
