//! Local edit operations: lazy record creation, saves, and forward defaults.
//!
//! A save hands the caller a mutable [`RecordContent`]; the timestamp and
//! history are maintained here and cannot be touched by the updater. A save
//! that leaves the content unchanged writes nothing and reports
//! [`SaveOutcome::Unchanged`], which callers use to decide whether to emit a
//! "changed" signal.
//!
//! Every operation here is one store transaction, so an edit and a
//! concurrent merge from another process never overwrite each other.

use chrono::{DateTime, NaiveDate, Utc};

use crate::clock::Clock;
use crate::model::meta::normalize_tags;
use crate::model::{ModifiedAt, RecordContent, StatusKind, StatusSet, Unit, UnitMeta, UnitRecord};
use crate::store::{DocumentStore, LocalStore, StoreError, keys};

/// Result of a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Content changed; the record was stamped with this instant.
    Changed(DateTime<Utc>),
    /// Content was identical; nothing was written.
    Unchanged,
}

impl SaveOutcome {
    #[must_use]
    pub const fn is_changed(self) -> bool {
        matches!(self, Self::Changed(_))
    }
}

/// Contact fields to overwrite; `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub note: Option<String>,
}

/// Size and type tags to replace; `None` leaves a list as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaUpdate {
    pub sizes: Option<Vec<String>>,
    pub types: Option<Vec<String>>,
}

/// Return the record for `(date, unit)`, creating and persisting it from the
/// unit's forward defaults on first access.
///
/// # Errors
///
/// Returns [`StoreError`] when a document cannot be read or written.
pub fn ensure_unit_record<S: DocumentStore>(
    store: &mut LocalStore<S>,
    date: NaiveDate,
    unit: Unit,
) -> Result<UnitRecord, StoreError> {
    store.transaction(|store| {
        let mut records = store.date_snapshot(date)?;
        if let Some(existing) = records.get(&unit) {
            return Ok(existing.clone());
        }

        let fields = store.forward_fields()?;
        let statuses = store.status_forward()?;
        let record = UnitRecord::seeded(fields.get(&unit), statuses.get(&unit));
        records.insert(unit, record.clone());
        store.set_date_snapshot(date, &records)?;
        tracing::debug!(%date, unit, "created record from forward defaults");
        Ok(record)
    })
}

/// Apply `update` to the record's content and persist it if anything changed.
///
/// On change: stamps `lastModified` (monotonic per record), appends one
/// history entry, replaces the unit's forward status set, and folds the
/// record's non-empty fields into its forward field defaults.
///
/// # Errors
///
/// Returns [`StoreError`] when a document cannot be read or written.
pub fn save_unit_change<S, C, F>(
    store: &mut LocalStore<S>,
    clock: &C,
    date: NaiveDate,
    unit: Unit,
    update: F,
) -> Result<SaveOutcome, StoreError>
where
    S: DocumentStore,
    C: Clock + ?Sized,
    F: FnOnce(&mut RecordContent),
{
    store.transaction(|store| {
        let mut record = ensure_unit_record(store, date, unit)?;
        let before = record.content();
        let mut after = before.clone();
        update(&mut after);
        if after == before {
            return Ok(SaveOutcome::Unchanged);
        }

        let RecordContent {
            statuses,
            comment,
            name,
            phone,
            note,
        } = after;
        record.statuses = statuses;
        record.comment = comment;
        record.name = name;
        record.phone = phone;
        record.note = note;
        let stamp = record.record_change(clock.now());

        let mut records = store.date_snapshot(date)?;
        records.insert(unit, record.clone());
        store.set_date_snapshot(date, &records)?;

        let mut status_forward = store.status_forward()?;
        status_forward.insert(unit, record.statuses.clone());
        store.set_status_forward(&status_forward)?;

        let mut fields = store.forward_fields()?;
        let previous = fields.remove(&unit).unwrap_or_default();
        fields.insert(unit, previous.absorb(&record));
        store.set_forward_fields(&fields)?;

        tracing::debug!(%date, unit, stamp = %ModifiedAt::At(stamp), "saved unit change");
        Ok(SaveOutcome::Changed(stamp))
    })
}

/// Flip one status on the unit's record for `date`.
///
/// # Errors
///
/// Returns [`StoreError`] when a document cannot be read or written.
pub fn toggle_status<S: DocumentStore, C: Clock + ?Sized>(
    store: &mut LocalStore<S>,
    clock: &C,
    date: NaiveDate,
    unit: Unit,
    kind: StatusKind,
) -> Result<SaveOutcome, StoreError> {
    save_unit_change(store, clock, date, unit, |content| {
        content.statuses.toggle(kind);
    })
}

/// Replace the record's whole status set.
///
/// # Errors
///
/// Returns [`StoreError`] when a document cannot be read or written.
pub fn set_statuses<S: DocumentStore, C: Clock + ?Sized>(
    store: &mut LocalStore<S>,
    clock: &C,
    date: NaiveDate,
    unit: Unit,
    statuses: StatusSet,
) -> Result<SaveOutcome, StoreError> {
    save_unit_change(store, clock, date, unit, |content| {
        content.statuses = statuses;
    })
}

/// # Errors
///
/// Returns [`StoreError`] when a document cannot be read or written.
pub fn set_comment<S: DocumentStore, C: Clock + ?Sized>(
    store: &mut LocalStore<S>,
    clock: &C,
    date: NaiveDate,
    unit: Unit,
    comment: &str,
) -> Result<SaveOutcome, StoreError> {
    save_unit_change(store, clock, date, unit, |content| {
        content.comment = comment.to_string();
    })
}

/// # Errors
///
/// Returns [`StoreError`] when a document cannot be read or written.
pub fn set_contact<S: DocumentStore, C: Clock + ?Sized>(
    store: &mut LocalStore<S>,
    clock: &C,
    date: NaiveDate,
    unit: Unit,
    contact: ContactUpdate,
) -> Result<SaveOutcome, StoreError> {
    save_unit_change(store, clock, date, unit, |content| {
        if let Some(name) = contact.name {
            content.name = name;
        }
        if let Some(phone) = contact.phone {
            content.phone = phone;
        }
        if let Some(note) = contact.note {
            content.note = note;
        }
    })
}

/// Stop carrying the unit's comment forward. Dated records are untouched.
///
/// Returns `true` when a forwarded comment was cleared.
///
/// # Errors
///
/// Returns [`StoreError`] when a document cannot be read or written.
pub fn clear_forward_comment<S: DocumentStore>(
    store: &mut LocalStore<S>,
    unit: Unit,
) -> Result<bool, StoreError> {
    store.transaction(|store| {
        let mut fields = store.forward_fields()?;
        match fields.get_mut(&unit) {
            Some(entry) if !entry.comment.is_empty() => {
                entry.comment.clear();
                store.set_forward_fields(&fields)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    })
}

/// The unit's size and type tags.
///
/// # Errors
///
/// Returns [`StoreError`] when the theme cannot be read or the unit's entry
/// is malformed.
pub fn unit_meta<S: DocumentStore>(
    store: &LocalStore<S>,
    unit: Unit,
) -> Result<UnitMeta, StoreError> {
    UnitMeta::from_theme(&store.theme()?, unit).map_err(|source| StoreError::Corrupt {
        key: keys::THEME.to_string(),
        source,
    })
}

/// Replace the unit's size and/or type tags. Tags are trimmed and
/// de-duplicated. Undated: no record, history, or stamp is touched.
///
/// Returns the unit's tags after the update and whether anything changed.
///
/// # Errors
///
/// Returns [`StoreError`] when the theme cannot be read or written.
pub fn set_unit_meta<S: DocumentStore>(
    store: &mut LocalStore<S>,
    unit: Unit,
    update: MetaUpdate,
) -> Result<(UnitMeta, bool), StoreError> {
    store.transaction(|store| {
        let before = unit_meta(store, unit)?;
        let mut after = before.clone();
        if let Some(sizes) = update.sizes {
            after.sizes = normalize_tags(&sizes);
        }
        if let Some(types) = update.types {
            after.types = normalize_tags(&types);
        }
        if after == before {
            return Ok((after, false));
        }

        let mut theme = store.theme()?;
        after
            .write_to(&mut theme, unit)
            .map_err(|source| StoreError::Encode {
                key: keys::THEME.to_string(),
                source,
            })?;
        store.set_theme(&theme)?;
        tracing::debug!(unit, sizes = ?after.sizes, types = ?after.types, "saved unit meta");
        Ok((after, true))
    })
}

/// Most recent `lastModified` among `date`'s records.
///
/// # Errors
///
/// Returns [`StoreError`] when the date document cannot be read.
pub fn last_updated<S: DocumentStore>(
    store: &LocalStore<S>,
    date: NaiveDate,
) -> Result<ModifiedAt, StoreError> {
    Ok(store
        .date_snapshot(date)?
        .values()
        .map(|record| record.last_modified)
        .max()
        .unwrap_or_default())
}
