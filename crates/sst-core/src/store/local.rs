//! Typed view of the document store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

use super::{DocumentStore, StoreError, keys};
use crate::model::record::{format_timestamp, parse_timestamp};
use crate::model::{
    DateSnapshot, ForwardFields, ModifiedAt, StatusSet, Theme, Unit, UnitRange, UnitRecord,
};

/// Key of the document holding `date`'s records.
#[must_use]
pub fn date_key(date: NaiveDate) -> String {
    format!("{}{}", keys::DATE_PREFIX, date.format("%Y-%m-%d"))
}

/// Typed access to every persisted document.
///
/// Missing documents read as their empty value; corrupt ones are errors.
#[derive(Debug)]
pub struct LocalStore<S> {
    docs: S,
    /// Open [`transaction`](Self::transaction) calls.
    depth: u32,
}

impl<S: DocumentStore> LocalStore<S> {
    pub const fn new(docs: S) -> Self {
        Self { docs, depth: 0 }
    }

    /// Run `f` as one atomic read-modify-write.
    ///
    /// Other writers are held off until `f` returns. `Ok` commits and `Err`
    /// rolls back every write made inside `f`. A nested call joins the
    /// outermost transaction.
    ///
    /// # Errors
    ///
    /// Returns the error of `f`, or [`StoreError`] when the transaction cannot
    /// be opened or committed.
    pub fn transaction<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        if self.depth > 0 {
            return f(self);
        }

        self.docs.begin_write()?;
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;

        match result {
            Ok(value) => {
                self.docs.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(error) = self.docs.rollback() {
                    tracing::warn!(%error, "rollback failed");
                }
                Err(err)
            }
        }
    }

    pub const fn documents(&self) -> &S {
        &self.docs
    }

    pub fn into_inner(self) -> S {
        self.docs
    }

    fn read<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T, StoreError> {
        match self.docs.get(key)? {
            None => Ok(T::default()),
            Some(body) if body.trim().is_empty() => Ok(T::default()),
            Some(body) => serde_json::from_str(&body).map_err(|source| StoreError::Corrupt {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn write<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let body = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.docs.put(key, &body)
    }

    // --- meta ---------------------------------------------------------------

    pub fn ranges(&self) -> Result<Vec<UnitRange>, StoreError> {
        self.read(keys::RANGES)
    }

    pub fn set_ranges(&mut self, ranges: &[UnitRange]) -> Result<(), StoreError> {
        self.write(keys::RANGES, &ranges)
    }

    pub fn theme(&self) -> Result<Theme, StoreError> {
        self.read(keys::THEME)
    }

    pub fn set_theme(&mut self, theme: &Theme) -> Result<(), StoreError> {
        self.write(keys::THEME, theme)
    }

    pub fn forward_fields(&self) -> Result<BTreeMap<Unit, ForwardFields>, StoreError> {
        self.read(keys::FORWARD_FIELDS)
    }

    pub fn set_forward_fields(
        &mut self,
        fields: &BTreeMap<Unit, ForwardFields>,
    ) -> Result<(), StoreError> {
        self.write(keys::FORWARD_FIELDS, fields)
    }

    pub fn status_forward(&self) -> Result<BTreeMap<Unit, StatusSet>, StoreError> {
        self.read(keys::FORWARD_STATUS)
    }

    pub fn set_status_forward(
        &mut self,
        statuses: &BTreeMap<Unit, StatusSet>,
    ) -> Result<(), StoreError> {
        self.write(keys::FORWARD_STATUS, statuses)
    }

    // --- dates --------------------------------------------------------------

    /// Every date that has a persisted document, ascending.
    ///
    /// Keys whose suffix is not an ISO date are skipped with a warning.
    pub fn dates(&self) -> Result<Vec<NaiveDate>, StoreError> {
        let mut dates = Vec::new();
        for key in self.docs.keys_with_prefix(keys::DATE_PREFIX)? {
            let suffix = &key[keys::DATE_PREFIX.len()..];
            match NaiveDate::parse_from_str(suffix, "%Y-%m-%d") {
                Ok(date) => dates.push(date),
                Err(error) => tracing::warn!(%key, %error, "ignoring date document with unparseable key"),
            }
        }
        dates.sort_unstable();
        Ok(dates)
    }

    pub fn date_snapshot(&self, date: NaiveDate) -> Result<DateSnapshot, StoreError> {
        self.read(&date_key(date))
    }

    pub fn set_date_snapshot(
        &mut self,
        date: NaiveDate,
        snapshot: &DateSnapshot,
    ) -> Result<(), StoreError> {
        self.write(&date_key(date), snapshot)
    }

    pub fn record(&self, date: NaiveDate, unit: Unit) -> Result<Option<UnitRecord>, StoreError> {
        Ok(self.date_snapshot(date)?.remove(&unit))
    }

    // --- sync bookkeeping ---------------------------------------------------

    /// Start instant of the last successful sync, `Never` if none.
    ///
    /// Stored as a bare ISO string, not JSON.
    pub fn last_sync(&self) -> Result<ModifiedAt, StoreError> {
        let Some(raw) = self.docs.get(keys::LAST_SYNC)? else {
            return Ok(ModifiedAt::Never);
        };
        let raw = raw.trim().trim_matches('"');
        if raw.is_empty() {
            return Ok(ModifiedAt::Never);
        }
        parse_timestamp(raw)
            .map(ModifiedAt::At)
            .map_err(|error| StoreError::Corrupt {
                key: keys::LAST_SYNC.to_string(),
                source: serde::de::Error::custom(error),
            })
    }

    pub fn set_last_sync(&mut self, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.docs.put(keys::LAST_SYNC, &format_timestamp(at))
    }

    /// Remove every document: ranges, defaults, dates, and sync state.
    pub fn wipe(&mut self) -> Result<(), StoreError> {
        self.docs.clear()
    }

    pub fn change_counter(&self) -> Result<u64, StoreError> {
        self.docs.change_counter()
    }
}
