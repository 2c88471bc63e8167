//! Navigation state for a front end: selected date, unit list, cursor.
//!
//! The engine and resolver never read this; it is passed explicitly to the
//! code that renders or navigates.

use chrono::NaiveDate;

use crate::forward::DateView;
use crate::model::range::units_from_ranges;
use crate::model::{StatusKind, Unit};
use crate::store::{DocumentStore, LocalStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub date: NaiveDate,
    pub units: Vec<Unit>,
    pub idx: usize,
    pub overlocked_only: bool,
}

impl AppState {
    /// State for `date` with the unit list built from the stored ranges.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the ranges document cannot be read.
    pub fn load<S: DocumentStore>(
        store: &LocalStore<S>,
        date: NaiveDate,
    ) -> Result<Self, StoreError> {
        let mut state = Self {
            date,
            units: Vec::new(),
            idx: 0,
            overlocked_only: false,
        };
        state.rebuild_units(store)?;
        Ok(state)
    }

    /// Re-expand the unit list after a range edit. The cursor stays on the
    /// same unit when it still exists, otherwise it is clamped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the ranges document cannot be read.
    pub fn rebuild_units<S: DocumentStore>(
        &mut self,
        store: &LocalStore<S>,
    ) -> Result<(), StoreError> {
        let current = self.current();
        self.units = units_from_ranges(&store.ranges()?);
        self.idx = current
            .and_then(|unit| self.units.iter().position(|u| *u == unit))
            .unwrap_or_else(|| self.idx.min(self.units.len().saturating_sub(1)));
        Ok(())
    }

    /// Units shown for the selected date, filtered to overlocked units when
    /// the filter is on.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when a document cannot be read.
    pub fn visible_units<S: DocumentStore>(
        &self,
        store: &LocalStore<S>,
    ) -> Result<Vec<Unit>, StoreError> {
        if !self.overlocked_only {
            return Ok(self.units.clone());
        }
        let view = DateView::load(store, self.date)?;
        Ok(self
            .units
            .iter()
            .copied()
            .filter(|unit| view.effective(*unit).contains(StatusKind::Overlocked))
            .collect())
    }

    #[must_use]
    pub fn current(&self) -> Option<Unit> {
        self.units.get(self.idx).copied()
    }

    /// Move to the next unit; stays put on the last one.
    pub fn next(&mut self) -> Option<Unit> {
        if self.idx + 1 < self.units.len() {
            self.idx += 1;
        }
        self.current()
    }

    /// Move to the previous unit; stays put on the first one.
    pub fn prev(&mut self) -> Option<Unit> {
        self.idx = self.idx.saturating_sub(1);
        self.current()
    }

    /// Jump to `unit`. Returns `false` when it is not in the unit list.
    pub fn goto(&mut self, unit: Unit) -> bool {
        match self.units.iter().position(|u| *u == unit) {
            Some(idx) => {
                self.idx = idx;
                true
            }
            None => false,
        }
    }

    pub const fn set_date(&mut self, date: NaiveDate) {
        self.date = date;
    }
}
