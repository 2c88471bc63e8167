//! Record-level merge of a remote snapshot into local state.
//!
//! # Merge semantics
//!
//! For every `(date, unit)` in the remote snapshot:
//!
//! - no local record: adopt the remote record
//! - `remote.lastModified > local.lastModified`: replace with the remote record
//! - otherwise (including ties): keep the local record
//!
//! The comparison is strictly greater and [`ModifiedAt::Never`] orders below
//! every instant, so merging is idempotent and two devices that exchange
//! snapshots converge on the record with the greatest stamp. Records are
//! replaced whole, history included; there is no field-level merging.
//!
//! Meta documents (ranges, theme, forward defaults) are only adopted when the
//! local value is empty, which bootstraps a fresh device without ever
//! overwriting local configuration.
//!
//! [`ModifiedAt::Never`]: crate::model::ModifiedAt::Never

use serde::Serialize;

use crate::model::{DateSnapshot, GlobalSnapshot};
use crate::store::{DocumentStore, LocalStore, StoreError};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Record-level outcome counts of one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecordTally {
    /// Remote records with no local counterpart.
    pub adopted: usize,
    /// Local records replaced by a strictly newer remote record.
    pub replaced: usize,
    /// Local records kept because the remote one was not newer.
    pub kept: usize,
}

impl RecordTally {
    #[must_use]
    pub const fn changed(&self) -> usize {
        self.adopted + self.replaced
    }

    const fn add(&mut self, other: Self) {
        self.adopted += other.adopted;
        self.replaced += other.replaced;
        self.kept += other.kept;
    }
}

/// Summary of merging a remote snapshot into the local store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub records: RecordTally,
    /// Date documents rewritten because at least one record changed.
    pub dates_written: usize,
    /// Meta documents adopted from the remote.
    pub meta_bootstrapped: Vec<&'static str>,
}

impl MergeReport {
    /// Returns `true` if the merge changed nothing locally.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.records.changed() == 0 && self.meta_bootstrapped.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Merge one date's remote records into the local ones, in place.
#[must_use]
pub fn merge_date(local: &mut DateSnapshot, remote: &DateSnapshot) -> RecordTally {
    let mut tally = RecordTally::default();
    for (unit, theirs) in remote {
        match local.get(unit) {
            None => {
                local.insert(*unit, theirs.clone());
                tally.adopted += 1;
            }
            Some(ours) if theirs.last_modified > ours.last_modified => {
                tracing::debug!(
                    unit,
                    local = %ours.last_modified,
                    remote = %theirs.last_modified,
                    "remote record is newer"
                );
                local.insert(*unit, theirs.clone());
                tally.replaced += 1;
            }
            Some(_) => tally.kept += 1,
        }
    }
    tally
}

/// Merge a whole snapshot into another, in place. Used to reason about
/// convergence without a store.
pub fn merge_snapshot(local: &mut GlobalSnapshot, remote: &GlobalSnapshot) -> MergeReport {
    let mut report = MergeReport::default();

    if local.meta.ranges.is_empty() && !remote.meta.ranges.is_empty() {
        local.meta.ranges.clone_from(&remote.meta.ranges);
        report.meta_bootstrapped.push("ranges");
    }
    if local.meta.theme.is_empty() && !remote.meta.theme.is_empty() {
        local.meta.theme.clone_from(&remote.meta.theme);
        report.meta_bootstrapped.push("theme");
    }
    if local.meta.forward.fields.is_empty() && !remote.meta.forward.fields.is_empty() {
        local.meta.forward.fields.clone_from(&remote.meta.forward.fields);
        report.meta_bootstrapped.push("forward.fields");
    }
    if local.meta.forward.status.is_empty() && !remote.meta.forward.status.is_empty() {
        local.meta.forward.status.clone_from(&remote.meta.forward.status);
        report.meta_bootstrapped.push("forward.status");
    }

    for (date, theirs) in &remote.dates {
        let ours = local.dates.entry(*date).or_default();
        let tally = merge_date(ours, theirs);
        if tally.changed() > 0 {
            report.dates_written += 1;
        }
        report.records.add(tally);
    }
    report
}

/// Merge `remote` into the local store.
///
/// Runs as one store transaction. Each date document is read, merged, and
/// written back only when at least one of its records changed.
///
/// # Errors
///
/// Returns [`StoreError`] when a document cannot be read or written. Nothing
/// is merged in that case; re-running the merge is safe.
pub fn merge_into_store<S: DocumentStore>(
    store: &mut LocalStore<S>,
    remote: &GlobalSnapshot,
) -> Result<MergeReport, StoreError> {
    store.transaction(|store| {
        let mut report = MergeReport::default();

        if store.ranges()?.is_empty() && !remote.meta.ranges.is_empty() {
            store.set_ranges(&remote.meta.ranges)?;
            report.meta_bootstrapped.push("ranges");
        }
        if store.theme()?.is_empty() && !remote.meta.theme.is_empty() {
            store.set_theme(&remote.meta.theme)?;
            report.meta_bootstrapped.push("theme");
        }
        if store.forward_fields()?.is_empty() && !remote.meta.forward.fields.is_empty() {
            store.set_forward_fields(&remote.meta.forward.fields)?;
            report.meta_bootstrapped.push("forward.fields");
        }
        if store.status_forward()?.is_empty() && !remote.meta.forward.status.is_empty() {
            store.set_status_forward(&remote.meta.forward.status)?;
            report.meta_bootstrapped.push("forward.status");
        }

        for (date, theirs) in &remote.dates {
            let mut ours = store.date_snapshot(*date)?;
            let tally = merge_date(&mut ours, theirs);
            if tally.changed() > 0 {
                store.set_date_snapshot(*date, &ours)?;
                report.dates_written += 1;
            }
            report.records.add(tally);
        }

        Ok(report)
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
