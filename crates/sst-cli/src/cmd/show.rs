//! `sst show`: one unit on the selected date.
//!
//! Read-only: a unit without a record for the date is shown with its forward
//! defaults and nothing is written.

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use sst_core::{ErrorCode, effective_statuses};
use sst_core::model::{ModifiedAt, StatusKind, StatusSet, Unit};
use sst_core::view::AppState;
use std::io::Write;

use crate::cmd::units::last_updated_label;
use crate::context::CmdContext;
use crate::output::{CliError, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct ShowArgs {
    pub unit: Unit,
}

#[derive(Debug, Serialize)]
pub struct UnitDetail {
    pub unit: Unit,
    pub date: NaiveDate,
    pub statuses: StatusSet,
    pub priority: Option<StatusKind>,
    /// False when the fields below come from forward defaults.
    pub recorded: bool,
    pub comment: String,
    pub name: String,
    pub phone: String,
    pub note: String,
    pub last_modified: ModifiedAt,
    pub history_len: usize,
    pub prev: Option<Unit>,
    pub next: Option<Unit>,
}

/// Execute `sst show <unit>`.
///
/// # Errors
///
/// Returns an error if the unit is not configured or the store cannot be
/// read.
pub fn run_show(args: &ShowArgs, ctx: &CmdContext) -> Result<()> {
    let store = ctx.open_store()?;
    let mut state = AppState::load(&store, ctx.date)?;
    if !state.goto(args.unit) {
        return Err(ctx.fail(CliError::coded(
            ErrorCode::UnitNotFound,
            format!("unit {} is not in any configured range", args.unit),
        )));
    }
    let prev = state.clone().prev().filter(|unit| *unit != args.unit);
    let next = state.next().filter(|unit| *unit != args.unit);

    let statuses = effective_statuses(&store, ctx.date, args.unit)?;
    let record = store.record(ctx.date, args.unit)?;
    let detail = match record {
        Some(record) => UnitDetail {
            unit: args.unit,
            date: ctx.date,
            priority: (!statuses.is_empty()).then(|| statuses.priority()),
            statuses,
            recorded: true,
            comment: record.comment,
            name: record.name,
            phone: record.phone,
            note: record.note,
            last_modified: record.last_modified,
            history_len: record.history.len(),
            prev,
            next,
        },
        None => {
            let defaults = store
                .forward_fields()?
                .remove(&args.unit)
                .unwrap_or_default();
            UnitDetail {
                unit: args.unit,
                date: ctx.date,
                priority: (!statuses.is_empty()).then(|| statuses.priority()),
                statuses,
                recorded: false,
                comment: defaults.comment,
                name: defaults.name,
                phone: defaults.phone,
                note: defaults.note,
                last_modified: ModifiedAt::Never,
                history_len: 0,
                prev,
                next,
            }
        }
    };

    render_mode(
        ctx.output,
        &detail,
        |d, w| {
            writeln!(
                w,
                "{}\t{}\t{}\t{}\t{}\t{}",
                d.unit, d.date, d.statuses, d.comment, d.name, d.phone
            )
        },
        |d, w| {
            let origin = if d.recorded { "" } else { " (forward defaults)" };
            pretty_section(w, &format!("Unit {} on {}{origin}", d.unit, d.date))?;
            pretty_kv(w, "Statuses", d.statuses.to_string())?;
            pretty_kv(w, "Comment", &d.comment)?;
            pretty_kv(w, "Name", &d.name)?;
            pretty_kv(w, "Phone", &d.phone)?;
            if !d.note.is_empty() {
                pretty_kv(w, "Note", &d.note)?;
            }
            pretty_kv(w, "Modified", last_updated_label(d.last_modified))?;
            pretty_kv(w, "History", format!("{} entries", d.history_len))?;
            let neighbour = |u: Option<Unit>| u.map_or_else(|| "-".to_string(), |u| u.to_string());
            pretty_kv(w, "Prev / next", format!("{} / {}", neighbour(d.prev), neighbour(d.next)))
        },
    )
}
