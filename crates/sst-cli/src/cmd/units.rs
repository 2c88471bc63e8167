//! `sst units`: the unit list for a date with effective statuses.

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use sst_core::edit::last_updated;
use sst_core::forward::DateView;
use sst_core::model::{ModifiedAt, StatusSet, Unit};
use sst_core::view::AppState;
use std::io::Write;

use crate::context::CmdContext;
use crate::output::{pretty_kv, pretty_rule, render_mode};

#[derive(Args, Debug)]
pub struct UnitsArgs {
    /// Only list units whose effective statuses include Overlocked.
    #[arg(long)]
    pub overlocked_only: bool,
}

#[derive(Debug, Serialize)]
pub struct UnitLine {
    pub unit: Unit,
    pub statuses: StatusSet,
    pub mark: &'static str,
    /// True when the date has its own record for the unit.
    pub recorded: bool,
}

#[derive(Debug, Serialize)]
pub struct UnitsView {
    pub date: NaiveDate,
    pub last_updated: ModifiedAt,
    pub units: Vec<UnitLine>,
}

/// Execute `sst units`.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub fn run_units(args: &UnitsArgs, ctx: &CmdContext) -> Result<()> {
    let store = ctx.open_store()?;
    let mut state = AppState::load(&store, ctx.date)?;
    state.overlocked_only = args.overlocked_only;

    let view = DateView::load(&store, ctx.date)?;
    let units = state
        .visible_units(&store)?
        .into_iter()
        .map(|unit| {
            let statuses = view.effective(unit);
            UnitLine {
                unit,
                mark: statuses.sheet_mark(),
                recorded: view.records.contains_key(&unit),
                statuses,
            }
        })
        .collect();
    let listing = UnitsView {
        date: ctx.date,
        last_updated: last_updated(&store, ctx.date)?,
        units,
    };

    render_mode(
        ctx.output,
        &listing,
        |v, w| {
            for line in &v.units {
                writeln!(w, "{}\t{}\t{}", line.unit, line.mark, line.statuses)?;
            }
            Ok(())
        },
        |v, w| {
            pretty_kv(w, "Date", v.date.to_string())?;
            pretty_kv(w, "Last updated", last_updated_label(v.last_updated))?;
            pretty_rule(w)?;
            for line in &v.units {
                let marker = if line.recorded { "*" } else { " " };
                writeln!(w, "{:>5}{marker} {:<2} {}", line.unit, line.mark, line.statuses)?;
            }
            if v.units.is_empty() {
                writeln!(w, "(no units)")?;
            }
            Ok(())
        },
    )
}

pub fn last_updated_label(at: ModifiedAt) -> String {
    match at {
        ModifiedAt::Never => "never".to_string(),
        ModifiedAt::At(ts) => ts
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
    }
}
