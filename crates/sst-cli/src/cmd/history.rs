//! `sst history`: the append-only edit history of one record.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;
use serde::Serialize;
use sst_core::model::{HistoryEntry, Unit};
use std::io::Write;

use crate::context::CmdContext;
use crate::output::{pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct HistoryArgs {
    pub unit: Unit,
}

#[derive(Debug, Serialize)]
pub struct HistoryView {
    pub unit: Unit,
    pub date: NaiveDate,
    pub entries: Vec<HistoryEntry>,
}

/// Execute `sst history <unit>`.
///
/// # Errors
///
/// Returns an error if the unit is not configured or the store cannot be
/// read.
pub fn run_history(args: &HistoryArgs, ctx: &CmdContext) -> Result<()> {
    let store = ctx.open_store()?;
    ctx.require_unit(&store, args.unit)?;
    let entries = store
        .record(ctx.date, args.unit)?
        .map(|record| record.history)
        .unwrap_or_default();
    let view = HistoryView {
        unit: args.unit,
        date: ctx.date,
        entries,
    };

    render_mode(
        ctx.output,
        &view,
        |v, w| {
            for entry in &v.entries {
                writeln!(
                    w,
                    "{}\t{}\t{}",
                    entry.at.to_rfc3339(),
                    entry.snapshot.statuses,
                    entry.snapshot.comment
                )?;
            }
            Ok(())
        },
        |v, w| {
            pretty_section(w, &format!("History of unit {} on {}", v.unit, v.date))?;
            if v.entries.is_empty() {
                return writeln!(w, "(no edits)");
            }
            for entry in &v.entries {
                let snap = &entry.snapshot;
                writeln!(w, "{}  {}", local_time(entry.at), snap.statuses)?;
                for (label, value) in [
                    ("comment", &snap.comment),
                    ("name", &snap.name),
                    ("phone", &snap.phone),
                    ("note", &snap.note),
                ] {
                    if !value.is_empty() {
                        writeln!(w, "    {label}: {value}")?;
                    }
                }
            }
            Ok(())
        },
    )
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
