//! `sst report`: units needing attention on the selected date.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::Args;
use serde::Serialize;
use sst_core::model::StatusKind;
use sst_core::report::{ReportFilter, ReportRow, build_report};
use std::io::Write;

use crate::cmd::units::last_updated_label;
use crate::cmd::{parse_date, parse_status};
use crate::context::CmdContext;
use crate::output::{pretty_rule, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Keep units holding any of these statuses. Repeatable.
    #[arg(long = "status", value_parser = parse_status, value_name = "STATUS")]
    pub statuses: Vec<StatusKind>,

    /// Keep units whose record was modified on this UTC day.
    #[arg(long, value_parser = parse_date, value_name = "YYYY-MM-DD", conflicts_with = "modified_today")]
    pub modified_on: Option<NaiveDate>,

    /// Keep units whose record was modified today (UTC).
    #[arg(long)]
    pub modified_today: bool,
}

impl ReportArgs {
    fn filter(&self) -> ReportFilter {
        ReportFilter {
            statuses: self.statuses.iter().copied().collect(),
            modified_on: if self.modified_today {
                Some(Utc::now().date_naive())
            } else {
                self.modified_on
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReportView {
    pub date: NaiveDate,
    pub rows: Vec<ReportRow>,
}

/// Execute `sst report`.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub fn run_report(args: &ReportArgs, ctx: &CmdContext) -> Result<()> {
    let store = ctx.open_store()?;
    let rows = build_report(&store, ctx.date, &args.filter())?;
    tracing::debug!(date = %ctx.date, rows = rows.len(), "report built");
    let view = ReportView {
        date: ctx.date,
        rows,
    };

    render_mode(
        ctx.output,
        &view,
        |v, w| {
            for row in &v.rows {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}\t{}",
                    row.unit,
                    row.priority,
                    row.statuses,
                    row.comment,
                    row.contact_line()
                )?;
            }
            Ok(())
        },
        |v, w| {
            pretty_section(w, &format!("Report for {} ({} units)", v.date, v.rows.len()))?;
            for row in &v.rows {
                let multi = if row.multi { " +" } else { "" };
                writeln!(w, "{:>5}  {}{multi}  [{}]", row.unit, row.priority, row.statuses)?;
                if !row.comment.is_empty() {
                    writeln!(w, "       {}", row.comment)?;
                }
                let contact = row.contact_line();
                if !contact.is_empty() {
                    writeln!(w, "       {contact}")?;
                }
                writeln!(w, "       modified {}", last_updated_label(row.last_modified))?;
            }
            if !v.rows.is_empty() {
                pretty_rule(w)?;
            }
            Ok(())
        },
    )
}
