//! Edit commands: `set`, `toggle`, `comment`, `contact`.
//!
//! Each one saves through the core edit layer, which stamps the record and
//! updates the forward defaults. A save that changes nothing writes nothing.

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use sst_core::clock::SystemClock;
use sst_core::edit::{self, ContactUpdate, SaveOutcome};
use sst_core::model::{ModifiedAt, StatusKind, StatusSet, Unit};
use sst_core::effective_statuses;
use sst_core::store::{LocalStore, SqliteStore, StoreError};
use std::io::Write;

use crate::cmd::parse_status;
use crate::context::CmdContext;
use crate::output::render;

#[derive(Args, Debug)]
pub struct SetArgs {
    pub unit: Unit,
    /// Statuses to hold; none clears the record's set.
    #[arg(value_parser = parse_status, value_name = "STATUS")]
    pub statuses: Vec<StatusKind>,
}

#[derive(Args, Debug)]
pub struct ToggleArgs {
    pub unit: Unit,
    #[arg(value_parser = parse_status)]
    pub status: StatusKind,
}

#[derive(Args, Debug)]
pub struct CommentArgs {
    pub unit: Unit,
    /// New comment; an empty string clears it.
    pub text: String,
}

#[derive(Args, Debug)]
pub struct ContactArgs {
    pub unit: Unit,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EditResult {
    pub unit: Unit,
    pub date: NaiveDate,
    pub changed: bool,
    pub statuses: StatusSet,
    pub last_modified: ModifiedAt,
}

pub fn run_set(args: &SetArgs, ctx: &CmdContext) -> Result<()> {
    let statuses: StatusSet = args.statuses.iter().copied().collect();
    apply(ctx, args.unit, |store, clock, date, unit| {
        edit::set_statuses(store, clock, date, unit, statuses)
    })
}

pub fn run_toggle(args: &ToggleArgs, ctx: &CmdContext) -> Result<()> {
    apply(ctx, args.unit, |store, clock, date, unit| {
        edit::toggle_status(store, clock, date, unit, args.status)
    })
}

pub fn run_comment(args: &CommentArgs, ctx: &CmdContext) -> Result<()> {
    apply(ctx, args.unit, |store, clock, date, unit| {
        edit::set_comment(store, clock, date, unit, &args.text)
    })
}

pub fn run_contact(args: &ContactArgs, ctx: &CmdContext) -> Result<()> {
    let update = ContactUpdate {
        name: args.name.clone(),
        phone: args.phone.clone(),
        note: args.note.clone(),
    };
    apply(ctx, args.unit, |store, clock, date, unit| {
        edit::set_contact(store, clock, date, unit, update)
    })
}

type Store = LocalStore<SqliteStore>;

fn apply<F>(ctx: &CmdContext, unit: Unit, save: F) -> Result<()>
where
    F: FnOnce(&mut Store, &SystemClock, NaiveDate, Unit) -> Result<SaveOutcome, StoreError>,
{
    let mut store = ctx.open_store()?;
    ctx.require_unit(&store, unit)?;

    let outcome = save(&mut store, &SystemClock, ctx.date, unit)?;
    if let SaveOutcome::Changed(stamp) = outcome {
        tracing::info!(unit, date = %ctx.date, stamp = %ModifiedAt::At(stamp), "unit saved");
    }

    let result = EditResult {
        unit,
        date: ctx.date,
        changed: outcome.is_changed(),
        statuses: effective_statuses(&store, ctx.date, unit)?,
        last_modified: store
            .record(ctx.date, unit)?
            .map_or(ModifiedAt::Never, |record| record.last_modified),
    };
    render(ctx.output, &result, |r, w| {
        let verb = if r.changed { "updated" } else { "unchanged" };
        writeln!(w, "unit {} on {} {verb}: {}", r.unit, r.date, r.statuses)
    })
}
