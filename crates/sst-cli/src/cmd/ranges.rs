//! `sst ranges`: view and edit the unit ranges.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use sst_core::model::range::{compact_units_to_ranges, next_range, units_from_ranges};
use sst_core::model::{Unit, UnitRange};
use std::io::Write;

use crate::context::CmdContext;
use crate::output::{CliError, pretty_section, render_mode};

#[derive(Subcommand, Debug)]
pub enum RangesCommand {
    #[command(
        about = "List configured ranges",
        after_help = "EXAMPLES:\n    # Show ranges and unit count\n    sst ranges list"
    )]
    List,

    #[command(
        about = "Append a ten-unit range after the last one",
        after_help = "EXAMPLES:\n    # 1-80 becomes 1-80, 81-90\n    sst ranges add"
    )]
    Add,

    #[command(
        about = "Replace all ranges",
        after_help = "EXAMPLES:\n    # Two buildings\n    sst ranges set 1-80 101-140"
    )]
    Set(SetRangesArgs),

    #[command(
        about = "Remove one range by its position",
        after_help = "EXAMPLES:\n    # Drop the second range shown by `sst ranges list`\n    sst ranges remove 2"
    )]
    Remove(RemoveRangeArgs),

    #[command(
        about = "Rebuild ranges from a list of units",
        after_help = "EXAMPLES:\n    # Becomes 1-3, 7-8\n    sst ranges from-units 3 1 2 7 8"
    )]
    FromUnits(FromUnitsArgs),
}

#[derive(Args, Debug)]
pub struct SetRangesArgs {
    /// New ranges, `START-END` or a single unit.
    #[arg(required = true, value_name = "START-END")]
    pub ranges: Vec<UnitRange>,
}

#[derive(Args, Debug)]
pub struct RemoveRangeArgs {
    /// 1-based position as printed by `sst ranges list`.
    pub position: usize,
}

#[derive(Args, Debug)]
pub struct FromUnitsArgs {
    #[arg(required = true, value_name = "UNIT")]
    pub units: Vec<Unit>,
}

#[derive(Debug, Serialize)]
pub struct RangesView {
    pub ranges: Vec<UnitRange>,
    pub unit_count: usize,
}

/// Execute one `sst ranges` subcommand.
///
/// # Errors
///
/// Returns an error if the store cannot be read or written, or the removal
/// position does not exist.
pub fn run_ranges(command: &RangesCommand, ctx: &CmdContext) -> Result<()> {
    let mut store = ctx.open_store()?;
    let ranges = store.transaction(|store| -> Result<Vec<UnitRange>> {
        let mut ranges = store.ranges()?;

        let changed = match command {
            RangesCommand::List => false,
            RangesCommand::Add => {
                let added = next_range(&ranges);
                ranges.push(added);
                tracing::info!(range = %added, "range added");
                true
            }
            RangesCommand::Set(args) => {
                ranges.clone_from(&args.ranges);
                true
            }
            RangesCommand::Remove(args) => {
                if args.position == 0 || args.position > ranges.len() {
                    return Err(ctx.fail(CliError::new(format!(
                        "no range at position {} ({} configured)",
                        args.position,
                        ranges.len()
                    ))));
                }
                let removed = ranges.remove(args.position - 1);
                tracing::info!(range = %removed, "range removed");
                true
            }
            RangesCommand::FromUnits(args) => {
                ranges = compact_units_to_ranges(&args.units);
                true
            }
        };
        if changed {
            store.set_ranges(&ranges)?;
        }
        Ok(ranges)
    })?;

    let view = RangesView {
        unit_count: units_from_ranges(&ranges).len(),
        ranges,
    };
    render_mode(
        ctx.output,
        &view,
        |v, w| {
            for range in &v.ranges {
                writeln!(w, "{}\t{}", range.start, range.end)?;
            }
            Ok(())
        },
        |v, w| {
            pretty_section(w, &format!("Ranges ({} units)", v.unit_count))?;
            for (idx, range) in v.ranges.iter().enumerate() {
                let note = if range.is_oversized() {
                    "  (ignored: too wide)"
                } else if range.is_valid() {
                    ""
                } else {
                    "  (empty: end before start)"
                };
                writeln!(w, "{:>3}. {range}{note}", idx + 1)?;
            }
            Ok(())
        },
    )
}
