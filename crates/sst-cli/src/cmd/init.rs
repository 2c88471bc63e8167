//! `sst init`: create the data directory, config template, and store.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use sst_core::config::write_default_config;
use sst_core::model::UnitRange;
use std::io::Write;

use crate::context::CmdContext;
use crate::output::{pretty_kv, render_mode};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Initial unit range, repeatable. Defaults to `units.default_ranges`.
    #[arg(long = "range", value_name = "START-END")]
    pub ranges: Vec<UnitRange>,
}

#[derive(Debug, Serialize)]
pub struct InitReport {
    pub data_dir: String,
    pub config_written: bool,
    /// False when the store already had ranges; they are left alone.
    pub ranges_written: bool,
    pub ranges: Vec<UnitRange>,
}

/// Execute `sst init`. Safe to rerun: existing config and ranges are kept.
///
/// # Errors
///
/// Returns an error if the directory, config file, or store cannot be
/// created.
pub fn run_init(args: &InitArgs, ctx: &CmdContext) -> Result<()> {
    let config_written = write_default_config(&ctx.data_dir)?;
    let mut store = ctx.create_store()?;

    let (ranges_written, ranges) = store.transaction(|store| -> Result<_> {
        let existing = store.ranges()?;
        if !existing.is_empty() {
            return Ok((false, existing));
        }
        let ranges = if args.ranges.is_empty() {
            ctx.config.units.default_ranges.clone()
        } else {
            args.ranges.clone()
        };
        store.set_ranges(&ranges)?;
        Ok((true, ranges))
    })?;
    tracing::info!(data_dir = %ctx.data_dir.display(), config_written, ranges_written, "initialized");

    let report = InitReport {
        data_dir: ctx.data_dir.display().to_string(),
        config_written,
        ranges_written,
        ranges,
    };
    render_mode(
        ctx.output,
        &report,
        |r, w| writeln!(w, "{}", r.data_dir),
        |r, w| {
            writeln!(w, "✓ sst initialized")?;
            pretty_kv(w, "Data dir", &r.data_dir)?;
            pretty_kv(w, "Config", if r.config_written { "written" } else { "kept" })?;
            pretty_kv(w, "Ranges", join_ranges(&r.ranges))
        },
    )
}

fn join_ranges(ranges: &[UnitRange]) -> String {
    if ranges.is_empty() {
        return "(none)".to_string();
    }
    ranges
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
