//! `sst reset`: wipe every local document.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::io::Write;

use crate::context::CmdContext;
use crate::output::{CliError, render};

#[derive(Args, Debug)]
pub struct ResetArgs {
    /// Confirm the wipe. Records not yet pushed are lost.
    #[arg(long)]
    pub yes: bool,
}

#[derive(Debug, Serialize)]
pub struct ResetReport {
    pub wiped: bool,
    /// Records that had not been pushed when the store was wiped.
    pub discarded_pending: usize,
}

/// Execute `sst reset --yes`. The config file is kept.
///
/// # Errors
///
/// Returns an error without `--yes`, or when the store cannot be wiped.
pub fn run_reset(args: &ResetArgs, ctx: &CmdContext) -> Result<()> {
    let mut store = ctx.open_store()?;
    if !args.yes {
        return Err(ctx.fail(CliError {
            message: "refusing to wipe local data without --yes".to_string(),
            suggestion: Some("Run `sst sync` first, then `sst reset --yes`.".to_string()),
            error_code: None,
        }));
    }

    let discarded_pending = sst_core::sync::sync_status(&store)?.pending;
    store.wipe()?;
    tracing::warn!(discarded_pending, data_dir = %ctx.data_dir.display(), "local store wiped");

    let report = ResetReport {
        wiped: true,
        discarded_pending,
    };
    render(ctx.output, &report, |r, w| {
        writeln!(w, "local data wiped ({} unsynced records discarded)", r.discarded_pending)
    })
}
