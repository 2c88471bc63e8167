//! `sst sync` and `sst sync-status`.

use anyhow::Result;
use serde::Serialize;
use sst_core::clock::SystemClock;
use sst_core::model::ModifiedAt;
use sst_core::sync::{SyncEngine, SyncOutcome, sync_status};
use std::io::Write;

use crate::cmd::units::last_updated_label;
use crate::context::CmdContext;
use crate::output::{CliError, pretty_kv, render, render_mode};
use crate::remote::HttpTransport;

#[derive(Debug, Serialize)]
pub struct SyncRun {
    /// `synced`, or `skipped` when another cycle held the sync lock.
    pub result: &'static str,
    #[serde(flatten)]
    pub outcome: Option<SyncOutcome>,
}

/// Execute `sst sync`: pull, merge, push once.
///
/// A cycle already running in another process is not an error; this run is
/// reported as skipped.
///
/// # Errors
///
/// Returns an error when sync is not configured or any step of the cycle
/// fails.
pub fn run_sync(ctx: &CmdContext) -> Result<()> {
    let target = ctx.remote()?;
    let store = ctx.open_store()?;
    let mut engine =
        SyncEngine::new(store, HttpTransport::new(target), SystemClock).with_gate(ctx.sync_gate());

    let run = match engine.sync_now() {
        Ok(outcome) => SyncRun {
            result: "synced",
            outcome: Some(outcome),
        },
        Err(err) if err.is_busy() => {
            tracing::info!("sync skipped: another cycle is running");
            SyncRun {
                result: "skipped",
                outcome: None,
            }
        }
        Err(err) => return Err(ctx.fail(CliError::from(&err))),
    };

    render(ctx.output, &run, |r, w| match &r.outcome {
        Some(outcome) => {
            let records = outcome.merge.records;
            writeln!(
                w,
                "synced: {} adopted, {} replaced, {} kept; {} pending",
                records.adopted, records.replaced, records.kept, outcome.status.pending
            )?;
            for meta in &outcome.merge.meta_bootstrapped {
                writeln!(w, "  adopted remote {meta}")?;
            }
            Ok(())
        }
        None => writeln!(w, "sync skipped: another cycle is running"),
    })
}

#[derive(Debug, Serialize)]
pub struct StatusView {
    pub configured: bool,
    pub last_sync: ModifiedAt,
    pub pending: usize,
}

/// Execute `sst sync-status`. Reads only local state.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub fn run_sync_status(ctx: &CmdContext) -> Result<()> {
    let store = ctx.open_store()?;
    let status = sync_status(&store)?;
    let view = StatusView {
        configured: ctx.config.sync.remote().is_some(),
        last_sync: status.last_sync,
        pending: status.pending,
    };

    render_mode(
        ctx.output,
        &view,
        |v, w| writeln!(w, "{}\t{}", v.last_sync, v.pending),
        |v, w| {
            pretty_kv(w, "Remote", if v.configured { "configured" } else { "not configured" })?;
            pretty_kv(w, "Last sync", last_updated_label(v.last_sync))?;
            pretty_kv(w, "Pending", v.pending.to_string())
        },
    )
}
