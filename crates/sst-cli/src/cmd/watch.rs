//! `sst watch`: keep a data directory in sync while it is being edited.
//!
//! Startup counts as a foreground signal. Every commit another `sst` process
//! makes to the store counts as a change signal. The scheduler collapses
//! bursts and spaces cycles; this loop only polls.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use sst_core::clock::SystemClock;
use sst_core::scheduler::{
    ChangeWatcher, CycleResult, SchedulerConfig, SchedulerState, SyncScheduler, Trigger,
};
use sst_core::sync::SyncEngine;
use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use crate::context::CmdContext;
use crate::output::OutputMode;
use crate::remote::HttpTransport;

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Milliseconds between polls of the store and the scheduler.
    #[arg(long, default_value_t = 500)]
    pub interval_ms: u64,

    /// Stop after this many polls instead of running until interrupted.
    #[arg(long)]
    pub max_polls: Option<u64>,
}

#[derive(Debug, Serialize)]
struct CycleEvent<'a> {
    event: &'static str,
    #[serde(flatten)]
    result: &'a CycleResult,
}

#[derive(Debug, Serialize)]
struct WatchSummary<'a> {
    event: &'static str,
    #[serde(flatten)]
    state: &'a SchedulerState,
}

/// Execute `sst watch`.
///
/// Failed cycles are printed and the loop keeps going; the next change
/// schedules another attempt.
///
/// # Errors
///
/// Returns an error when sync is not configured or the store cannot be read.
pub fn run_watch(args: &WatchArgs, ctx: &CmdContext) -> Result<()> {
    let target = ctx.remote()?;
    let store = ctx.open_store()?;
    let mut engine =
        SyncEngine::new(store, HttpTransport::new(target), SystemClock).with_gate(ctx.sync_gate());
    let mut scheduler = SyncScheduler::new(SchedulerConfig::from(&ctx.config.sync), SystemClock);

    let mut watcher = ChangeWatcher::new(engine.store())?;
    scheduler.signal(Trigger::Foreground);
    tracing::info!(
        data_dir = %ctx.data_dir.display(),
        debounce_secs = ctx.config.sync.debounce_secs,
        min_interval_secs = ctx.config.sync.min_interval_secs,
        "watching for changes"
    );

    let interval = Duration::from_millis(args.interval_ms);
    let mut polls = 0u64;
    loop {
        watcher.observe(engine.store(), &mut scheduler)?;
        if let Some(result) = scheduler.poll(|| engine.sync_now()) {
            emit_cycle(ctx.output, result)?;
        }

        polls += 1;
        if args.max_polls.is_some_and(|max| polls >= max) {
            break;
        }
        thread::sleep(interval);
    }

    emit_summary(ctx.output, scheduler.state())
}

fn emit_cycle(mode: OutputMode, result: &CycleResult) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if mode.is_json() {
        let line = serde_json::to_string(&CycleEvent {
            event: "cycle",
            result,
        })?;
        writeln!(out, "{line}")?;
    } else {
        match result {
            CycleResult::Succeeded { last_sync, pending } => {
                writeln!(out, "synced at {last_sync}; {pending} pending")?;
            }
            CycleResult::Skipped => writeln!(out, "skipped: another cycle is running")?,
            CycleResult::Failed { code, message } => {
                writeln!(out, "sync failed [{code}]: {message}")?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

fn emit_summary(mode: OutputMode, state: &SchedulerState) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if mode.is_json() {
        let line = serde_json::to_string(&WatchSummary {
            event: "stopped",
            state,
        })?;
        writeln!(out, "{line}")?;
    } else {
        writeln!(
            out,
            "stopped: {} signals, {} cycles, {} failed",
            state.signals, state.runs, state.failures
        )?;
    }
    Ok(())
}
