//! `sst forward`: inspect and edit a unit's forward defaults.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use sst_core::edit::clear_forward_comment;
use sst_core::model::{ForwardFields, StatusSet, Unit};
use std::io::Write;

use crate::context::CmdContext;
use crate::output::{pretty_kv, pretty_section, render, render_mode};

#[derive(Subcommand, Debug)]
pub enum ForwardCommand {
    #[command(
        about = "Show the defaults new records of a unit start from",
        after_help = "EXAMPLES:\n    sst forward show 12"
    )]
    Show(ForwardUnitArgs),

    #[command(
        about = "Blank the forwarded comment",
        long_about = "Blank the unit's forwarded comment so new dates start without it. Dated records are not touched.",
        after_help = "EXAMPLES:\n    sst forward clear-comment 12"
    )]
    ClearComment(ForwardUnitArgs),
}

#[derive(Args, Debug)]
pub struct ForwardUnitArgs {
    pub unit: Unit,
}

#[derive(Debug, Serialize)]
pub struct ForwardView {
    pub unit: Unit,
    pub statuses: StatusSet,
    pub fields: ForwardFields,
}

#[derive(Debug, Serialize)]
pub struct ClearedComment {
    pub unit: Unit,
    pub cleared: bool,
}

/// Execute one `sst forward` subcommand.
///
/// # Errors
///
/// Returns an error if the unit is not configured or the store cannot be
/// read or written.
pub fn run_forward(command: &ForwardCommand, ctx: &CmdContext) -> Result<()> {
    let mut store = ctx.open_store()?;
    match command {
        ForwardCommand::Show(args) => {
            ctx.require_unit(&store, args.unit)?;
            let view = ForwardView {
                unit: args.unit,
                statuses: store.status_forward()?.remove(&args.unit).unwrap_or_default(),
                fields: store.forward_fields()?.remove(&args.unit).unwrap_or_default(),
            };
            render_mode(
                ctx.output,
                &view,
                |v, w| {
                    writeln!(
                        w,
                        "{}\t{}\t{}\t{}\t{}",
                        v.unit, v.statuses, v.fields.comment, v.fields.name, v.fields.phone
                    )
                },
                |v, w| {
                    pretty_section(w, &format!("Forward defaults for unit {}", v.unit))?;
                    pretty_kv(w, "Statuses", v.statuses.to_string())?;
                    pretty_kv(w, "Comment", &v.fields.comment)?;
                    pretty_kv(w, "Name", &v.fields.name)?;
                    pretty_kv(w, "Phone", &v.fields.phone)?;
                    pretty_kv(w, "Note", &v.fields.note)
                },
            )
        }
        ForwardCommand::ClearComment(args) => {
            ctx.require_unit(&store, args.unit)?;
            let cleared = clear_forward_comment(&mut store, args.unit)?;
            tracing::info!(unit = args.unit, cleared, "forward comment cleared");
            let result = ClearedComment {
                unit: args.unit,
                cleared,
            };
            render(ctx.output, &result, |r, w| {
                if r.cleared {
                    writeln!(w, "cleared forwarded comment of unit {}", r.unit)
                } else {
                    writeln!(w, "unit {} had no forwarded comment", r.unit)
                }
            })
        }
    }
}
