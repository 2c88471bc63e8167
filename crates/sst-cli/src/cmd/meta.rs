//! `sst meta`: a unit's size and type tags.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use sst_core::edit::{MetaUpdate, set_unit_meta, unit_meta};
use sst_core::model::Unit;
use std::io::Write;

use crate::context::CmdContext;
use crate::output::{pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct MetaArgs {
    pub unit: Unit,

    /// Size tag; repeat for several. Replaces the unit's sizes.
    #[arg(long = "size", value_name = "SIZE")]
    pub sizes: Vec<String>,

    /// Type tag; repeat for several. Replaces the unit's types.
    #[arg(long = "type", value_name = "TYPE")]
    pub types: Vec<String>,

    /// Drop every size and type not given in this call.
    #[arg(long)]
    pub clear: bool,
}

impl MetaArgs {
    fn update(&self) -> MetaUpdate {
        let pick = |tags: &Vec<String>| (self.clear || !tags.is_empty()).then(|| tags.clone());
        MetaUpdate {
            sizes: pick(&self.sizes),
            types: pick(&self.types),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetaView {
    pub unit: Unit,
    pub sizes: Vec<String>,
    pub types: Vec<String>,
    pub changed: bool,
}

/// Execute `sst meta`. Without `--size`, `--type`, or `--clear` it only
/// prints the current tags.
///
/// # Errors
///
/// Returns an error if the unit is not configured or the store cannot be
/// read or written.
pub fn run_meta(args: &MetaArgs, ctx: &CmdContext) -> Result<()> {
    let mut store = ctx.open_store()?;
    ctx.require_unit(&store, args.unit)?;

    let update = args.update();
    let (meta, changed) = if update == MetaUpdate::default() {
        (unit_meta(&store, args.unit)?, false)
    } else {
        set_unit_meta(&mut store, args.unit, update)?
    };
    if changed {
        tracing::info!(unit = args.unit, "unit meta updated");
    }

    let view = MetaView {
        unit: args.unit,
        sizes: meta.sizes,
        types: meta.types,
        changed,
    };
    render_mode(
        ctx.output,
        &view,
        |v, w| writeln!(w, "{}\t{}\t{}", v.unit, v.sizes.join(","), v.types.join(",")),
        |v, w| {
            pretty_section(w, &format!("Unit {}", v.unit))?;
            pretty_kv(w, "Sizes", tags(&v.sizes))?;
            pretty_kv(w, "Types", tags(&v.types))
        },
    )
}

fn tags(list: &[String]) -> String {
    if list.is_empty() {
        "(none)".to_string()
    } else {
        list.join(", ")
    }
}
