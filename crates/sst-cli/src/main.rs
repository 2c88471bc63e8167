#![forbid(unsafe_code)]

mod cmd;
mod context;
mod output;
mod remote;

use chrono::{Local, NaiveDate};
use clap::{CommandFactory, Parser, Subcommand};
use context::CmdContext;
use output::{OutputMode, Reported, describe, render_error, resolve_output_mode};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "sst: storage-unit status tracker",
    long_about = None
)]
struct Cli {
    /// Enable debug logging for sst.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Data directory. Defaults to $SST_HOME, then the platform data dir.
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Date to read or edit. Defaults to today.
    #[arg(long, global = true, value_parser = cmd::parse_date, value_name = "YYYY-MM-DD")]
    date: Option<NaiveDate>,

    /// Output format. Defaults to pretty on a terminal, text when piped.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a data directory",
        long_about = "Create the data directory, a commented config.toml, and the local store. Rerunning keeps existing config and ranges.",
        after_help = "EXAMPLES:\n    # Default ranges from config (1-80)\n    sst init\n\n    # Explicit ranges in a custom directory\n    sst --data-dir ./site-b init --range 1-40 --range 101-120"
    )]
    Init(cmd::init::InitArgs),

    #[command(next_help_heading = "Setup", about = "View and edit unit ranges")]
    Ranges {
        #[command(subcommand)]
        command: cmd::ranges::RangesCommand,
    },

    #[command(
        next_help_heading = "Read",
        about = "List units with effective statuses",
        long_about = "List the units of the selected date. Units without a record for the date show their forwarded statuses.",
        after_help = "EXAMPLES:\n    # Today\n    sst units\n\n    # Only overlocked units on a given date\n    sst --date 2024-01-11 units --overlocked-only"
    )]
    Units(cmd::units::UnitsArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show one unit",
        after_help = "EXAMPLES:\n    sst show 12\n\n    # Emit machine-readable output\n    sst show 12 --json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Replace a unit's statuses",
        after_help = "EXAMPLES:\n    # Overlocked with an issue\n    sst set 12 overlocked issue\n\n    # Clear the set\n    sst set 12"
    )]
    Set(cmd::edit::SetArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Toggle one status on a unit",
        after_help = "EXAMPLES:\n    sst toggle 12 locked\n\n    # Single-letter names work too\n    sst toggle 12 v"
    )]
    Toggle(cmd::edit::ToggleArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Set a unit's comment",
        after_help = "EXAMPLES:\n    sst comment 7 \"leak in ceiling\"\n\n    # Clear it\n    sst comment 7 \"\""
    )]
    Comment(cmd::edit::CommentArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Set a unit's contact fields",
        after_help = "EXAMPLES:\n    sst contact 7 --name \"Ada Byron\" --phone 555-0100"
    )]
    Contact(cmd::edit::ContactArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Show or set a unit's size and type tags",
        after_help = "EXAMPLES:\n    # Show the tags\n    sst meta 12\n\n    # Replace sizes, keep types\n    sst meta 12 --size 10x15\n\n    # Start over with one type\n    sst meta 12 --clear --type climate"
    )]
    Meta(cmd::meta::MetaArgs),

    #[command(next_help_heading = "Edit", about = "Inspect or edit forward defaults")]
    Forward {
        #[command(subcommand)]
        command: cmd::forward::ForwardCommand,
    },

    #[command(
        next_help_heading = "Read",
        about = "Show a unit's edit history",
        after_help = "EXAMPLES:\n    sst --date 2024-01-10 history 7"
    )]
    History(cmd::history::HistoryArgs),

    #[command(
        next_help_heading = "Read",
        about = "Report units needing attention",
        long_about = "Report every unit of the selected date except those that are only Locked with no comment.",
        after_help = "EXAMPLES:\n    # Everything worth a look\n    sst report\n\n    # Issues and overlocks edited today\n    sst report --status issue --status overlocked --modified-today"
    )]
    Report(cmd::report::ReportArgs),

    #[command(
        next_help_heading = "Sync",
        about = "Pull, merge, and push once",
        after_help = "EXAMPLES:\n    sst sync\n\n    # Emit machine-readable output\n    sst sync --json"
    )]
    Sync,

    #[command(
        next_help_heading = "Sync",
        about = "Show last sync and pending records",
        after_help = "EXAMPLES:\n    sst sync-status"
    )]
    SyncStatus,

    #[command(
        next_help_heading = "Sync",
        about = "Sync automatically while edits happen",
        long_about = "Run until interrupted, syncing after edits settle. Edits made by other sst processes on this data directory trigger a sync.",
        after_help = "EXAMPLES:\n    sst watch\n\n    # JSON lines, stop after a minute of polling\n    sst watch --json --interval-ms 1000 --max-polls 60"
    )]
    Watch(cmd::watch::WatchArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Wipe all local data",
        after_help = "EXAMPLES:\n    sst reset --yes"
    )]
    Reset(cmd::reset::ResetArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    sst completions bash > ~/.local/share/bash-completion/completions/sst"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("SST_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "sst=debug,info"
        } else {
            "sst=info,warn"
        })
    });

    let format = env::var("SST_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: Cli, output: OutputMode) -> anyhow::Result<()> {
    if let Commands::Completions(args) = &cli.command {
        let mut command = Cli::command();
        return cmd::completions::run_completions(args.shell, &mut command);
    }

    let date = cli.date.unwrap_or_else(|| Local::now().date_naive());
    let ctx = CmdContext::resolve(cli.data_dir.as_deref(), date, output)?;

    match cli.command {
        Commands::Init(args) => cmd::init::run_init(&args, &ctx),
        Commands::Ranges { command } => cmd::ranges::run_ranges(&command, &ctx),
        Commands::Units(args) => cmd::units::run_units(&args, &ctx),
        Commands::Show(args) => cmd::show::run_show(&args, &ctx),
        Commands::Set(args) => cmd::edit::run_set(&args, &ctx),
        Commands::Toggle(args) => cmd::edit::run_toggle(&args, &ctx),
        Commands::Comment(args) => cmd::edit::run_comment(&args, &ctx),
        Commands::Contact(args) => cmd::edit::run_contact(&args, &ctx),
        Commands::Meta(args) => cmd::meta::run_meta(&args, &ctx),
        Commands::Forward { command } => cmd::forward::run_forward(&command, &ctx),
        Commands::History(args) => cmd::history::run_history(&args, &ctx),
        Commands::Report(args) => cmd::report::run_report(&args, &ctx),
        Commands::Sync => cmd::sync::run_sync(&ctx),
        Commands::SyncStatus => cmd::sync::run_sync_status(&ctx),
        Commands::Watch(args) => cmd::watch::run_watch(&args, &ctx),
        Commands::Reset(args) => cmd::reset::run_reset(&args, &ctx),
        Commands::Completions(_) => Ok(()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let output = cli.output_mode();

    match run(cli, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.downcast_ref::<Reported>().is_some() => ExitCode::FAILURE,
        Err(err) => {
            if let Err(render_err) = render_error(output, &describe(&err)) {
                eprintln!("error: {err:#} ({render_err})");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::parse_from(["sst", "units", "--date", "2024-01-10", "--json", "-v"]);
        assert_eq!(cli.date, NaiveDate::from_ymd_opt(2024, 1, 10));
        assert!(cli.json);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Units(_)));
    }

    #[test]
    fn json_flag_sets_output_mode() {
        let cli = Cli::parse_from(["sst", "--json", "report"]);
        assert!(cli.output_mode().is_json());
    }

    #[test]
    fn format_flag_parses() {
        let cli = Cli::parse_from(["sst", "--format", "text", "units"]);
        assert_eq!(cli.format, Some(OutputMode::Text));
    }

    #[test]
    fn bad_date_is_rejected_by_parser() {
        assert!(Cli::try_parse_from(["sst", "--date", "yesterday", "units"]).is_err());
    }

    #[test]
    fn set_accepts_zero_or_more_statuses() {
        let cli = Cli::parse_from(["sst", "set", "12"]);
        assert!(matches!(cli.command, Commands::Set(ref args) if args.statuses.is_empty()));

        let cli = Cli::parse_from(["sst", "set", "12", "overlocked", "i"]);
        assert!(matches!(cli.command, Commands::Set(ref args) if args.statuses.len() == 2));
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(Cli::try_parse_from(["sst", "toggle", "12", "paid"]).is_err());
    }

    #[test]
    fn report_modified_filters_conflict() {
        let result = Cli::try_parse_from([
            "sst",
            "report",
            "--modified-on",
            "2024-01-10",
            "--modified-today",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn ranges_set_parses_ranges() {
        let cli = Cli::parse_from(["sst", "ranges", "set", "1-80", "81-90"]);
        assert!(matches!(
            cli.command,
            Commands::Ranges {
                command: cmd::ranges::RangesCommand::Set(ref args)
            } if args.ranges.len() == 2
        ));
        assert!(Cli::try_parse_from(["sst", "ranges", "set", "a-b"]).is_err());
    }

    #[test]
    fn all_subcommands_parse() {
        let subcommands = [
            vec!["sst", "init"],
            vec!["sst", "ranges", "list"],
            vec!["sst", "ranges", "add"],
            vec!["sst", "ranges", "remove", "1"],
            vec!["sst", "ranges", "from-units", "1", "2"],
            vec!["sst", "units"],
            vec!["sst", "show", "1"],
            vec!["sst", "toggle", "1", "locked"],
            vec!["sst", "comment", "1", "x"],
            vec!["sst", "contact", "1", "--name", "n"],
            vec!["sst", "meta", "1", "--size", "5x5", "--type", "climate"],
            vec!["sst", "forward", "show", "1"],
            vec!["sst", "forward", "clear-comment", "1"],
            vec!["sst", "history", "1"],
            vec!["sst", "report"],
            vec!["sst", "sync"],
            vec!["sst", "sync-status"],
            vec!["sst", "watch", "--max-polls", "1"],
            vec!["sst", "reset", "--yes"],
            vec!["sst", "completions", "zsh"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter());
            assert!(result.is_ok(), "failed to parse {args:?}: {:?}", result.err());
        }
    }

    #[test]
    fn clap_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
