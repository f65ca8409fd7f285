use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{self, CommandReport};

#[derive(Debug, Parser)]
#[command(
    name = "vr-tracker",
    version,
    about = "Rebuild per-player VR history from git revisions and the live feed"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Rebuild history from the tracked file's git revisions, then apply the live feed.
    Backfill {
        /// Days of revision history to walk (defaults to VR_LOOKBACK_DAYS).
        #[arg(long)]
        lookback_days: Option<u64>,
        #[arg(long)]
        dry_run: bool,
        /// Evaluate retention and stats at this RFC 3339 instant.
        #[arg(long)]
        now: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Apply the live feed on top of the persisted player files.
    Update {
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        now: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show resolved paths and configuration.
    Status {
        #[arg(long)]
        json: bool,
    },
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let verdict = if report.ok { "ok" } else { "failed" };
    println!("{}: {verdict}", report.command);
    for detail in &report.details {
        println!("  {detail}");
    }
    for issue in &report.issues {
        println!("  issue: {issue}");
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let (report, json) = match cli.command {
        Command::Backfill {
            lookback_days,
            dry_run,
            now,
            json,
        } => {
            let opts = commands::backfill::BackfillOptions {
                lookback_days,
                dry_run,
                now,
            };
            (commands::backfill::run(&opts)?, json)
        }
        Command::Update { dry_run, now, json } => {
            let opts = commands::update::UpdateOptions { dry_run, now };
            (commands::update::run(&opts)?, json)
        }
        Command::Status { json } => (commands::status::run()?, json),
    };

    print_report(&report, json)?;
    if !report.ok {
        anyhow::bail!(
            "{} finished with {} issue(s)",
            report.command,
            report.issues.len()
        );
    }
    Ok(())
}
