use anyhow::Result;

use crate::commands::{CommandReport, resolve_now};
use crate::sources::http::HttpFeed;
use crate::vr::audit;
use crate::vr::config::load_config;
use crate::vr::paths::resolve_paths;
use crate::vr::pipeline::{FinalizeOptions, run_update};
use crate::vr::store::lock_store;

#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    pub dry_run: bool,
    pub now: Option<String>,
}

pub fn run(opts: &UpdateOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config()?;
    let base_url = cfg.require_feed_base_url()?;
    let now = resolve_now(opts.now.as_deref())?;
    let mut report = CommandReport::new("update");

    report.detail(format!("players_dir={}", paths.players_dir.display()));
    report.detail(format!("now={}", now.to_rfc3339()));

    let _lock = if opts.dry_run {
        None
    } else {
        Some(lock_store(&paths.players_dir)?)
    };
    let feed = HttpFeed::new(base_url, cfg.feed.http_timeout_secs)?;
    let finalize = FinalizeOptions {
        now,
        retention: cfg.retention(),
        players_dir: paths.players_dir.clone(),
        dry_run: opts.dry_run,
    };

    let (players, outcome) = match run_update(&feed, &finalize) {
        Ok(done) => done,
        Err(err) => {
            audit::append_event(&paths, "update", "failed", &format!("{err:#}"))?;
            return Err(err);
        }
    };

    report.detail(format!("loaded={}", outcome.loaded));
    report.detail(format!("files_skipped={}", outcome.files_skipped));
    report.detail(format!("files_quarantined={}", outcome.files_quarantined));
    report.detail(format!("feed.rows={}", outcome.finalize.feed_rows));
    report.detail(format!(
        "feed.rows_skipped={}",
        outcome.finalize.feed_rows_skipped
    ));
    if let Some(warning) = &outcome.finalize.feed_warning {
        report.detail(format!("feed.warning={warning}"));
    }
    report.detail(format!(
        "live.players_created={}",
        outcome.finalize.live.players_created
    ));
    report.detail(format!(
        "live.entries_added={}",
        outcome.finalize.live.entries_added
    ));
    report.detail(format!(
        "live.duplicates_skipped={}",
        outcome.finalize.live.duplicates_skipped
    ));
    report.detail(format!(
        "live.missing_fc={}",
        outcome.finalize.live.missing_fc
    ));
    report.detail(format!(
        "stats.entries_pruned={}",
        outcome.finalize.stats.entries_pruned
    ));
    report.detail(format!("stats.players={}", outcome.finalize.stats.players));
    report.detail(format!(
        "stats.refreshed={}",
        outcome.finalize.stats.refreshed
    ));
    report.detail(format!("stats.emptied={}", outcome.finalize.stats.emptied));
    report.detail(format!(
        "discord.available={}",
        outcome.finalize.discord_available
    ));
    report.detail(format!(
        "discord.entries={}",
        outcome.finalize.discord_entries
    ));
    report.detail(format!(
        "discord.changed={}",
        outcome.finalize.discord_changed
    ));
    report.detail(format!("players={}", players.len()));
    if opts.dry_run {
        report.detail("dry-run: no player files written");
    } else {
        report.detail(format!("written={}", outcome.finalize.written));
    }

    audit::append_event(
        &paths,
        "update",
        "ok",
        &format!(
            "players={} feed_rows={} written={}",
            players.len(),
            outcome.finalize.feed_rows,
            outcome.finalize.written
        ),
    )?;
    Ok(report)
}
