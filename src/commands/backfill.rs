use anyhow::Result;
use chrono::Duration;

use crate::commands::{CommandReport, resolve_now};
use crate::sources::git::GitRevisionSource;
use crate::sources::http::HttpFeed;
use crate::vr::audit;
use crate::vr::config::{MAX_WINDOW_DAYS, load_config};
use crate::vr::extract::ExtractOptions;
use crate::vr::paths::resolve_paths;
use crate::vr::pipeline::{FinalizeOptions, run_backfill};
use crate::vr::store::lock_store;

#[derive(Debug, Clone, Default)]
pub struct BackfillOptions {
    pub lookback_days: Option<u64>,
    pub dry_run: bool,
    pub now: Option<String>,
}

pub fn run(opts: &BackfillOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config()?;
    let base_url = cfg.require_feed_base_url()?;
    let now = resolve_now(opts.now.as_deref())?;
    let mut report = CommandReport::new("backfill");

    let lookback_days = opts.lookback_days.unwrap_or(cfg.source.lookback_days);
    if !(1..=MAX_WINDOW_DAYS).contains(&lookback_days) {
        report.issue(format!(
            "invalid --lookback-days {lookback_days}: must be between 1 and {MAX_WINDOW_DAYS}"
        ));
        return Ok(report);
    }

    report.detail(format!("players_dir={}", paths.players_dir.display()));
    report.detail(format!("tracked_path={}", cfg.source.tracked_path));
    report.detail(format!("lookback_days={lookback_days}"));
    report.detail(format!("now={}", now.to_rfc3339()));

    let _lock = if opts.dry_run {
        None
    } else {
        Some(lock_store(&paths.players_dir)?)
    };
    let source = GitRevisionSource::open(&cfg.source)?;
    report.detail(format!("repo_dir={}", source.repo_dir().display()));
    let feed = HttpFeed::new(base_url, cfg.feed.http_timeout_secs)?;

    let extract = ExtractOptions {
        tracked_path: cfg.source.tracked_path.clone(),
        since: now - Duration::days(lookback_days as i64),
        concurrency: cfg.source.fetch_concurrency,
    };
    let finalize = FinalizeOptions {
        now,
        retention: cfg.retention(),
        players_dir: paths.players_dir.clone(),
        dry_run: opts.dry_run,
    };

    let (players, outcome) = match run_backfill(&source, &feed, &extract, &finalize) {
        Ok(done) => done,
        Err(err) => {
            audit::append_event(&paths, "backfill", "failed", &format!("{err:#}"))?;
            return Err(err);
        }
    };

    report.detail(format!("revisions={}", outcome.revisions));
    report.detail(format!("revisions_skipped={}", outcome.revisions_skipped));
    report.detail(format!("snapshots={}", outcome.snapshots));
    report.detail(format!("archival.snapshots={}", outcome.archival.snapshots));
    report.detail(format!(
        "archival.players_created={}",
        outcome.archival.players_created
    ));
    report.detail(format!(
        "archival.entries_added={}",
        outcome.archival.entries_added
    ));
    report.detail(format!(
        "archival.missing_fc={}",
        outcome.archival.missing_fc
    ));
    report.detail(format!("feed.rows={}", outcome.finalize.feed_rows));
    report.detail(format!(
        "feed.rows_skipped={}",
        outcome.finalize.feed_rows_skipped
    ));
    if let Some(warning) = &outcome.finalize.feed_warning {
        report.detail(format!("feed.warning={warning}"));
    }
    report.detail(format!(
        "live.entries_added={}",
        outcome.finalize.live.entries_added
    ));
    report.detail(format!(
        "live.duplicates_skipped={}",
        outcome.finalize.live.duplicates_skipped
    ));
    report.detail(format!(
        "stats.entries_pruned={}",
        outcome.finalize.stats.entries_pruned
    ));
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
        "backfill",
        "ok",
        &format!(
            "players={} revisions={} snapshots={} written={}",
            players.len(),
            outcome.revisions,
            outcome.snapshots,
            outcome.finalize.written
        ),
    )?;
    Ok(report)
}
