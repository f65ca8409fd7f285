use crate::error::WarnCode;
use crate::vr::discord::{self, DiscordCache};
use crate::vr::extract::{ExtractOptions, RevisionSource, extract_snapshots};
use crate::vr::feed::{FeedBatch, normalize_body};
use crate::vr::history::{MergeOutcome, PlayerStore, apply_snapshots};
use crate::vr::stats::{StatsOutcome, refresh_all};
use crate::vr::store;
use crate::vr::warn::{self, WarnEvent};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::path::PathBuf;

/// The remote feed service.
pub trait FeedSource {
    /// Raw body of `GET <base>/`.
    fn fetch_rows(&self) -> Result<String>;

    /// Raw body of `GET <base>/discord`.
    fn fetch_discord(&self) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct FinalizeOptions {
    pub now: DateTime<Utc>,
    pub retention: Duration,
    pub players_dir: PathBuf,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FinalizeOutcome {
    pub feed_rows: usize,
    pub feed_rows_skipped: usize,
    pub feed_warning: Option<String>,
    pub live: MergeOutcome,
    pub stats: StatsOutcome,
    pub discord_available: bool,
    pub discord_entries: usize,
    pub discord_changed: usize,
    pub written: usize,
}

#[derive(Debug, Clone, Default)]
pub struct BackfillOutcome {
    pub revisions: usize,
    pub revisions_skipped: usize,
    pub snapshots: usize,
    pub archival: MergeOutcome,
    pub finalize: FinalizeOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateOutcome {
    pub loaded: usize,
    pub files_skipped: usize,
    pub files_quarantined: usize,
    pub finalize: FinalizeOutcome,
}

/// Fetches and normalizes the live feed. Transport failures and unusable
/// bodies come back as an empty batch with a warning.
pub fn fetch_live(feed: &dyn FeedSource) -> FeedBatch {
    let batch = match feed.fetch_rows() {
        Ok(body) => normalize_body(&body),
        Err(err) => {
            let err = format!("{err:#}");
            warn::emit(WarnEvent {
                code: WarnCode::FeedUnavailable,
                stage: "feed",
                action: "fetch-rows",
                item: "/",
                reason: "request-failed",
                err: &err,
            });
            return FeedBatch::unavailable(err);
        }
    };

    if let Some(reason) = &batch.warning {
        warn::emit(WarnEvent {
            code: WarnCode::FeedShapeUnrecognized,
            stage: "feed",
            action: "normalize-body",
            item: "/",
            reason,
            err: "",
        });
    }
    for reason in &batch.skipped {
        warn::emit(WarnEvent {
            code: WarnCode::FeedRowSkipped,
            stage: "feed",
            action: "normalize-row",
            item: "row",
            reason,
            err: "",
        });
    }
    batch
}

pub fn fetch_discord_cache(feed: &dyn FeedSource) -> Option<DiscordCache> {
    let parsed = feed
        .fetch_discord()
        .and_then(|body| {
            discord::parse_cache(&body)
                .ok_or_else(|| anyhow::anyhow!("discord body is not a mapping"))
        });
    match parsed {
        Ok(cache) => Some(cache),
        Err(err) => {
            warn::emit(WarnEvent {
                code: WarnCode::DiscordUnavailable,
                stage: "discord",
                action: "fetch-discord",
                item: "/discord",
                reason: "treating-linkage-as-absent",
                err: &format!("{err:#}"),
            });
            None
        }
    }
}

/// Live overlay, stats, discord linkage and persistence, shared by both
/// pipelines. Runs after the base store has been built.
pub fn finalize(
    players: &mut PlayerStore,
    feed: &dyn FeedSource,
    opts: &FinalizeOptions,
) -> Result<FinalizeOutcome> {
    let batch = fetch_live(feed);
    let mut outcome = FinalizeOutcome {
        feed_rows: batch.rows.len(),
        feed_rows_skipped: batch.skipped.len(),
        feed_warning: batch.warning.clone(),
        ..FinalizeOutcome::default()
    };
    outcome.live = apply_snapshots(players, &batch.to_snapshot_set());
    outcome.stats = refresh_all(players, opts.now, opts.retention);

    let cache = fetch_discord_cache(feed);
    outcome.discord_available = cache.is_some();
    let cache = cache.unwrap_or_default();
    outcome.discord_entries = cache.len();
    outcome.discord_changed = discord::apply_cache(players.values_mut(), &cache);

    if !opts.dry_run {
        outcome.written = store::save_players(&opts.players_dir, players)?;
    }
    Ok(outcome)
}

/// Archival backfill: rebuild from revision history, then overlay the feed.
pub fn run_backfill(
    source: &dyn RevisionSource,
    feed: &dyn FeedSource,
    extract: &ExtractOptions,
    opts: &FinalizeOptions,
) -> Result<(PlayerStore, BackfillOutcome)> {
    let extracted = extract_snapshots(source, extract)?;
    for skipped in &extracted.skipped {
        warn::emit(WarnEvent {
            code: WarnCode::RevisionSkipped,
            stage: "extract",
            action: "read-revision",
            item: &skipped.revision,
            reason: "unreadable-or-corrupt",
            err: &skipped.reason,
        });
    }

    let mut players = PlayerStore::new();
    let archival = apply_snapshots(&mut players, &extracted.snapshots);
    let finalize = finalize(&mut players, feed, opts)?;

    let outcome = BackfillOutcome {
        revisions: extracted.revisions,
        revisions_skipped: extracted.skipped.len(),
        snapshots: extracted.snapshots.len(),
        archival,
        finalize,
    };
    Ok((players, outcome))
}

/// Live update on top of the persisted store.
pub fn run_update(
    feed: &dyn FeedSource,
    opts: &FinalizeOptions,
) -> Result<(PlayerStore, UpdateOutcome)> {
    let loaded = store::load_players(&opts.players_dir)?;
    let mut outcome = UpdateOutcome {
        loaded: loaded.players.len(),
        files_skipped: loaded.skipped.len(),
        ..UpdateOutcome::default()
    };
    for skipped in &loaded.skipped {
        let item = skipped.path.display().to_string();
        warn::emit(WarnEvent {
            code: WarnCode::StoreFileSkipped,
            stage: "store",
            action: "load-player",
            item: &item,
            reason: "unreadable-or-corrupt",
            err: &skipped.reason,
        });
        if opts.dry_run {
            continue;
        }
        match store::quarantine_file(&skipped.path) {
            Ok(_) => outcome.files_quarantined += 1,
            Err(err) => warn::emit(WarnEvent {
                code: WarnCode::StoreFileSkipped,
                stage: "store",
                action: "quarantine-player",
                item: &item,
                reason: "rename-failed",
                err: &format!("{err:#}"),
            }),
        }
    }

    let mut players = loaded.players;
    outcome.finalize = finalize(&mut players, feed, opts)?;
    Ok((players, outcome))
}
