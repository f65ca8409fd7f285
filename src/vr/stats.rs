use crate::vr::history::PlayerStore;
use crate::vr::record::{PlayerRecord, VrHistoryEntry, VrStats};
use crate::vr::util::parse_instant;
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsOutcome {
    pub players: usize,
    pub refreshed: usize,
    pub entries_pruned: usize,
    pub emptied: usize,
}

/// `now - span`, clamped to the earliest representable instant.
fn horizon(now: DateTime<Utc>, span: Duration) -> DateTime<Utc> {
    now.checked_sub_signed(span).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Latest total minus the total of the first entry at or after `now - window`,
/// or of the oldest entry when nothing is that recent. `instants` and
/// `history` are parallel and ascending.
fn window_delta(
    instants: &[DateTime<Utc>],
    history: &[VrHistoryEntry],
    now: DateTime<Utc>,
    window: Duration,
) -> i64 {
    let (Some(first), Some(latest)) = (history.first(), history.last()) else {
        return 0;
    };
    let cutoff = horizon(now, window);
    let anchor = instants
        .iter()
        .position(|at| *at >= cutoff)
        .map_or(first, |idx| &history[idx]);
    latest.total_vr.saturating_sub(anchor.total_vr)
}

/// Returns the number of pruned entries. Entries with an unparseable date
/// count as pruned; entries at exactly `now - retention` are kept.
pub fn refresh_player(
    player: &mut PlayerRecord,
    now: DateTime<Utc>,
    retention: Duration,
) -> usize {
    let before = player.vr_history.len();
    let kept_from = horizon(now, retention);

    let mut dated: Vec<(DateTime<Utc>, VrHistoryEntry)> = std::mem::take(&mut player.vr_history)
        .into_iter()
        .filter_map(|e| parse_instant(&e.date).map(|at| (at, e)))
        .collect();
    dated.sort_by(|a, b| a.0.cmp(&b.0));
    dated.retain(|(at, _)| *at >= kept_from);

    let (instants, history): (Vec<_>, Vec<_>) = dated.into_iter().unzip();
    player.vr_history = history;
    let pruned = before - player.vr_history.len();

    if player.vr_history.is_empty() {
        return pruned;
    }

    player.vr_stats = Some(VrStats {
        last24_hours: window_delta(&instants, &player.vr_history, now, Duration::days(1)),
        last_week: window_delta(&instants, &player.vr_history, now, Duration::days(7)),
        last_month: window_delta(&instants, &player.vr_history, now, Duration::days(30)),
    });
    pruned
}

pub fn refresh_all(
    players: &mut PlayerStore,
    now: DateTime<Utc>,
    retention: Duration,
) -> StatsOutcome {
    let mut outcome = StatsOutcome::default();
    for player in players.values_mut() {
        outcome.players += 1;
        outcome.entries_pruned += refresh_player(player, now, retention);
        if player.vr_history.is_empty() {
            outcome.emptied += 1;
        } else {
            outcome.refreshed += 1;
        }
    }
    outcome
}
