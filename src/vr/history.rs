use crate::vr::population::{PlayerObservation, SnapshotSet};
use crate::vr::record::{PlayerRecord, VrHistoryEntry};
use crate::vr::util::parse_instant;
use std::collections::BTreeMap;

/// Every known player, keyed by `fc`.
pub type PlayerStore = BTreeMap<String, PlayerRecord>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub snapshots: usize,
    pub players_created: usize,
    pub entries_added: usize,
    pub duplicates_skipped: usize,
    pub missing_fc: usize,
}

impl MergeOutcome {
    pub fn absorb(&mut self, other: MergeOutcome) {
        self.snapshots += other.snapshots;
        self.players_created += other.players_created;
        self.entries_added += other.entries_added;
        self.duplicates_skipped += other.duplicates_skipped;
        self.missing_fc += other.missing_fc;
    }
}

fn insertion_index(history: &[VrHistoryEntry], timestamp: &str) -> usize {
    let Some(at) = parse_instant(timestamp) else {
        return history.len();
    };
    let key = (Some(at), timestamp);
    history
        .iter()
        .rposition(|e| (parse_instant(&e.date), e.date.as_str()) <= key)
        .map_or(0, |i| i + 1)
}

/// Records `total_vr` at `timestamp`. Returns false when the player already
/// has an entry with this exact timestamp string.
fn record_total(player: &mut PlayerRecord, timestamp: &str, total_vr: i64) -> bool {
    if player.vr_history.iter().any(|e| e.date == timestamp) {
        return false;
    }

    let idx = insertion_index(&player.vr_history, timestamp);
    let prev_total = match idx {
        0 => 0,
        _ => player.vr_history[idx - 1].total_vr,
    };
    player.vr_history.insert(
        idx,
        VrHistoryEntry {
            date: timestamp.to_string(),
            vr_change: total_vr.saturating_sub(prev_total),
            total_vr,
        },
    );
    // Only reachable when a snapshot lands before already-known entries.
    if let Some(next) = player.vr_history.get_mut(idx + 1) {
        next.vr_change = next.total_vr.saturating_sub(total_vr);
    }
    true
}

pub fn apply_snapshot(
    players: &mut PlayerStore,
    timestamp: &str,
    population: &[PlayerObservation],
) -> MergeOutcome {
    let mut outcome = MergeOutcome {
        snapshots: 1,
        ..MergeOutcome::default()
    };

    for observation in population {
        let Some(fc) = observation.fc.as_deref() else {
            outcome.missing_fc += 1;
            continue;
        };
        let player = players.entry(fc.to_string()).or_insert_with(|| {
            outcome.players_created += 1;
            PlayerRecord::new(fc)
        });
        if let Some(name) = observation.name.as_deref().filter(|n| !n.trim().is_empty()) {
            player.name = name.to_string();
        }
        if record_total(player, timestamp, observation.vr) {
            outcome.entries_added += 1;
        } else {
            outcome.duplicates_skipped += 1;
        }
    }

    outcome
}

/// Folds every snapshot of `set` into `players`, oldest first. Safe to re-run
/// over overlapping sets: timestamps already present are left alone.
pub fn apply_snapshots(players: &mut PlayerStore, set: &SnapshotSet) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();
    for (timestamp, population) in set.ordered() {
        outcome.absorb(apply_snapshot(players, timestamp, population));
    }
    outcome
}
