use crate::vr::record::PlayerRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const UNKNOWN: &str = "unknown";
pub const NOT_LINKED: &str = "not_linked";

/// Discord linkage of a player. A linked profile is kept as whatever opaque
/// JSON value the service handed out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum DiscordStatus {
    #[default]
    Unknown,
    NotLinked,
    Linked(Value),
}

impl From<Value> for DiscordStatus {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Unknown,
            Value::String(s) if s == UNKNOWN => Self::Unknown,
            Value::String(s) if s == NOT_LINKED => Self::NotLinked,
            other => Self::Linked(other),
        }
    }
}

impl From<DiscordStatus> for Value {
    fn from(status: DiscordStatus) -> Self {
        match status {
            DiscordStatus::Unknown => Value::String(UNKNOWN.to_string()),
            DiscordStatus::NotLinked => Value::String(NOT_LINKED.to_string()),
            DiscordStatus::Linked(v) => v,
        }
    }
}

pub type DiscordCache = BTreeMap<String, DiscordStatus>;

/// Reconciles a cached linkage with the stored one. A not-linked cache entry
/// never downgrades an existing profile; a concrete profile always wins.
pub fn merge_status(stored: &DiscordStatus, cached: Option<&DiscordStatus>) -> DiscordStatus {
    match cached {
        None | Some(DiscordStatus::Unknown) => stored.clone(),
        Some(DiscordStatus::NotLinked) => match stored {
            DiscordStatus::Unknown | DiscordStatus::NotLinked => DiscordStatus::NotLinked,
            DiscordStatus::Linked(_) => stored.clone(),
        },
        Some(linked @ DiscordStatus::Linked(_)) => linked.clone(),
    }
}

/// Parses the `/discord` body: a mapping of fc to linkage, possibly JSON-encoded.
pub fn parse_cache(body: &str) -> Option<DiscordCache> {
    let mut value: Value = serde_json::from_str(body).ok()?;
    if let Value::String(encoded) = &value {
        value = serde_json::from_str(encoded).ok()?;
    }
    let map = value.as_object()?;
    Some(
        map.iter()
            .map(|(fc, v)| (fc.clone(), DiscordStatus::from(v.clone())))
            .collect(),
    )
}

pub fn apply_cache<'a>(
    players: impl IntoIterator<Item = &'a mut PlayerRecord>,
    cache: &DiscordCache,
) -> usize {
    let mut changed = 0usize;
    for player in players {
        let next = merge_status(&player.discord, cache.get(&player.fc));
        if next != player.discord {
            player.discord = next;
            changed += 1;
        }
    }
    changed
}
