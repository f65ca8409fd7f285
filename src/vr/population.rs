use crate::vr::util::parse_instant;
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One player's state as seen in a single population snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerObservation {
    pub fc: Option<String>,
    pub name: Option<String>,
    pub vr: i64,
}

pub type Population = Vec<PlayerObservation>;

/// Integer coercion shared by every rating read: numbers truncate, strings
/// keep their leading signed digits, anything else is 0.
pub fn coerce_rating(value: &Value) -> i64 {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                v
            } else if let Some(v) = n.as_f64().filter(|v| v.is_finite()) {
                v.trunc() as i64
            } else {
                0
            }
        }
        Value::String(s) => leading_integer(s),
        _ => 0,
    }
}

fn leading_integer(raw: &str) -> i64 {
    let trimmed = raw.trim_start();
    let mut end = 0usize;
    for (idx, ch) in trimmed.char_indices() {
        let sign = idx == 0 && (ch == '-' || ch == '+');
        if !sign && !ch.is_ascii_digit() {
            break;
        }
        end = idx + ch.len_utf8();
    }
    trimmed[..end].parse::<i64>().unwrap_or(0)
}

/// `ev` wins whenever it is present and non-null, otherwise `vr`, otherwise 0.
pub fn read_rating(record: &Map<String, Value>) -> i64 {
    let picked = ["ev", "vr"]
        .iter()
        .filter_map(|key| record.get(*key))
        .find(|v| !v.is_null());
    picked.map(coerce_rating).unwrap_or(0)
}

fn read_fc(record: &Map<String, Value>) -> Option<String> {
    match record.get("fc")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn read_name(record: &Map<String, Value>) -> Option<String> {
    record
        .get("name")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(ToOwned::to_owned)
}

pub fn observation_from_value(value: &Value) -> Option<PlayerObservation> {
    let record = value.as_object()?;
    Some(PlayerObservation {
        fc: read_fc(record),
        name: read_name(record),
        vr: read_rating(record),
    })
}

/// Flattens a population given as an array of records, a mapping whose values
/// are records, or a JSON string encoding either. Non-object members are dropped.
pub fn normalize_population(value: &Value) -> Option<Population> {
    match value {
        Value::Array(items) => Some(items.iter().filter_map(observation_from_value).collect()),
        Value::Object(map) => Some(map.values().filter_map(observation_from_value).collect()),
        Value::String(encoded) => {
            let inner: Value = serde_json::from_str(encoded).ok()?;
            if inner.is_string() {
                return None;
            }
            normalize_population(&inner)
        }
        _ => None,
    }
}

pub fn parse_population(raw: &[u8]) -> Result<Population> {
    let value: Value = serde_json::from_slice(raw).context("population is not valid JSON")?;
    normalize_population(&value)
        .ok_or_else(|| anyhow::anyhow!("population JSON is neither an array nor a mapping"))
}

/// Populations keyed by their exact timestamp string.
#[derive(Debug, Clone, Default)]
pub struct SnapshotSet {
    snapshots: BTreeMap<String, Population>,
}

impl SnapshotSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write wins for an identical timestamp string.
    pub fn insert(&mut self, timestamp: impl Into<String>, population: Population) {
        self.snapshots.insert(timestamp.into(), population);
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[cfg(test)]
    pub fn get(&self, timestamp: &str) -> Option<&Population> {
        self.snapshots.get(timestamp)
    }

    /// Snapshots in ascending time order. Unparseable timestamps sort first,
    /// equal instants fall back to string order.
    pub fn ordered(&self) -> Vec<(&str, &Population)> {
        let mut out: Vec<_> = self
            .snapshots
            .iter()
            .map(|(ts, pop)| (parse_instant(ts), ts.as_str(), pop))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
        out.into_iter().map(|(_, ts, pop)| (ts, pop)).collect()
    }
}
