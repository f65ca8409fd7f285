use crate::vr::population::{Population, SnapshotSet, normalize_population};
use crate::vr::util::epoch_to_timestamp;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct FeedRow {
    pub epoch_secs: i64,
    pub timestamp: String,
    pub population: Population,
}

/// Normalized feed response. `warning` is set when the body as a whole was
/// unusable; `skipped` lists per-row failures.
#[derive(Debug, Clone, Default)]
pub struct FeedBatch {
    pub rows: Vec<FeedRow>,
    pub skipped: Vec<String>,
    pub warning: Option<String>,
}

impl FeedBatch {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            warning: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn to_snapshot_set(&self) -> SnapshotSet {
        let mut set = SnapshotSet::new();
        for row in &self.rows {
            set.insert(row.timestamp.clone(), row.population.clone());
        }
        set
    }
}

fn rows_of(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(rows) => Some(rows),
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(rows)) => Some(rows),
            _ => None,
        },
        _ => None,
    }
}

fn read_epoch(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            let v = n.as_f64()?;
            v.is_finite().then(|| v.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

pub fn normalize_row(row: &Value) -> Result<FeedRow, String> {
    let epoch_secs = row
        .get("timestamp")
        .and_then(read_epoch)
        .ok_or_else(|| "row has no integer timestamp".to_string())?;
    let timestamp = epoch_to_timestamp(epoch_secs)
        .ok_or_else(|| format!("timestamp {epoch_secs} is out of range"))?;
    let data = row
        .get("data")
        .ok_or_else(|| format!("row {epoch_secs} has no data"))?;
    let population = normalize_population(data)
        .ok_or_else(|| format!("row {epoch_secs} data is not a population"))?;
    Ok(FeedRow {
        epoch_secs,
        timestamp,
        population,
    })
}

/// Accepts a bare array of rows, `{"results": [...]}`, or a JSON string of
/// either. Rows come back sorted by epoch seconds.
pub fn normalize_body(body: &str) -> FeedBatch {
    let Ok(mut value) = serde_json::from_str::<Value>(body) else {
        return FeedBatch::unavailable("feed body is not JSON");
    };
    if let Value::String(encoded) = &value {
        match serde_json::from_str::<Value>(encoded) {
            Ok(inner) => value = inner,
            Err(_) => return FeedBatch::unavailable("feed body is a string that is not JSON"),
        }
    }
    let Some(rows) = rows_of(value) else {
        return FeedBatch::unavailable("feed body is neither an array nor {results: [...]}");
    };

    let mut batch = FeedBatch::default();
    for row in &rows {
        match normalize_row(row) {
            Ok(row) => batch.rows.push(row),
            Err(reason) => batch.skipped.push(reason),
        }
    }
    batch.rows.sort_by_key(|row| row.epoch_secs);
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_array_rows_are_sorted() {
        let body = json!([
            {"timestamp": 1_767_225_700, "data": [{"fc": "a", "ev": 2}]},
            {"timestamp": 1_767_225_600, "data": [{"fc": "a", "ev": 1}]},
        ])
        .to_string();

        let batch = normalize_body(&body);
        assert!(batch.warning.is_none());
        let epochs: Vec<i64> = batch.rows.iter().map(|r| r.epoch_secs).collect();
        assert_eq!(epochs, vec![1_767_225_600, 1_767_225_700]);
        assert_eq!(batch.rows[0].timestamp, "2026-01-01T00:00:00.000Z");
    }

    #[test]
    fn results_wrapper_and_encoded_body_are_unwrapped() {
        let inner = json!({"results": [
            {"timestamp": 1_767_225_600, "data": "[{\"fc\":\"a\",\"vr\":5}]"}
        ]})
        .to_string();
        let wrapped = normalize_body(&inner);
        assert_eq!(wrapped.rows.len(), 1);
        assert_eq!(wrapped.rows[0].population[0].vr, 5);

        let encoded = serde_json::to_string(&inner).expect("encode");
        let batch = normalize_body(&encoded);
        assert_eq!(batch.rows.len(), 1);
    }

    #[test]
    fn keyed_data_is_flattened() {
        let body = json!([{"timestamp": 1_767_225_600, "data": {
            "a": {"fc": "a", "ev": 1},
            "b": {"fc": "b", "ev": 2},
        }}])
        .to_string();
        let batch = normalize_body(&body);
        assert_eq!(batch.rows[0].population.len(), 2);
    }

    #[test]
    fn bad_rows_are_skipped_individually() {
        let body = json!([
            {"timestamp": 1_767_225_600, "data": "{broken"},
            {"data": []},
            {"timestamp": "1767225660", "data": []},
            {"timestamp": 1_767_225_720},
        ])
        .to_string();
        let batch = normalize_body(&body);
        assert_eq!(batch.rows.len(), 1);
        assert_eq!(batch.rows[0].epoch_secs, 1_767_225_660);
        assert_eq!(batch.skipped.len(), 3);
    }

    #[test]
    fn unrecognized_bodies_yield_no_rows() {
        for body in ["not json", "42", "{\"rows\": []}", "\"nope\""] {
            let batch = normalize_body(body);
            assert!(batch.rows.is_empty(), "{body}");
            assert!(batch.warning.is_some(), "{body}");
        }
    }

    #[test]
    fn identical_epochs_collapse_to_last_row_in_snapshot_set() {
        let body = json!([
            {"timestamp": 1_767_225_600, "data": [{"fc": "a", "ev": 1}]},
            {"timestamp": 1_767_225_600, "data": [{"fc": "a", "ev": 2}]},
        ])
        .to_string();
        let set = normalize_body(&body).to_snapshot_set();
        assert_eq!(set.len(), 1);
        let pop = set.get("2026-01-01T00:00:00.000Z").expect("row");
        assert_eq!(pop[0].vr, 2);
    }
}
