use crate::vr::discord::DiscordStatus;
use serde::{Deserialize, Serialize};

pub const UNKNOWN_NAME: &str = "Unknown";

fn default_name() -> String {
    UNKNOWN_NAME.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VrHistoryEntry {
    pub date: String,
    #[serde(rename = "vrChange")]
    pub vr_change: i64,
    #[serde(rename = "totalVR")]
    pub total_vr: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VrStats {
    pub last24_hours: i64,
    pub last_week: i64,
    pub last_month: i64,
}

/// The persisted per-player unit. `fc` never changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub fc: String,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub vr_history: Vec<VrHistoryEntry>,
    #[serde(rename = "vrStats", default, skip_serializing_if = "Option::is_none")]
    pub vr_stats: Option<VrStats>,
    #[serde(default)]
    pub discord: DiscordStatus,
}

impl PlayerRecord {
    pub fn new(fc: impl Into<String>) -> Self {
        Self {
            fc: fc.into(),
            name: default_name(),
            vr_history: Vec::new(),
            vr_stats: None,
            discord: DiscordStatus::default(),
        }
    }
}
