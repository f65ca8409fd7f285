use crate::error::VrError;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub repo_url: Option<String>,
    pub git_dir: Option<String>,
    pub git_bin: String,
    pub tracked_path: String,
    pub lookback_days: u64,
    pub fetch_concurrency: usize,
    pub git_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            repo_url: None,
            git_dir: None,
            git_bin: "git".to_string(),
            tracked_path: "players.json".to_string(),
            lookback_days: 30,
            fetch_concurrency: 8,
            git_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub base_url: Option<String>,
    pub http_timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            http_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub retention_days: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self { retention_days: 30 }
    }
}

/// Upper bound for lookback and retention windows, roughly a century.
pub const MAX_WINDOW_DAYS: u64 = 36_500;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VrConfig {
    pub source: SourceConfig,
    pub feed: FeedConfig,
    pub retention: RetentionConfig,
}

impl VrConfig {
    pub fn require_feed_base_url(&self) -> Result<&str> {
        match self.feed.base_url.as_deref() {
            Some(url) if !url.trim().is_empty() => Ok(url),
            _ => Err(VrError::MissingConfig("VR_FEED_BASE_URL".into()).into()),
        }
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.retention.retention_days as i64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialVrConfig {
    source: Option<SourceConfig>,
    feed: Option<FeedConfig>,
    retention: Option<RetentionConfig>,
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn env_or_optional(var: &str, fallback: Option<String>) -> Option<String> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => fallback,
    }
}

fn validate(cfg: &VrConfig) -> Result<()> {
    if cfg.source.tracked_path.trim().is_empty() {
        return Err(anyhow!("invalid tracked path: cannot be empty"));
    }
    if !(1..=MAX_WINDOW_DAYS).contains(&cfg.source.lookback_days) {
        return Err(anyhow!(
            "invalid lookback days: must be between 1 and {MAX_WINDOW_DAYS}"
        ));
    }
    if cfg.source.fetch_concurrency == 0 {
        return Err(anyhow!("invalid fetch concurrency: must be >= 1"));
    }
    if cfg.source.git_timeout_secs == 0 {
        return Err(anyhow!("invalid git timeout: must be >= 1 second"));
    }
    if cfg.feed.http_timeout_secs == 0 {
        return Err(anyhow!("invalid http timeout: must be >= 1 second"));
    }
    if !(1..=MAX_WINDOW_DAYS).contains(&cfg.retention.retention_days) {
        return Err(anyhow!(
            "invalid retention days: must be between 1 and {MAX_WINDOW_DAYS}"
        ));
    }
    if let Some(url) = &cfg.feed.base_url
        && !(url.starts_with("http://") || url.starts_with("https://"))
    {
        return Err(anyhow!(
            "invalid feed base url `{url}`: must start with http:// or https://"
        ));
    }
    Ok(())
}

pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("VR_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let home = dirs::home_dir()?;
    Some(home.join(".vr-tracker").join("config.toml"))
}

fn merge_file_config(base: &mut VrConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)
        .map_err(|err| VrError::InvalidConfig(format!("{}: {err}", path.display())))?;
    let parsed = parse_file_config(&raw)
        .map_err(|err| VrError::InvalidConfig(format!("{}: {err}", path.display())))?;
    if let Some(source) = parsed.source {
        base.source = source;
    }
    if let Some(feed) = parsed.feed {
        base.feed = feed;
    }
    if let Some(retention) = parsed.retention {
        base.retention = retention;
    }
    Ok(())
}

fn parse_file_config(raw: &str) -> Result<PartialVrConfig, toml::de::Error> {
    toml::from_str(raw)
}

pub fn load_config() -> Result<VrConfig> {
    let mut cfg = VrConfig::default();
    merge_file_config(&mut cfg)?;

    cfg.source.repo_url = env_or_optional("VR_REPO_URL", cfg.source.repo_url);
    cfg.source.git_dir = env_or_optional("VR_GIT_DIR", cfg.source.git_dir);
    cfg.source.git_bin = env_or_string("VR_GIT_BIN", &cfg.source.git_bin);
    cfg.source.tracked_path = env_or_string("VR_TRACKED_PATH", &cfg.source.tracked_path);
    cfg.source.lookback_days = env_or_u64("VR_LOOKBACK_DAYS", cfg.source.lookback_days);
    cfg.source.fetch_concurrency =
        env_or_u64("VR_FETCH_CONCURRENCY", cfg.source.fetch_concurrency as u64) as usize;
    cfg.source.git_timeout_secs = env_or_u64("VR_GIT_TIMEOUT_SECS", cfg.source.git_timeout_secs);
    cfg.feed.base_url = env_or_optional("VR_FEED_BASE_URL", cfg.feed.base_url);
    cfg.feed.http_timeout_secs = env_or_u64("VR_HTTP_TIMEOUT_SECS", cfg.feed.http_timeout_secs);
    cfg.retention.retention_days = env_or_u64("VR_RETENTION_DAYS", cfg.retention.retention_days);

    validate(&cfg)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_without_feed_url() {
        let cfg = VrConfig::default();
        assert!(validate(&cfg).is_ok());
        let err = cfg.require_feed_base_url().expect_err("missing url");
        assert!(err.to_string().contains("VR_FEED_BASE_URL"));
    }

    #[test]
    fn partial_file_tables_keep_field_defaults() {
        let parsed = parse_file_config(
            r#"
[source]
repo_url = "https://example.com/data.git"
fetch_concurrency = 4

[feed]
base_url = "https://feed.example.com"
"#,
        )
        .expect("parse");
        let source = parsed.source.expect("source");
        assert_eq!(source.fetch_concurrency, 4);
        assert_eq!(source.tracked_path, "players.json");
        assert_eq!(source.lookback_days, 30);
        assert_eq!(parsed.feed.expect("feed").http_timeout_secs, 30);
        assert!(parsed.retention.is_none());
    }

    #[test]
    fn validate_rejects_zero_limits_and_bad_urls() {
        let mut cfg = VrConfig::default();
        cfg.source.fetch_concurrency = 0;
        assert!(validate(&cfg).is_err());

        let mut cfg = VrConfig::default();
        cfg.retention.retention_days = 0;
        assert!(validate(&cfg).is_err());

        let mut cfg = VrConfig::default();
        cfg.feed.base_url = Some("ftp://feed".to_string());
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn validate_caps_window_lengths() {
        let mut cfg = VrConfig::default();
        cfg.retention.retention_days = MAX_WINDOW_DAYS;
        cfg.source.lookback_days = MAX_WINDOW_DAYS;
        assert!(validate(&cfg).is_ok());

        let mut cfg = VrConfig::default();
        cfg.retention.retention_days = 100_000_000;
        let err = validate(&cfg).expect_err("huge retention");
        assert!(err.to_string().contains("retention days"));

        let mut cfg = VrConfig::default();
        cfg.source.lookback_days = u64::MAX;
        let err = validate(&cfg).expect_err("huge lookback");
        assert!(err.to_string().contains("lookback days"));
    }
}
