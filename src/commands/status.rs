use anyhow::Result;
use std::env;

use crate::commands::CommandReport;
use crate::vr::config::{load_config, resolve_config_path};
use crate::vr::paths::resolve_paths;

include!(concat!(env!("OUT_DIR"), "/vr_env_allowlist.rs"));

fn configured_env_keys() -> Vec<&'static str> {
    GENERATED_VR_ENV_ALLOWLIST
        .iter()
        .copied()
        .filter(|key| env::var(key).is_ok_and(|v| !v.trim().is_empty()))
        .collect()
}

pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config()?;
    let mut report = CommandReport::new("status");

    report.detail(format!("build={}", env!("BUILD_UUID")));
    report.detail(format!("vr_home={}", paths.vr_home.display()));
    report.detail(format!("players_dir={}", paths.players_dir.display()));
    report.detail(format!("logs_dir={}", paths.logs_dir.display()));
    if let Some(path) = resolve_config_path() {
        report.detail(format!(
            "config_path={} exists={}",
            path.display(),
            path.exists()
        ));
    }
    report.detail(format!("source.tracked_path={}", cfg.source.tracked_path));
    report.detail(format!("source.lookback_days={}", cfg.source.lookback_days));
    report.detail(format!(
        "source.fetch_concurrency={}",
        cfg.source.fetch_concurrency
    ));
    match (&cfg.source.git_dir, &cfg.source.repo_url) {
        (Some(dir), _) => report.detail(format!("source.git_dir={dir}")),
        (None, Some(url)) => report.detail(format!("source.repo_url={url}")),
        (None, None) => report.detail("source=none (backfill unavailable)"),
    }
    report.detail(format!(
        "retention.retention_days={}",
        cfg.retention.retention_days
    ));
    report.detail(format!("env.set={}", configured_env_keys().join(",")));

    match cfg.require_feed_base_url() {
        Ok(url) => report.detail(format!("feed.base_url={url}")),
        Err(err) => report.issue(err.to_string()),
    }
    if !paths.players_dir.exists() {
        report.detail("players_dir does not exist yet");
    }

    Ok(report)
}
