use crate::error::VrError;
use crate::vr::history::PlayerStore;
use crate::vr::record::PlayerRecord;
use crate::vr::util::now_epoch_secs;
use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    pub players: PlayerStore,
    pub skipped: Vec<SkippedFile>,
}

/// Holds an exclusive lock on the players directory until dropped.
#[derive(Debug)]
pub struct StoreLock {
    _file: File,
}

pub fn player_file_name(fc: &str) -> String {
    let safe: String = fc
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    format!("{safe}.json")
}

pub fn player_file_path(dir: &Path, fc: &str) -> PathBuf {
    dir.join(player_file_name(fc))
}

pub fn lock_store(dir: &Path) -> Result<StoreLock> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(".lock");
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    if file.try_lock_exclusive().is_err() {
        return Err(VrError::StoreLocked(dir.display().to_string()).into());
    }
    Ok(StoreLock { _file: file })
}

pub fn load_player(path: &Path) -> Result<PlayerRecord> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let parsed: PlayerRecord = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(parsed)
}

/// Loads every `*.json` player file. Unreadable or corrupt files are reported
/// in `skipped` rather than failing the load.
pub fn load_players(dir: &Path) -> Result<LoadOutcome> {
    let mut outcome = LoadOutcome::default();
    if !dir.exists() {
        return Ok(outcome);
    }

    let mut paths = Vec::new();
    let entries = fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    paths.sort();

    for path in paths {
        match load_player(&path) {
            Ok(record) => {
                outcome.players.insert(record.fc.clone(), record);
            }
            Err(err) => outcome.skipped.push(SkippedFile {
                path,
                reason: format!("{err:#}"),
            }),
        }
    }
    Ok(outcome)
}

/// Renames an unreadable player file to `<name>.<epoch>.corrupt`, out of
/// reach of both the loader and later writes for the same player.
pub fn quarantine_file(path: &Path) -> Result<PathBuf> {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(".{}.corrupt", now_epoch_secs()?));
    let target = path.with_file_name(name);
    fs::rename(path, &target).with_context(|| {
        format!("failed to move {} to {}", path.display(), target.display())
    })?;
    Ok(target)
}

pub fn save_player(dir: &Path, record: &PlayerRecord) -> Result<PathBuf> {
    let path = player_file_path(dir, &record.fc);
    let data = serde_json::to_string_pretty(record)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    tmp.write_all(format!("{data}\n").as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;
    tmp.persist(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

pub fn save_players(dir: &Path, players: &PlayerStore) -> Result<usize> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    for record in players.values() {
        save_player(dir, record)?;
    }
    Ok(players.len())
}
