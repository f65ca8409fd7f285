use anyhow::Result;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct VrPaths {
    pub vr_home: PathBuf,
    pub players_dir: PathBuf,
    pub logs_dir: PathBuf,
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<VrPaths> {
    let vr_home = match env::var("VR_HOME") {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => required_home_dir()?.join("vr-tracker"),
    };
    let players_dir = env_or_default_path("VR_PLAYERS_DIR", vr_home.join("players"));
    let logs_dir = env_or_default_path("VR_LOGS_DIR", vr_home.join("logs"));

    Ok(VrPaths {
        vr_home,
        players_dir,
        logs_dir,
    })
}
