pub mod backfill;
pub mod status;
pub mod update;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }
}

/// `--now` override for reproducible runs; defaults to the wall clock.
pub fn resolve_now(raw: Option<&str>) -> Result<DateTime<Utc>> {
    let Some(raw) = raw else {
        return Ok(Utc::now());
    };
    let parsed = DateTime::parse_from_rfc3339(raw.trim())
        .with_context(|| format!("invalid --now `{raw}`: expected RFC 3339"))?;
    Ok(parsed.with_timezone(&Utc))
}
