use crate::error::VrError;
use crate::vr::config::SourceConfig;
use crate::vr::extract::{Revision, RevisionSource};
use crate::vr::util::run_command_with_optional_timeout;
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Revision history read through the `git` CLI. A clone made for the session
/// lives in a temporary directory removed on drop.
#[derive(Debug)]
pub struct GitRevisionSource {
    bin: PathBuf,
    repo_dir: PathBuf,
    timeout_secs: u64,
    _clone: Option<TempDir>,
}

fn resolve_git_bin(bin: &str) -> Result<PathBuf> {
    let candidate = Path::new(bin);
    if candidate.is_file() {
        return Ok(candidate.to_path_buf());
    }
    which::which(bin).with_context(|| format!("git binary `{bin}` not found in VR_GIT_BIN or PATH"))
}

/// git never prompts: a clone that wants credentials fails instead of waiting.
fn git_command(bin: &Path) -> Command {
    let mut cmd = Command::new(bin);
    cmd.env("GIT_TERMINAL_PROMPT", "0").stdin(Stdio::null());
    cmd
}

fn stderr_text(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).trim().to_string()
}

pub fn parse_log_output(stdout: &str) -> Vec<Revision> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let (id, authored_at) = line.split_once('\t')?;
            Some(Revision {
                id: id.trim().to_string(),
                authored_at: authored_at.trim().to_string(),
            })
        })
        .collect()
}

impl GitRevisionSource {
    /// Opens `git_dir` when configured, otherwise bare-clones `repo_url`.
    /// Any failure here means the whole archival source is unavailable.
    pub fn open(cfg: &SourceConfig) -> Result<Self> {
        let bin = resolve_git_bin(&cfg.git_bin)
            .map_err(|err| VrError::SourceUnavailable(format!("{err:#}")))?;

        if let Some(dir) = cfg.git_dir.as_deref() {
            let source = Self {
                bin,
                repo_dir: PathBuf::from(dir),
                timeout_secs: cfg.git_timeout_secs,
                _clone: None,
            };
            source.verify()?;
            return Ok(source);
        }

        let Some(url) = cfg.repo_url.as_deref() else {
            let missing = VrError::MissingConfig("VR_REPO_URL or VR_GIT_DIR".to_string());
            return Err(missing.into());
        };
        let tmp = tempfile::tempdir().context("failed to create clone directory")?;
        let repo_dir = tmp.path().join("repo.git");
        let mut cmd = git_command(&bin);
        cmd.arg("clone")
            .arg("--bare")
            .arg("--quiet")
            .arg(url)
            .arg(&repo_dir);
        let out = run_command_with_optional_timeout(&mut cmd, Some(cfg.git_timeout_secs))
            .map_err(|err| VrError::SourceUnavailable(format!("git clone of {url}: {err:#}")))?;
        if !out.status.success() {
            return Err(VrError::SourceUnavailable(format!(
                "git clone of {url} failed: {}",
                stderr_text(&out)
            ))
            .into());
        }

        Ok(Self {
            bin,
            repo_dir,
            timeout_secs: cfg.git_timeout_secs,
            _clone: Some(tmp),
        })
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    fn run_git(&self, args: &[&str]) -> Result<Output> {
        let mut cmd = git_command(&self.bin);
        cmd.arg("-C").arg(&self.repo_dir).args(args);
        run_command_with_optional_timeout(&mut cmd, Some(self.timeout_secs))
            .with_context(|| format!("failed to run `git {}`", args.join(" ")))
    }

    fn verify(&self) -> Result<()> {
        let out = self
            .run_git(&["rev-parse", "--git-dir"])
            .map_err(|err| VrError::SourceUnavailable(format!("{err:#}")))?;
        if !out.status.success() {
            return Err(VrError::SourceUnavailable(format!(
                "{} is not a git repository: {}",
                self.repo_dir.display(),
                stderr_text(&out)
            ))
            .into());
        }
        Ok(())
    }
}

impl RevisionSource for GitRevisionSource {
    fn list_revisions(&self, path: &str, since: DateTime<Utc>) -> Result<Vec<Revision>> {
        let since_arg = format!(
            "--since={}",
            since.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        let out = self.run_git(&[
            "log",
            "--reverse",
            &since_arg,
            "--format=%H%x09%aI",
            "--",
            path,
        ])?;
        if !out.status.success() {
            return Err(VrError::SourceUnavailable(format!(
                "git log failed: {}",
                stderr_text(&out)
            ))
            .into());
        }
        Ok(parse_log_output(&String::from_utf8_lossy(&out.stdout)))
    }

    fn read_file_at(&self, revision: &str, path: &str) -> Result<Vec<u8>> {
        let revspec = format!("{revision}:{path}");
        let out = self.run_git(&["show", &revspec])?;
        if !out.status.success() {
            anyhow::bail!("git show {revspec} failed: {}", stderr_text(&out));
        }
        Ok(out.stdout)
    }
}
