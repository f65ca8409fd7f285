use crate::vr::population::{Population, SnapshotSet, parse_population};
use crate::vr::util::{canonical_timestamp, parse_instant};
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use std::thread;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub id: String,
    pub authored_at: String,
}

/// Read access to the revision history of a single repository.
pub trait RevisionSource: Sync {
    /// Revisions touching `path` since `since`, oldest first.
    fn list_revisions(&self, path: &str, since: DateTime<Utc>) -> Result<Vec<Revision>>;

    fn read_file_at(&self, revision: &str, path: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub tracked_path: String,
    pub since: DateTime<Utc>,
    pub concurrency: usize,
}

#[derive(Debug, Clone)]
pub struct SkippedRevision {
    pub revision: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractOutcome {
    pub snapshots: SnapshotSet,
    pub revisions: usize,
    pub skipped: Vec<SkippedRevision>,
}

fn fetch_snapshot(
    source: &dyn RevisionSource,
    revision: &Revision,
    path: &str,
) -> Result<(String, Population)> {
    let authored_at = parse_instant(&revision.authored_at)
        .ok_or_else(|| anyhow!("unparseable author date `{}`", revision.authored_at))?;
    let raw = source.read_file_at(&revision.id, path)?;
    let population = parse_population(&raw)?;
    Ok((canonical_timestamp(authored_at), population))
}

/// Walks the tracked file's history and keys each parseable revision by its
/// author timestamp. Fetches run `concurrency` at a time; results are folded
/// back in revision order, so a later revision with an identical timestamp
/// replaces the earlier one.
pub fn extract_snapshots(
    source: &dyn RevisionSource,
    opts: &ExtractOptions,
) -> Result<ExtractOutcome> {
    let revisions = source
        .list_revisions(&opts.tracked_path, opts.since)
        .with_context(|| format!("failed to list revisions of {}", opts.tracked_path))?;

    let mut outcome = ExtractOutcome {
        revisions: revisions.len(),
        ..ExtractOutcome::default()
    };
    let path = opts.tracked_path.as_str();

    for chunk in revisions.chunks(opts.concurrency.max(1)) {
        let results: Vec<Result<(String, Population)>> = thread::scope(|s| {
            let handles: Vec<_> = chunk
                .iter()
                .map(|revision| s.spawn(move || fetch_snapshot(source, revision, path)))
                .collect();
            handles
                .into_iter()
                .map(|h| {
                    h.join()
                        .unwrap_or_else(|_| Err(anyhow!("revision fetch thread panicked")))
                })
                .collect()
        });

        for (revision, result) in chunk.iter().zip(results) {
            match result {
                Ok((timestamp, population)) => outcome.snapshots.insert(timestamp, population),
                Err(err) => outcome.skipped.push(SkippedRevision {
                    revision: revision.id.clone(),
                    reason: format!("{err:#}"),
                }),
            }
        }
    }

    Ok(outcome)
}
