//! On-disk snapshot files: one JSON file per feed, replaced atomically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{FeedError, FeedResult};
use crate::snapshot::{FeedEntry, FeedSnapshot, IndicatorKind};

const EXTENSION: &str = "json";

#[derive(Debug, Serialize, Deserialize)]
struct FeedFile {
    source_name: String,
    version: u64,
    fetched_at: DateTime<Utc>,
    entries: Vec<StoredEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    indicator: String,
    kind: IndicatorKind,
    first_seen: DateTime<Utc>,
}

/// Snapshot file path for a feed inside `dir`.
///
/// Case is kept so feeds whose names differ only in case get their own files.
#[must_use]
pub fn feed_path(dir: &Path, source_name: &str) -> PathBuf {
    let safe: String = source_name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    dir.join(format!("{safe}.{EXTENSION}"))
}

/// Write a snapshot: temp file in the same directory, fsync, rename.
///
/// Readers of the directory see either the previous file or the new one.
pub(crate) fn write_snapshot(dir: &Path, snapshot: &FeedSnapshot) -> FeedResult<PathBuf> {
    let Some(fetched_at) = snapshot.fetched_at() else {
        return Err(FeedError::Persist {
            path: feed_path(dir, snapshot.source_name()),
            reason: String::from("refusing to persist a never-loaded snapshot"),
        });
    };

    let file = FeedFile {
        source_name: snapshot.source_name().to_string(),
        version: snapshot.version(),
        fetched_at,
        entries: snapshot
            .entries()
            .into_iter()
            .map(|e| StoredEntry {
                indicator: e.indicator.clone(),
                kind: e.kind,
                first_seen: e.first_seen,
            })
            .collect(),
    };

    fs::create_dir_all(dir)?;
    let path = feed_path(dir, snapshot.source_name());
    let tmp = path.with_extension(format!("{EXTENSION}.tmp"));

    let body = serde_json::to_vec(&file)?;
    {
        let mut out = fs::File::create(&tmp)?;
        out.write_all(&body)?;
        out.sync_all()?;
    }
    fs::rename(&tmp, &path).map_err(|e| FeedError::Persist {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    debug!(path = %path.display(), entries = file.entries.len(), "snapshot persisted");
    Ok(path)
}

/// Read one snapshot file
pub(crate) fn read_snapshot(path: &Path) -> FeedResult<FeedSnapshot> {
    let content = fs::read(path)?;
    let file: FeedFile = serde_json::from_slice(&content)?;
    let source_name = file.source_name;
    let entries = file.entries.into_iter().map(|e| FeedEntry {
        indicator: e.indicator,
        kind: e.kind,
        source_name: source_name.clone(),
        first_seen: e.first_seen,
    });
    Ok(FeedSnapshot::from_entries(
        source_name.clone(),
        file.version,
        file.fetched_at,
        entries,
    ))
}

/// Load every snapshot file in `dir`.
///
/// Missing directories yield nothing; unreadable files are logged and
/// skipped so one corrupt feed cannot block startup.
pub(crate) fn load_dir(dir: &Path) -> FeedResult<Vec<FeedSnapshot>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut snapshots = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
            continue;
        }
        match read_snapshot(&path) {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable snapshot"),
        }
    }
    snapshots.sort_by(|a, b| a.source_name().cmp(b.source_name()));
    Ok(snapshots)
}
