use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::models::{Document, Timestamp};
use crate::storage::{load_json, write_atomic, StoreError};

pub const SNAPSHOT_PREFIX: &str = "taskList-";
pub const SNAPSHOT_SUFFIX: &str = ".json";
pub const DEFAULT_RETENTION: usize = 14;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("failed to copy {source_path} to {target}: {error}")]
    Copy {
        source_path: PathBuf,
        target: PathBuf,
        #[source]
        error: std::io::Error,
    },
    #[error("failed to read backup directory {dir}: {error}")]
    Enumerate {
        dir: PathBuf,
        #[source]
        error: std::io::Error,
    },
    #[error("failed to delete snapshot {path}: {error}")]
    Delete {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
    #[error("invalid snapshot name: {0}")]
    InvalidName(String),
    #[error("snapshot not found: {0}")]
    NotFound(String),
    #[error("failed to restore snapshot: {0}")]
    Restore(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    pub name: String,
    pub modified_at: Timestamp,
}

/// Outcome of one rotation run.
#[derive(Debug, Default)]
pub struct RotationReport {
    pub snapshot: Option<PathBuf>,
    pub pruned: Vec<PathBuf>,
    pub failed: Vec<BackupError>,
}

impl RotationReport {
    pub fn is_clean(&self) -> bool {
        self.snapshot.is_some() && self.failed.is_empty()
    }
}

/// Copies the task document into timestamped snapshots and keeps at most
/// `retention` of them.
#[derive(Debug, Clone)]
pub struct BackupRotator {
    source: PathBuf,
    dir: PathBuf,
    retention: usize,
}

impl BackupRotator {
    pub fn new(source: PathBuf, dir: PathBuf, retention: usize) -> Self {
        Self {
            source,
            dir,
            retention,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    pub fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)
    }

    /// Snapshot, then prune. Never fails: every problem is logged and
    /// recorded in the report.
    pub fn run(&self, now: DateTime<Utc>) -> RotationReport {
        let mut report = RotationReport::default();

        let snapshot = match self.snapshot(now) {
            Ok(path) => path,
            Err(error) => {
                log::error!("backup copy failed, skipping rotation: {error}");
                report.failed.push(error);
                return report;
            }
        };
        log::info!("backup created: {}", snapshot.display());
        report.snapshot = Some(snapshot);

        let snapshots = match self.sorted_snapshots() {
            Ok(list) => list,
            Err(error) => {
                log::error!("backup enumeration failed, skipping prune: {error}");
                report.failed.push(error);
                return report;
            }
        };

        self.prune(snapshots, &mut report);
        report
    }

    /// Deletes the oldest entries of `snapshots` (oldest first) beyond
    /// `retention`. Each deletion is independent of the others.
    fn prune(&self, snapshots: Vec<(PathBuf, SystemTime)>, report: &mut RotationReport) {
        let excess = snapshots.len().saturating_sub(self.retention);
        for (path, _) in snapshots.into_iter().take(excess) {
            match fs::remove_file(&path) {
                Ok(()) => {
                    log::info!("deleted old backup: {}", path.display());
                    report.pruned.push(path);
                }
                Err(error) => {
                    let error = BackupError::Delete { path, error };
                    log::error!("{error}");
                    report.failed.push(error);
                }
            }
        }
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> Result<PathBuf, BackupError> {
        let target = self.dir.join(snapshot_file_name(now));
        let copy_error = |error| BackupError::Copy {
            source_path: self.source.clone(),
            target: target.clone(),
            error,
        };
        fs::copy(&self.source, &target).map_err(copy_error)?;
        // The copy keeps the source permissions, which may be read-only, so
        // the mtime is set through a read handle. Failing that, the copy's
        // own mtime still orders it after every earlier snapshot.
        if let Err(error) =
            File::open(&target).and_then(|file| file.set_modified(SystemTime::from(now)))
        {
            log::warn!(
                "could not set modification time on {}: {error}",
                target.display()
            );
        }
        Ok(target)
    }

    /// Snapshot paths with their modification time, oldest first. Equal times
    /// keep directory enumeration order.
    pub fn sorted_snapshots(&self) -> Result<Vec<(PathBuf, SystemTime)>, BackupError> {
        let enumerate_error = |error| BackupError::Enumerate {
            dir: self.dir.clone(),
            error,
        };
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(enumerate_error)? {
            let entry = entry.map_err(enumerate_error)?;
            let is_snapshot = entry
                .file_name()
                .to_str()
                .is_some_and(is_snapshot_name);
            if !is_snapshot {
                continue;
            }
            let metadata = entry.metadata().map_err(enumerate_error)?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata.modified().map_err(enumerate_error)?;
            entries.push((entry.path(), modified));
        }
        entries.sort_by_key(|(_, modified)| *modified);
        Ok(entries)
    }

    /// Snapshots newest first, for browsing.
    pub fn list(&self) -> Result<Vec<SnapshotEntry>, BackupError> {
        let mut list: Vec<_> = self
            .sorted_snapshots()?
            .into_iter()
            .filter_map(|(path, modified)| {
                let name = path.file_name()?.to_str()?.to_string();
                Some(SnapshotEntry {
                    name,
                    modified_at: system_time_millis(modified),
                })
            })
            .collect();
        list.reverse();
        Ok(list)
    }

    /// Loads the named snapshot and makes it the current document.
    pub fn restore(&self, name: &str) -> Result<Document, BackupError> {
        if !is_snapshot_name(name) {
            return Err(BackupError::InvalidName(name.to_string()));
        }
        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(BackupError::NotFound(name.to_string()));
        }
        let document: Document = load_json(&path)?;
        write_atomic(&self.source, &document)?;
        log::info!("restored backup {name} into {}", self.source.display());
        Ok(document)
    }
}

/// `taskList-2024-03-10T09-00-00-000Z.json`: sorts lexicographically in
/// chronological order.
pub fn snapshot_file_name(now: DateTime<Utc>) -> String {
    format!(
        "{SNAPSHOT_PREFIX}{}{SNAPSHOT_SUFFIX}",
        now.format("%Y-%m-%dT%H-%M-%S-%3fZ")
    )
}

pub fn is_snapshot_name(name: &str) -> bool {
    name.len() > SNAPSHOT_PREFIX.len() + SNAPSHOT_SUFFIX.len()
        && name.starts_with(SNAPSHOT_PREFIX)
        && name.ends_with(SNAPSHOT_SUFFIX)
        && !name.contains(['/', '\\'])
        && !name.contains("..")
}

fn system_time_millis(time: SystemTime) -> Timestamp {
    time.duration_since(UNIX_EPOCH)
        .map(|dur| dur.as_millis() as Timestamp)
        .unwrap_or(0)
}
