// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Time-stamped snapshots of tracked configuration files.
//!
//! Snapshots live in a single directory as `<base>.<YYYYMMDDHHMMSS>.bak`, where
//! `<base>` is the tracked file's name and the timestamp is local time. The
//! fixed-width timestamp sorts lexicographically in time order. Listings
//! convert the embedded local time to UTC.
//!
//! After every snapshot the store prunes the oldest snapshots of the same base
//! name so that at most `max_backups` remain. Pruning failures are logged and
//! never fail the snapshot.
//!
//! # Example
//!
//! ```rust,no_run
//! use bindconf::backup::BackupStore;
//! use std::path::Path;
//!
//! let store = BackupStore::new("/var/lib/bindconf/backup", 10);
//! let record = store.snapshot(Path::new("/etc/bind/named.conf")).unwrap();
//! println!("saved {} ({} bytes)", record.id, record.size);
//! ```

use crate::constants::{
    BACKUP_DIR_MODE, BACKUP_EXTENSION, BACKUP_TIMESTAMP_FORMAT, CONFIG_FILE_MODE,
    DEFAULT_BACKUP_DIR, DEFAULT_MAX_BACKUPS, MAX_SNAPSHOT_COLLISION_STEPS,
};
use crate::errors::BackupError;
use crate::metrics;
use chrono::{DateTime, Local, NaiveDateTime, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One snapshot in the backup directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// Snapshot filename, used as the identifier in the HTTP API
    pub id: String,
    /// Absolute or store-relative path of the snapshot file
    pub path: PathBuf,
    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,
    /// Snapshot size in bytes
    pub size: u64,
}

/// Snapshot store with bounded retention per tracked filename.
#[derive(Debug, Clone)]
pub struct BackupStore {
    dir: PathBuf,
    max_backups: usize,
}

impl BackupStore {
    /// Create a store rooted at `dir`, keeping at most `max_backups` snapshots
    /// per tracked file.
    ///
    /// An empty `dir` falls back to `./backup` and a zero `max_backups` to 10.
    /// The directory is created if missing; failure to create it is logged and
    /// surfaces as a concrete error on first use.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, max_backups: usize) -> Self {
        let dir = dir.into();
        let dir = if dir.as_os_str().is_empty() {
            PathBuf::from(DEFAULT_BACKUP_DIR)
        } else {
            dir
        };
        let max_backups = if max_backups == 0 {
            DEFAULT_MAX_BACKUPS
        } else {
            max_backups
        };

        if let Err(e) = create_backup_dir(&dir) {
            warn!(dir = %dir.display(), error = %e, "Failed to create backup directory");
        }

        Self { dir, max_backups }
    }

    /// Directory holding the snapshots.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of snapshots kept per tracked file.
    #[must_use]
    pub fn max_backups(&self) -> usize {
        self.max_backups
    }

    /// Copy `path` into the backup directory and prune old snapshots.
    ///
    /// The source's permission bits are preserved. The snapshot is stamped with
    /// the current second, advanced as needed so it sorts newest.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::SourceMissing`] if `path` does not exist and
    /// [`BackupError::Io`] if it cannot be copied or no free name is left.
    pub fn snapshot(&self, path: &Path) -> Result<BackupRecord, BackupError> {
        let result = self.snapshot_inner(path);
        metrics::record_backup_operation("snapshot", result.is_ok());
        let record = result?;

        info!(
            source = %path.display(),
            backup = %record.path.display(),
            size = record.size,
            "Configuration snapshot taken"
        );

        self.prune(&record_base(path));
        Ok(record)
    }

    fn snapshot_inner(&self, path: &Path) -> Result<BackupRecord, BackupError> {
        match fs::metadata(path) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(BackupError::Io {
                    path: path.to_path_buf(),
                    reason: "not a regular file".to_string(),
                })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(BackupError::SourceMissing {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => return Err(io_error(path, &e)),
        }

        let base = record_base(path);
        let (stamp, target) = self.next_slot(&base)?;

        fs::copy(path, &target).map_err(|e| io_error(&target, &e))?;
        let size = fs::metadata(&target)
            .map_err(|e| io_error(&target, &e))?
            .len();

        Ok(BackupRecord {
            id: file_name(&target),
            path: target,
            timestamp: stamp.with_timezone(&Utc),
            size,
        })
    }

    /// Snapshots of `original`, newest first.
    ///
    /// Entries whose embedded timestamp does not parse are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::Io`] if the backup directory cannot be read.
    pub fn list(&self, original: &Path) -> Result<Vec<BackupRecord>, BackupError> {
        self.list_base(&record_base(original))
    }

    fn list_base(&self, base: &str) -> Result<Vec<BackupRecord>, BackupError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| io_error(&self.dir, &e))?;
        let mut records = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| io_error(&self.dir, &e))?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Some(timestamp) = parse_backup_name(base, &name) else {
                continue;
            };
            let size = match entry.metadata() {
                Ok(meta) => meta.len(),
                Err(e) => {
                    debug!(backup = %name, error = %e, "Skipping unreadable backup entry");
                    continue;
                }
            };
            records.push(BackupRecord {
                id: name,
                path: entry.path(),
                timestamp,
                size,
            });
        }

        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    /// Copy `backup` over `target` atomically with mode `0644`.
    ///
    /// The current `target` is snapshotted first, after `backup` has been read,
    /// so retention can never prune the snapshot being restored before it is
    /// used. Returns that pre-restore snapshot, or `None` if `target` did not
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::BackupMissing`] if `backup` does not exist and
    /// [`BackupError::Io`] if it cannot be read or `target` cannot be written.
    pub fn restore(
        &self,
        backup: &Path,
        target: &Path,
    ) -> Result<Option<BackupRecord>, BackupError> {
        let result = self.restore_inner(backup, target);
        metrics::record_backup_operation("restore", result.is_ok());
        let previous = result?;

        info!(
            backup = %backup.display(),
            target = %target.display(),
            "Configuration restored from snapshot"
        );
        Ok(previous)
    }

    fn restore_inner(
        &self,
        backup: &Path,
        target: &Path,
    ) -> Result<Option<BackupRecord>, BackupError> {
        let contents = read_backup(backup)?;
        let previous = match self.snapshot(target) {
            Ok(record) => Some(record),
            Err(BackupError::SourceMissing { .. }) => {
                warn!(
                    target = %target.display(),
                    "Restoring over a missing file, no snapshot taken"
                );
                None
            }
            Err(e) => return Err(e),
        };
        write_atomic(target, &contents, CONFIG_FILE_MODE).map_err(|e| io_error(target, &e))?;
        Ok(previous)
    }

    /// Remove the snapshot at `backup`.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::BackupMissing`] if it does not exist and
    /// [`BackupError::Io`] if it cannot be removed.
    pub fn delete(&self, backup: &Path) -> Result<(), BackupError> {
        let result = match fs::remove_file(backup) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(BackupError::BackupMissing {
                path: backup.to_path_buf(),
            }),
            Err(e) => Err(io_error(backup, &e)),
        };
        metrics::record_backup_operation("delete", result.is_ok());
        result?;

        info!(backup = %backup.display(), "Snapshot deleted");
        Ok(())
    }

    /// Path of the snapshot named `id` inside the backup directory.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::InvalidBackupId`] unless `id` is a bare `.bak`
    /// filename.
    pub fn resolve(&self, id: &str) -> Result<PathBuf, BackupError> {
        let plain = !id.is_empty()
            && !id.starts_with('.')
            && !id.contains(['/', '\\'])
            && id.ends_with(&format!(".{BACKUP_EXTENSION}"));
        if !plain {
            return Err(BackupError::InvalidBackupId { id: id.to_string() });
        }
        Ok(self.dir.join(id))
    }

    /// Path of the snapshot of `original` named `id`.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::InvalidBackupId`] unless `id` is a bare
    /// `<base>.<YYYYMMDDHHMMSS>.bak` name for `original`.
    pub fn resolve_for(&self, original: &Path, id: &str) -> Result<PathBuf, BackupError> {
        let path = self.resolve(id)?;
        if parse_backup_name(&record_base(original), id).is_none() {
            return Err(BackupError::InvalidBackupId { id: id.to_string() });
        }
        Ok(path)
    }

    /// Delete the oldest snapshots of `base` beyond `max_backups`.
    fn prune(&self, base: &str) {
        let records = match self.list_base(base) {
            Ok(records) => records,
            Err(e) => {
                warn!(base = %base, error = %e, "Failed to list backups for retention");
                metrics::record_backup_operation("prune", false);
                return;
            }
        };

        if records.len() <= self.max_backups {
            return;
        }

        for record in &records[self.max_backups..] {
            match fs::remove_file(&record.path) {
                Ok(()) => {
                    debug!(backup = %record.path.display(), "Pruned old snapshot");
                    metrics::record_backup_operation("prune", true);
                }
                Err(e) => {
                    warn!(
                        backup = %record.path.display(),
                        error = %e,
                        "Failed to prune old snapshot"
                    );
                    metrics::record_backup_operation("prune", false);
                }
            }
        }
    }

    /// Free snapshot name for `base` that sorts after every existing snapshot.
    ///
    /// Starts at the current second, or one second past the newest snapshot if
    /// that is later, so a fresh snapshot is never the one retention prunes.
    fn next_slot(&self, base: &str) -> Result<(DateTime<Local>, PathBuf), BackupError> {
        let mut stamp = Local::now().trunc_subsecs(0);
        if let Some(newest) = self.list_base(base)?.first() {
            let after_newest =
                newest.timestamp.with_timezone(&Local) + chrono::Duration::seconds(1);
            if after_newest > stamp {
                stamp = after_newest;
            }
        }

        for _ in 0..MAX_SNAPSHOT_COLLISION_STEPS {
            let target = self.backup_path(base, &stamp);
            if !target.exists() {
                return Ok((stamp, target));
            }
            stamp += chrono::Duration::seconds(1);
        }

        Err(BackupError::Io {
            path: self.dir.clone(),
            reason: format!("no free snapshot slot for {base}"),
        })
    }

    fn backup_path(&self, base: &str, stamp: &DateTime<Local>) -> PathBuf {
        self.dir.join(format!(
            "{base}.{}.{BACKUP_EXTENSION}",
            stamp.format(BACKUP_TIMESTAMP_FORMAT)
        ))
    }
}

/// Timestamp embedded in a snapshot name of `base`, converted to UTC.
fn parse_backup_name(base: &str, name: &str) -> Option<DateTime<Utc>> {
    let stamp = name
        .strip_prefix(base)?
        .strip_prefix('.')?
        .strip_suffix(BACKUP_EXTENSION)?
        .strip_suffix('.')?;
    if stamp.len() != 14 || !stamp.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let naive = NaiveDateTime::parse_from_str(stamp, BACKUP_TIMESTAMP_FORMAT).ok()?;
    let local = Local.from_local_datetime(&naive).earliest()?;
    Some(local.with_timezone(&Utc))
}

fn read_backup(backup: &Path) -> Result<Vec<u8>, BackupError> {
    fs::read(backup).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            BackupError::BackupMissing {
                path: backup.to_path_buf(),
            }
        } else {
            io_error(backup, &e)
        }
    })
}

/// Replace `target` with `contents` via a temporary file in the same directory.
pub(crate) fn write_atomic(target: &Path, contents: &[u8], mode: u32) -> io::Result<()> {
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file()
            .set_permissions(fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;
    temp.as_file().sync_all()?;
    temp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

fn create_backup_dir(dir: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(BACKUP_DIR_MODE);
    }
    builder.create(dir)
}

fn record_base(path: &Path) -> String {
    file_name(path)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn io_error(path: &Path, err: &io::Error) -> BackupError {
    BackupError::Io {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}
