use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Local, TimeZone, Utc};
use corkboard_db::Database;
use corkboard_types::api::SnapshotKind;
use corkboard_types::export::{ExportItem, MessageExport};
use tracing::{info, warn};

use crate::snapshot::{file_name, parse_snapshot_name, snapshot_stem, temp_name};
use crate::{BackupError, Result};

const EXPORT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Result of one backup run.
#[derive(Debug, Clone)]
pub struct BackupOutcome {
    /// Binary snapshot file name, relative to the backup directory.
    pub filename: String,
    /// JSON export file name; `None` when the export failed.
    pub export_filename: Option<String>,
}

/// Metadata of one snapshot file on disk.
#[derive(Debug, Clone)]
pub struct SnapshotInfo {
    pub filename: String,
    pub kind: SnapshotKind,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// Writes snapshots of the message store into a backup directory.
///
/// Snapshot files are written under a temp name and renamed into place, so a
/// reader of the directory only ever sees complete files.
pub struct BackupEngine {
    db: Arc<Database>,
    dir: PathBuf,
    /// Held for a whole `run_backup`; overlapping runs would race on names.
    run_lock: Mutex<()>,
}

impl BackupEngine {
    pub fn new(db: Arc<Database>, dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)?;
        info!("Backup directory: {}", dir.display());
        Ok(Self {
            db,
            dir,
            run_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Binary copy of the store via SQLite's online backup API.
    pub fn snapshot_binary(&self, stem: &str) -> Result<String> {
        let name = file_name(stem, SnapshotKind::Database);
        let tmp = self.dir.join(temp_name(&name));

        if let Err(e) = self.db.backup_to(&tmp) {
            fs::remove_file(&tmp).ok();
            return Err(e.into());
        }
        fs::rename(&tmp, self.dir.join(&name))?;

        Ok(name)
    }

    /// Point-in-time copy of the live store, for download.
    ///
    /// The copy is taken with the online backup API into a private temp file,
    /// which is unlinked once opened; later writes to the store never reach
    /// the returned handle.
    pub fn live_copy(&self) -> Result<fs::File> {
        let tmp = tempfile::Builder::new()
            .prefix(".download-")
            .suffix(".tmp")
            .tempfile_in(&self.dir)?
            .into_temp_path();

        self.db.backup_to(&tmp)?;
        let file = fs::File::open(&tmp)?;
        if let Err(e) = tmp.close() {
            warn!("Failed to remove download copy: {}", e);
        }

        Ok(file)
    }

    /// Human-readable export of every message. Only reads from the store.
    pub fn snapshot_json(&self, stem: &str) -> Result<String> {
        let messages = self.db.list_messages()?;

        let export = MessageExport {
            export_time: Local::now().format(EXPORT_TIME_FORMAT).to_string(),
            total_count: messages.len(),
            items: messages
                .into_iter()
                .map(|m| ExportItem {
                    time: local_time(m.timestamp),
                    id: m.id,
                    name: m.name,
                    content: m.content,
                    likes: m.likes,
                    liked: m.liked,
                })
                .collect(),
        };

        let name = file_name(stem, SnapshotKind::Json);
        let tmp = self.dir.join(temp_name(&name));

        let written = write_json(&tmp, &export);
        if let Err(e) = written {
            fs::remove_file(&tmp).ok();
            return Err(e);
        }
        fs::rename(&tmp, self.dir.join(&name))?;

        Ok(name)
    }

    /// Binary snapshot followed by the JSON export.
    ///
    /// The binary copy is the source of truth: if only the export fails, the
    /// run still succeeds and the binary snapshot is kept.
    pub fn run_backup(&self) -> Result<BackupOutcome> {
        let _running = self.run_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let stem = self.unused_stem(Local::now());

        let filename = self.snapshot_binary(&stem)?;
        let export_filename = match self.snapshot_json(&stem) {
            Ok(name) => Some(name),
            Err(e) => {
                warn!("JSON export for {} failed, keeping binary snapshot: {}", filename, e);
                None
            }
        };

        info!("Backup created: {}", filename);
        Ok(BackupOutcome {
            filename,
            export_filename,
        })
    }

    /// Stem for a snapshot taken at `at`, suffixed when a snapshot from the
    /// same millisecond already exists.
    fn unused_stem(&self, at: DateTime<Local>) -> String {
        let base = snapshot_stem(at);
        let mut stem = base.clone();
        let mut n = 1;
        while self.dir.join(file_name(&stem, SnapshotKind::Database)).exists() {
            stem = format!("{base}-{n}");
            n += 1;
        }
        stem
    }

    /// Every snapshot file in the backup directory, newest first.
    pub fn list_snapshots(&self) -> Result<Vec<SnapshotInfo>> {
        let mut snapshots = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Some((_, kind)) = parse_snapshot_name(&name) else {
                continue;
            };

            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }

            snapshots.push(SnapshotInfo {
                filename: name,
                kind,
                size: metadata.len(),
                modified: metadata.modified()?.into(),
            });
        }

        snapshots.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| b.filename.cmp(&a.filename))
        });
        Ok(snapshots)
    }

    /// Path of a snapshot file for download. Only plain snapshot names that
    /// exist in the backup directory resolve.
    pub fn resolve(&self, filename: &str) -> Result<PathBuf> {
        if parse_snapshot_name(filename).is_none() {
            return Err(BackupError::InvalidName(filename.to_string()));
        }

        let path = self.dir.join(filename);
        if !path.is_file() {
            return Err(BackupError::NotFound(filename.to_string()));
        }
        Ok(path)
    }
}

fn write_json(path: &Path, export: &MessageExport) -> Result<()> {
    let file = fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, export)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

fn local_time(timestamp_ms: i64) -> String {
    match Local.timestamp_millis_opt(timestamp_ms).single() {
        Some(at) => at.format(EXPORT_TIME_FORMAT).to_string(),
        None => timestamp_ms.to_string(),
    }
}
