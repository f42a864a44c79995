use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, info, warn};

use crate::Result;
use crate::snapshot::parse_snapshot_name;

/// Snapshot count kept when no other limit is configured.
pub const DEFAULT_MAX_SNAPSHOTS: usize = 10;

#[derive(Debug, Default)]
pub struct RetentionReport {
    /// Snapshots left in place.
    pub kept: usize,
    /// File names deleted.
    pub removed: Vec<String>,
    /// File names that were due for deletion but could not be removed.
    pub failed: Vec<String>,
}

struct SnapshotGroup {
    stem: String,
    files: Vec<(String, PathBuf)>,
    newest: SystemTime,
}

/// Keep the `max_count` newest snapshots in `dir` and delete the rest.
///
/// Files are grouped by snapshot stem, so a binary copy and its JSON export
/// are kept or dropped together. A snapshot's age is the newest modification
/// time among its files. Anything not named like a snapshot is left alone.
pub fn enforce_retention(dir: &Path, max_count: usize) -> Result<RetentionReport> {
    // Single listing up front; snapshots created while we delete are not seen.
    let mut groups: HashMap<String, SnapshotGroup> = HashMap::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        let Some((stem, _)) = parse_snapshot_name(&name) else {
            continue;
        };

        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(e) => {
                debug!("Skipping {} during retention: {}", name, e);
                continue;
            }
        };

        let group = groups.entry(stem.to_string()).or_insert_with(|| SnapshotGroup {
            stem: stem.to_string(),
            files: Vec::new(),
            newest: modified,
        });
        group.newest = group.newest.max(modified);
        group.files.push((name, entry.path()));
    }

    let mut snapshots: Vec<SnapshotGroup> = groups.into_values().collect();
    snapshots.sort_by(|a, b| b.newest.cmp(&a.newest).then_with(|| b.stem.cmp(&a.stem)));

    let mut report = RetentionReport {
        kept: snapshots.len().min(max_count),
        ..Default::default()
    };

    for group in snapshots.into_iter().skip(max_count) {
        for (name, path) in group.files {
            match fs::remove_file(&path) {
                Ok(()) => report.removed.push(name),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("Snapshot file {} already gone", name);
                }
                Err(e) => {
                    warn!("Failed to delete old snapshot {}: {}", name, e);
                    report.failed.push(name);
                }
            }
        }
    }

    if !report.removed.is_empty() {
        info!(
            "Retention: kept {} snapshots, deleted {} files",
            report.kept,
            report.removed.len()
        );
    }
    Ok(report)
}
