//! Snapshot file naming.
//!
//! Every snapshot is a pair of files sharing a stem:
//! `messages-backup-2026-10-18_03-00-00-000.db` and the matching `.json`.
//! In-flight writes go to a dot-prefixed `.tmp` name that never parses as a
//! snapshot, so listings and retention skip them.

use chrono::{DateTime, Local};
use corkboard_types::api::SnapshotKind;

pub const SNAPSHOT_PREFIX: &str = "messages-backup-";
const STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S-%3f";

pub fn snapshot_stem(at: DateTime<Local>) -> String {
    format!("{SNAPSHOT_PREFIX}{}", at.format(STAMP_FORMAT))
}

pub fn file_name(stem: &str, kind: SnapshotKind) -> String {
    match kind {
        SnapshotKind::Database => format!("{stem}.db"),
        SnapshotKind::Json => format!("{stem}.json"),
    }
}

pub fn temp_name(final_name: &str) -> String {
    format!(".{final_name}.tmp")
}

/// Split a file name into its snapshot stem and kind. Returns `None` for
/// anything that is not a plain snapshot file name.
pub fn parse_snapshot_name(name: &str) -> Option<(&str, SnapshotKind)> {
    if name.contains(['/', '\\']) || name.contains("..") {
        return None;
    }

    let (stem, kind) = if let Some(stem) = name.strip_suffix(".db") {
        (stem, SnapshotKind::Database)
    } else if let Some(stem) = name.strip_suffix(".json") {
        (stem, SnapshotKind::Json)
    } else {
        return None;
    };

    match stem.strip_prefix(SNAPSHOT_PREFIX) {
        Some(stamp) if !stamp.is_empty() => Some((stem, kind)),
        _ => None,
    }
}
