use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- Messages --

/// Both fields are optional on the wire so a missing `content` surfaces as a
/// validation error instead of a JSON rejection.
#[derive(Debug, Default, Deserialize)]
pub struct CreateMessageRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// -- Backups --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotKind {
    /// Binary SQLite copy of the store.
    Database,
    /// Human-readable JSON export.
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub filename: String,
    pub kind: SnapshotKind,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub download_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotListResponse {
    pub total: usize,
    pub backups: Vec<SnapshotEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BackupCreatedResponse {
    pub success: bool,
    pub filename: String,
    pub export_filename: Option<String>,
    pub download_url: String,
    /// Files deleted by the retention pass that followed the backup.
    pub pruned: Vec<String>,
}
