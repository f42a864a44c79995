use std::path::Path as FsPath;

use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::header,
    response::Response,
};
use axum_extra::extract::WithRejection;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::info;

use corkboard_backup::backup_pass;
use corkboard_backup::snapshot::parse_snapshot_name;
use corkboard_types::api::{
    BackupCreatedResponse, SnapshotEntry, SnapshotKind, SnapshotListResponse,
};

use crate::{ApiError, AppState, run_blocking};

const SQLITE_CONTENT_TYPE: &str = "application/vnd.sqlite3";

fn download_url(filename: &str) -> String {
    format!("/download/backup/{filename}")
}

/// GET /download/db — a point-in-time copy of the store, taken with the
/// online backup API so writes during the download cannot tear it.
pub async fn download_db(State(state): State<AppState>) -> Result<Response, ApiError> {
    let path = state.db.path();
    if !path.is_file() {
        return Err(ApiError::Missing("database file".into()));
    }
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("messages.db")
        .to_string();

    let engine = state.backups.clone();
    let copy = run_blocking(move || Ok(engine.live_copy()?)).await?;

    file_response(File::from_std(copy), &filename, SQLITE_CONTENT_TYPE).await
}

/// GET /download/backups
pub async fn list_backups(
    State(state): State<AppState>,
) -> Result<Json<SnapshotListResponse>, ApiError> {
    let engine = state.backups.clone();
    let snapshots = run_blocking(move || Ok(engine.list_snapshots()?)).await?;

    let backups: Vec<SnapshotEntry> = snapshots
        .into_iter()
        .map(|s| SnapshotEntry {
            download_url: download_url(&s.filename),
            filename: s.filename,
            kind: s.kind,
            size: s.size,
            modified: s.modified,
        })
        .collect();

    Ok(Json(SnapshotListResponse {
        total: backups.len(),
        backups,
    }))
}

/// GET /download/backup/{filename}
pub async fn download_backup(
    State(state): State<AppState>,
    WithRejection(Path(filename), _): WithRejection<Path<String>, ApiError>,
) -> Result<Response, ApiError> {
    let path = state.backups.resolve(&filename)?;
    let content_type = match parse_snapshot_name(&filename) {
        Some((_, SnapshotKind::Json)) => "application/json",
        _ => SQLITE_CONTENT_TYPE,
    };
    let file = open_snapshot(&path, &filename).await?;
    file_response(file, &filename, content_type).await
}

/// POST /download/create-backup — on-demand backup plus retention sweep.
pub async fn create_backup(
    State(state): State<AppState>,
) -> Result<Json<BackupCreatedResponse>, ApiError> {
    let pass = backup_pass(state.backups.clone(), state.retention).await?;
    info!("On-demand backup created: {}", pass.outcome.filename);

    Ok(Json(BackupCreatedResponse {
        success: true,
        download_url: download_url(&pass.outcome.filename),
        filename: pass.outcome.filename,
        export_filename: pass.outcome.export_filename,
        pruned: pass.retention.removed,
    }))
}

async fn open_snapshot(path: &FsPath, filename: &str) -> Result<File, ApiError> {
    match File::open(path).await {
        Ok(f) => Ok(f),
        // Pruned between resolve and open
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ApiError::Missing(filename.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

async fn file_response(
    file: File,
    filename: &str,
    content_type: &str,
) -> Result<Response, ApiError> {
    let len = file.metadata().await?.len();

    let response = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, len)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from_stream(ReaderStream::new(file)))?;
    Ok(response)
}
