use std::sync::Arc;

use corkboard_backup::BackupEngine;
use corkboard_db::Database;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub backups: Arc<BackupEngine>,
    /// Snapshots kept after an on-demand backup.
    pub retention: usize,
}
