//! Snapshots of the message store and the policies around them.
//!
//! - [`engine`] writes a binary SQLite copy plus a JSON export per snapshot.
//! - [`retention`] keeps only the newest snapshots in the backup directory.
//! - [`scheduler`] runs a backup once at startup and once a day at a fixed hour.

pub mod engine;
pub mod error;
pub mod retention;
pub mod scheduler;
pub mod snapshot;

pub use engine::{BackupEngine, BackupOutcome, SnapshotInfo};
pub use error::{BackupError, Result};
pub use retention::{RetentionReport, enforce_retention};
pub use scheduler::{BackupPass, DailyGuard, ScheduleConfig, backup_pass, run_scheduler};
