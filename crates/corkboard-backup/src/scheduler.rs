use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::Result;
use crate::engine::{BackupEngine, BackupOutcome};
use crate::retention::{DEFAULT_MAX_SNAPSHOTS, RetentionReport, enforce_retention};

#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Local hour (0-23) at which the daily backup runs.
    pub backup_hour: u32,
    /// Snapshots kept after each pass.
    pub retention: usize,
    /// How often the wall clock is checked.
    pub check_interval: Duration,
    /// Grace period before the startup backup.
    pub startup_delay: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            backup_hour: 3,
            retention: DEFAULT_MAX_SNAPSHOTS,
            check_interval: Duration::from_secs(5 * 60),
            startup_delay: Duration::from_secs(5),
        }
    }
}

/// Remembers the last day a scheduled backup ran, so a clock check that
/// fires many times inside the backup hour only triggers once.
#[derive(Debug, Default)]
pub struct DailyGuard {
    last_run: Option<NaiveDate>,
}

impl DailyGuard {
    pub fn is_due(&self, now: NaiveDateTime, backup_hour: u32) -> bool {
        now.hour() == backup_hour && self.last_run != Some(now.date())
    }

    pub fn mark(&mut self, date: NaiveDate) {
        self.last_run = Some(date);
    }

    pub fn last_run(&self) -> Option<NaiveDate> {
        self.last_run
    }
}

/// One backup followed by a retention sweep.
#[derive(Debug)]
pub struct BackupPass {
    pub outcome: BackupOutcome,
    pub retention: RetentionReport,
}

/// Run a backup and a retention sweep off the async runtime.
pub async fn backup_pass(engine: Arc<BackupEngine>, retention: usize) -> Result<BackupPass> {
    tokio::task::spawn_blocking(move || {
        let outcome = engine.run_backup()?;
        let retention = enforce_retention(engine.dir(), retention)?;
        Ok(BackupPass { outcome, retention })
    })
    .await?
}

/// Background task: one pass shortly after startup, then one pass per day at
/// `backup_hour`. Errors are logged and never end the loop; only `shutdown`
/// does. A pass already running when shutdown fires is allowed to finish.
pub async fn run_scheduler(
    engine: Arc<BackupEngine>,
    config: ScheduleConfig,
    shutdown: CancellationToken,
) {
    info!(
        "Backup scheduler: daily at {:02}:00, keeping {} snapshots, checking every {}s",
        config.backup_hour,
        config.retention,
        config.check_interval.as_secs()
    );

    tokio::select! {
        _ = shutdown.cancelled() => {
            info!("Backup scheduler stopped before startup backup");
            return;
        }
        _ = tokio::time::sleep(config.startup_delay) => {}
    }

    let mut guard = DailyGuard::default();

    let started = Local::now().naive_local();
    if run_logged(&engine, config.retention, "startup").await
        && started.hour() == config.backup_hour
    {
        guard.mark(started.date());
    }

    let mut interval = tokio::time::interval(config.check_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {}
        }

        let now = Local::now().naive_local();
        if guard.is_due(now, config.backup_hour)
            && run_logged(&engine, config.retention, "scheduled").await
        {
            guard.mark(now.date());
        }
    }

    info!("Backup scheduler stopped");
}

/// Returns true when the pass succeeded. A failed scheduled pass leaves the
/// guard unset, so the next check inside the same hour retries.
async fn run_logged(engine: &Arc<BackupEngine>, retention: usize, trigger: &str) -> bool {
    match backup_pass(engine.clone(), retention).await {
        Ok(pass) => {
            info!(
                "{} backup: {} ({} old files pruned)",
                trigger,
                pass.outcome.filename,
                pass.retention.removed.len()
            );
            true
        }
        Err(e) => {
            warn!("{} backup failed: {}", trigger, e);
            false
        }
    }
}
