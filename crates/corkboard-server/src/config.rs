use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use corkboard_backup::ScheduleConfig;

/// Server configuration, read from `CORKBOARD_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub backup_dir: PathBuf,
    pub static_dir: PathBuf,
    pub schedule: ScheduleConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Unset keys take their defaults;
    /// set but malformed values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // PORT is honoured for hosts that hand out a port that way
        let port = lookup("CORKBOARD_PORT")
            .or_else(|| lookup("PORT"))
            .unwrap_or_else(|| "3000".into());
        let port: u16 = port.parse().with_context(|| format!("invalid port '{port}'"))?;

        let backup_hour: u32 = parse(&get("CORKBOARD_BACKUP_HOUR", "3"), "CORKBOARD_BACKUP_HOUR")?;
        if backup_hour > 23 {
            bail!("CORKBOARD_BACKUP_HOUR must be between 0 and 23, got {backup_hour}");
        }

        let retention: usize = parse(
            &get("CORKBOARD_BACKUP_RETENTION", "10"),
            "CORKBOARD_BACKUP_RETENTION",
        )?;
        if retention == 0 {
            bail!("CORKBOARD_BACKUP_RETENTION must be at least 1");
        }

        let check_secs: u64 = parse(
            &get("CORKBOARD_BACKUP_CHECK_SECS", "300"),
            "CORKBOARD_BACKUP_CHECK_SECS",
        )?;
        if check_secs == 0 {
            bail!("CORKBOARD_BACKUP_CHECK_SECS must be at least 1");
        }

        let startup_delay_secs: u64 = parse(
            &get("CORKBOARD_BACKUP_STARTUP_DELAY_SECS", "5"),
            "CORKBOARD_BACKUP_STARTUP_DELAY_SECS",
        )?;

        Ok(Self {
            host: get("CORKBOARD_HOST", "0.0.0.0"),
            port,
            db_path: get("CORKBOARD_DB_PATH", "messages.db").into(),
            backup_dir: get("CORKBOARD_BACKUP_DIR", "backups").into(),
            static_dir: get("CORKBOARD_STATIC_DIR", "public").into(),
            schedule: ScheduleConfig {
                backup_hour,
                retention,
                check_interval: Duration::from_secs(check_secs),
                startup_delay: Duration::from_secs(startup_delay_secs),
            },
        })
    }
}

fn parse<T>(value: &str, key: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("invalid value for {key}: '{value}'"))
}
