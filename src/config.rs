use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::NaiveTime;
use chrono_tz::Tz;
use clap::Parser;
use thiserror::Error;

use crate::backup::DEFAULT_RETENTION;
use crate::scheduler::DailySchedule;

pub const DEFAULT_BACKUP_TIME: &str = "04:00";
pub const DEFAULT_TIME_ZONE: &str = "America/New_York";

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Listening host
    #[arg(long, env = "DAYBOARD_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Listening port
    #[arg(short, long, env = "DAYBOARD_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Task document file
    #[arg(long, env = "DAYBOARD_DATA_FILE", default_value = "./taskList.json")]
    pub data_file: PathBuf,

    /// Directory holding the daily snapshots
    #[arg(long, env = "DAYBOARD_BACKUP_DIR", default_value = "./backups")]
    pub backup_dir: PathBuf,

    /// Number of snapshots to keep
    #[arg(long, env = "DAYBOARD_MAX_BACKUPS", default_value_t = DEFAULT_RETENTION)]
    pub max_backups: usize,

    /// Daily backup time, HH:MM
    #[arg(long, env = "DAYBOARD_BACKUP_TIME", default_value = DEFAULT_BACKUP_TIME)]
    pub backup_time: String,

    /// IANA time zone for the backup time
    #[arg(long, env = "DAYBOARD_TIME_ZONE", default_value = DEFAULT_TIME_ZONE)]
    pub time_zone: String,

    /// Directory of static UI files
    #[arg(long, env = "DAYBOARD_PUBLIC_DIR", default_value = "./public")]
    pub public_dir: PathBuf,

    /// Directory for log files
    #[arg(long, env = "DAYBOARD_LOG_DIR", default_value = "./logs")]
    pub log_dir: PathBuf,

    /// Create a starter document when the data file does not exist
    #[arg(long, env = "DAYBOARD_INIT")]
    pub init: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid listen address `{0}`")]
    Address(String),
    #[error("invalid backup time `{0}`, expected HH:MM")]
    BackupTime(String),
    #[error("unknown time zone `{0}`")]
    TimeZone(String),
    #[error("max backups must be at least 1")]
    Retention,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub data_file: PathBuf,
    pub backup_dir: PathBuf,
    pub max_backups: usize,
    pub schedule: DailySchedule,
    pub public_dir: PathBuf,
    pub log_dir: PathBuf,
    pub init: bool,
}

impl TryFrom<Args> for Config {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let addr_text = format!("{}:{}", args.host, args.port);
        let addr = addr_text
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::Address(addr_text.clone()))?;
        if args.max_backups == 0 {
            return Err(ConfigError::Retention);
        }
        Ok(Config {
            addr,
            data_file: args.data_file,
            backup_dir: args.backup_dir,
            max_backups: args.max_backups,
            schedule: parse_schedule(&args.backup_time, &args.time_zone)?,
            public_dir: args.public_dir,
            log_dir: args.log_dir,
            init: args.init,
        })
    }
}

pub fn parse_schedule(at: &str, tz: &str) -> Result<DailySchedule, ConfigError> {
    let at = at.trim();
    let time = NaiveTime::parse_from_str(at, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(at, "%H:%M:%S"))
        .map_err(|_| ConfigError::BackupTime(at.to_string()))?;
    let zone = tz
        .trim()
        .parse::<Tz>()
        .map_err(|_| ConfigError::TimeZone(tz.to_string()))?;
    Ok(DailySchedule::new(time, zone))
}
