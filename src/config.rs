use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PURGE_INTERVAL_SECS: u64 = 60 * 60;
const DEFAULT_RETENTION_SECS: u64 = 30 * 24 * 60 * 60;

/// Runtime settings. Every option can also come from the environment.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct Settings {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "PAYMENT_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Seconds between two runs of the transaction purge.
    #[arg(
        long,
        env = "PAYMENT_PURGE_INTERVAL_SECS",
        default_value_t = DEFAULT_PURGE_INTERVAL_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub purge_interval_secs: u64,

    /// Transactions older than this many seconds are purged.
    #[arg(long, env = "PAYMENT_RETENTION_SECS", default_value_t = DEFAULT_RETENTION_SECS)]
    pub retention_secs: u64,
}

impl Settings {
    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: None,
            purge_interval_secs: DEFAULT_PURGE_INTERVAL_SECS,
            retention_secs: DEFAULT_RETENTION_SECS,
        }
    }
}
