use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

#[derive(Clone, Debug)]
pub struct Config {
    pub db_path: PathBuf,
    /// Upper bound on pooled connections, shared by readers and the writer.
    pub pool_size: u32,
    /// How long a statement waits on SQLite's lock before `LockTimeout`.
    pub busy_timeout: Duration,
    /// Past trial events a non-member may attend before being prompted to join.
    pub max_trial_events: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("mountains.db"),
            pool_size: 8,
            busy_timeout: Duration::from_millis(5_000),
            max_trial_events: 3,
        }
    }
}

impl Config {
    /// Defaults overridden by any `MOUNTAINS_*` variables present in the
    /// process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        if let Some(path) = lookup("MOUNTAINS_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(size) = parse(&lookup, "MOUNTAINS_POOL_SIZE")? {
            if size == 0 {
                return Err(Error::Validation(
                    "MOUNTAINS_POOL_SIZE must be at least 1".to_owned(),
                ));
            }
            config.pool_size = size;
        }
        if let Some(ms) = parse::<u64, _>(&lookup, "MOUNTAINS_BUSY_TIMEOUT_MS")? {
            config.busy_timeout = Duration::from_millis(ms);
        }
        if let Some(max) = parse(&lookup, "MOUNTAINS_MAX_TRIAL_EVENTS")? {
            config.max_trial_events = max;
        }
        Ok(config)
    }
}

fn parse<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Validation(format!("{key} has an invalid value: {raw:?}"))),
    }
}
