//! Runtime settings read from the environment.
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `TRIAGE_WORKERS` | conversations simulated at once | available parallelism |
//! | `TRIAGE_CACHE_CAPACITY` | reports kept in the cache | 256 |
//! | `TRIAGE_CACHE_TTL` | report lifetime, e.g. `10m` | 1h |

use std::str::FromStr;
use std::thread;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::RuntimeError;

pub const WORKERS_VAR: &str = "TRIAGE_WORKERS";
pub const CACHE_CAPACITY_VAR: &str = "TRIAGE_CACHE_CAPACITY";
pub const CACHE_TTL_VAR: &str = "TRIAGE_CACHE_TTL";

const DEFAULT_CACHE_CAPACITY: u64 = 256;
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Upper bound on concurrently simulated conversations
    pub workers: usize,

    /// Maximum number of cached reports
    pub cache_capacity: u64,

    /// How long a cached report stays valid
    pub cache_ttl: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl RuntimeConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, RuntimeError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`; unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RuntimeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(WORKERS_VAR) {
            config.workers = parse_number(WORKERS_VAR, &raw)?;
        }
        if let Some(raw) = lookup(CACHE_CAPACITY_VAR) {
            config.cache_capacity = parse_number(CACHE_CAPACITY_VAR, &raw)?;
        }
        if let Some(raw) = lookup(CACHE_TTL_VAR) {
            config.cache_ttl = humantime::parse_duration(raw.trim()).map_err(|e| {
                RuntimeError::Config(format!("{} must be a duration like '10m': {}", CACHE_TTL_VAR, e))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.workers == 0 {
            return Err(RuntimeError::Config(format!("{} must be at least 1", WORKERS_VAR)));
        }
        if self.workers > Semaphore::MAX_PERMITS {
            return Err(RuntimeError::Config(format!(
                "{} must be at most {}",
                WORKERS_VAR,
                Semaphore::MAX_PERMITS
            )));
        }
        Ok(())
    }

    /// Settings with a fixed worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn parse_number<T: FromStr>(name: &str, raw: &str) -> Result<T, RuntimeError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| RuntimeError::Config(format!("{} must be a number: {}", name, e)))
}
