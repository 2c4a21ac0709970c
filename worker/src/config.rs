use std::{env, num::NonZeroUsize, path::PathBuf, str::FromStr};

use crate::{BenchErr, Result, report::DEFAULT_LOG};

pub const ITERATIONS_VAR: &str = "GEMV_ITERATIONS";
pub const SIZE_VAR: &str = "GEMV_SIZE";
pub const SEED_VAR: &str = "GEMV_SEED";
pub const LOG_VAR: &str = "GEMV_LOG";
pub const LOG_MODE_VAR: &str = "GEMV_LOG_MODE";

const DEFAULT_ITERATIONS: NonZeroUsize = NonZeroUsize::new(100_000).unwrap();
const DEFAULT_SIZE: NonZeroUsize = NonZeroUsize::new(512).unwrap();

/// How the report lines of every rank reach the shared log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogMode {
    /// Rank 0 collects every line and appends them in rank order.
    #[default]
    Gather,
    /// Every rank appends its own line.
    Append,
}

impl FromStr for LogMode {
    type Err = BenchErr;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gather" => Ok(Self::Gather),
            "append" => Ok(Self::Append),
            other => Err(BenchErr::Config(format!(
                "{LOG_MODE_VAR} must be gather or append, got {other:?}"
            ))),
        }
    }
}

/// Immutable parameters of a benchmark run.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub iterations: NonZeroUsize,
    pub size: NonZeroUsize,
    pub alpha: f32,
    pub beta: f32,
    /// Base seed, each rank adds its own rank to it. `None` draws from the OS.
    pub seed: Option<u64>,
    pub log_path: PathBuf,
    pub log_mode: LogMode,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            size: DEFAULT_SIZE,
            alpha: 3.0,
            beta: -1.0,
            seed: None,
            log_path: PathBuf::from(DEFAULT_LOG),
            log_mode: LogMode::default(),
        }
    }
}

impl BenchConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, unset variables keep their defaults.
    ///
    /// # Arguments
    /// * `lookup` - Returns the value of a variable, if set.
    ///
    /// # Returns
    /// The configuration or a `Config` error naming the offending variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ITERATIONS_VAR) {
            config.iterations = parse_var(ITERATIONS_VAR, &value)?;
        }

        if let Some(value) = lookup(SIZE_VAR) {
            config.size = parse_var(SIZE_VAR, &value)?;
        }

        if let Some(value) = lookup(SEED_VAR) {
            config.seed = Some(parse_var(SEED_VAR, &value)?);
        }

        if let Some(value) = lookup(LOG_VAR) {
            if value.is_empty() {
                return Err(BenchErr::Config(format!("{LOG_VAR} can't be empty")));
            }
            config.log_path = PathBuf::from(value);
        }

        if let Some(value) = lookup(LOG_MODE_VAR) {
            config.log_mode = value.parse()?;
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| BenchErr::Config(format!("{key} has an invalid value {value:?}")))
}
