use std::env;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::thread;

use crate::error::{Result, SortError};

/// Partitions shorter than this are sorted directly instead of being divided further.
pub const DEFAULT_GRANULARITY: usize = 256;

/// Smallest granularity the task graph engine accepts.
pub const MIN_GRANULARITY: usize = 256;

pub const GRANULARITY_ENV: &str = "MERGE_COMP_GRANULARITY";
pub const WORKERS_ENV: &str = "MERGE_COMP_WORKERS";

/// Settings used to build the default engines and the shared worker pool.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub granularity: usize,
    pub workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            granularity: DEFAULT_GRANULARITY,
            workers: default_workers(),
        }
    }
}

impl EngineConfig {
    /// Defaults, overridden by `MERGE_COMP_GRANULARITY` and `MERGE_COMP_WORKERS` when set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`EngineConfig::from_env`], falling back to the defaults on malformed values.
    pub fn from_env_or_default() -> Self {
        Self::from_env().unwrap_or_else(|err| {
            log::warn!("ignoring environment configuration: {err}");
            EngineConfig::default()
        })
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = EngineConfig::default();

        if let Some(granularity) = lookup(GRANULARITY_ENV) {
            config.granularity = parse_positive(GRANULARITY_ENV, &granularity)?;
        }

        if let Some(workers) = lookup(WORKERS_ENV) {
            config.workers = parse_positive(WORKERS_ENV, &workers)?;
        }

        Ok(config)
    }
}

fn parse_positive(name: &str, raw: &str) -> Result<usize> {
    match usize::from_str(raw.trim()) {
        Ok(0) => Err(SortError::invalid_config(name, "must be positive")),
        Ok(val) => Ok(val),
        Err(err) => Err(SortError::invalid_config(
            name,
            format!("cannot parse {raw:?}: {err}"),
        )),
    }
}

fn default_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Number of nested join levels a sort of `len` elements produces at `granularity`.
///
/// Follows the larger half on every level, which is the deepest path through the tree.
pub fn join_depth(len: usize, granularity: usize) -> usize {
    let mut len = len;
    let mut depth = 0;
    while len >= granularity.max(2) {
        len -= len / 2;
        depth += 1;
    }
    depth
}
