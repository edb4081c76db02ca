//! Discovery configuration
//!
//! Settings come from defaults, then environment variables (a `.env` file is
//! honoured), then whatever the caller overrides explicitly:
//! - `FD_STRATEGY`: `naive` or `refinement`
//! - `FD_MAX_ARITY`: largest left-hand side to test
//! - `FD_WORKERS`: worker pool size for parallel runs

use crate::error::{FdError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Default left-hand size bound of the refinement strategy
pub const DEFAULT_REFINEMENT_ARITY: usize = 2;

/// How each (left-hand side, right attribute) pair is validated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// One grouped distinct-count query per pair
    Naive,
    /// Cached partitions and a refinement test
    Refinement,
}

impl Strategy {
    /// Exhaustive for naive, pairwise for refinement, capped at the universe size
    pub fn default_max_arity(self, universe_size: usize) -> usize {
        match self {
            Strategy::Naive => universe_size,
            Strategy::Refinement => DEFAULT_REFINEMENT_ARITY.min(universe_size),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Naive => f.write_str("naive"),
            Strategy::Refinement => f.write_str("refinement"),
        }
    }
}

impl FromStr for Strategy {
    type Err = FdError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "naive" => Ok(Strategy::Naive),
            "refinement" | "pruning" | "partition" => Ok(Strategy::Refinement),
            other => Err(FdError::InvalidConfig(format!("Unknown strategy '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    pub strategy: Strategy,

    /// Largest left-hand side to test; `None` uses the strategy default
    pub max_arity: Option<usize>,

    /// Worker pool size; 1 runs sequentially
    pub workers: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Refinement,
            max_arity: None,
            workers: 1,
        }
    }
}

impl DiscoveryConfig {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    /// Defaults overridden by `FD_*` environment variables
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let mut config = Self::default();

        if let Ok(strategy) = std::env::var("FD_STRATEGY") {
            config.strategy = strategy.parse()?;
        }
        if let Ok(arity) = std::env::var("FD_MAX_ARITY") {
            config.max_arity = Some(parse_count("FD_MAX_ARITY", &arity)?);
        }
        if let Ok(workers) = std::env::var("FD_WORKERS") {
            config.workers = parse_count("FD_WORKERS", &workers)?;
        }

        debug!("Configuration from environment: {:?}", config);
        Ok(config)
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_max_arity(mut self, max_arity: usize) -> Self {
        self.max_arity = Some(max_arity);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Effective arity bound for a universe of `universe_size` attributes.
    ///
    /// Fails when the universe is empty or the bound is outside `[1, n]`.
    pub fn resolve_max_arity(&self, universe_size: usize) -> Result<usize> {
        if universe_size == 0 {
            return Err(FdError::InvalidConfig(
                "The attribute universe is empty".to_string(),
            ));
        }
        let arity = self
            .max_arity
            .unwrap_or_else(|| self.strategy.default_max_arity(universe_size));
        if arity == 0 || arity > universe_size {
            return Err(FdError::InvalidConfig(format!(
                "Maximum arity {} is outside [1, {}]",
                arity, universe_size
            )));
        }
        Ok(arity)
    }

    pub fn validate(&self, universe_size: usize) -> Result<()> {
        if self.workers == 0 {
            return Err(FdError::InvalidConfig(
                "Worker count must be at least 1".to_string(),
            ));
        }
        self.resolve_max_arity(universe_size).map(|_| ())
    }
}

fn parse_count(key: &str, raw: &str) -> Result<usize> {
    raw.trim()
        .parse::<usize>()
        .map_err(|e| FdError::InvalidConfig(format!("{}='{}' is not a count: {}", key, raw, e)))
}
