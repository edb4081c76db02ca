//! Dependency Reporter
//!
//! Accumulates accepted dependencies in discovery order and freezes them,
//! together with run statistics, into a [`DiscoveryReport`].

use crate::config::Strategy;
use crate::dependency::FunctionalDependency;
use crate::minimality::Admission;
use crate::oracle::OracleStats;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::time::Instant;

/// Counters collected while a run progresses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Rows in the snapshot when the run started
    pub row_count: usize,

    /// Left-hand sides fully evaluated
    pub candidates_evaluated: usize,

    /// (lhs, rhs) pairs handed to the validator
    pub checks: u64,

    /// Pairs skipped because an accepted dependency already implies them
    pub pruned: u64,

    /// Dependencies that held before minimality filtering
    pub validated: u64,

    pub trivial_rejected: u64,
    pub redundant_rejected: u64,

    pub cache_hits: u64,
    pub cache_misses: u64,
}

/// Result of one discovery run
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryReport {
    pub strategy: Strategy,
    pub max_arity: usize,
    pub source: String,
    pub dependencies: Vec<FunctionalDependency>,
    pub stats: RunStats,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,

    /// The run was stopped before every candidate was evaluated
    pub interrupted: bool,
}

impl DiscoveryReport {
    /// One `LHS_1, LHS_2 --> RHS` line per dependency
    pub fn render(&self) -> Vec<String> {
        self.dependencies.iter().map(|fd| fd.to_string()).collect()
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_ms as f64 / 1000.0
    }

    /// Same dependencies, regardless of order
    pub fn same_cover(&self, other: &DiscoveryReport) -> bool {
        let mine: HashSet<&FunctionalDependency> = self.dependencies.iter().collect();
        let theirs: HashSet<&FunctionalDependency> = other.dependencies.iter().collect();
        mine == theirs
    }
}

impl fmt::Display for DiscoveryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.render() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

pub struct DependencyReporter {
    strategy: Strategy,
    max_arity: usize,
    source: String,
    dependencies: Vec<FunctionalDependency>,
    stats: RunStats,
    started_at: DateTime<Utc>,
    started: Instant,
    interrupted: bool,
}

impl DependencyReporter {
    pub fn new(strategy: Strategy, max_arity: usize, source: String) -> Self {
        Self {
            strategy,
            max_arity,
            source,
            dependencies: Vec::new(),
            stats: RunStats::default(),
            started_at: Utc::now(),
            started: Instant::now(),
            interrupted: false,
        }
    }

    pub fn set_row_count(&mut self, rows: usize) {
        self.stats.row_count = rows;
    }

    pub fn candidate_evaluated(&mut self) {
        self.stats.candidates_evaluated += 1;
    }

    pub fn pruned(&mut self) {
        self.stats.pruned += 1;
    }

    /// Record the filter's verdict on a validated dependency
    pub fn record(&mut self, fd: FunctionalDependency, admission: &Admission) {
        self.stats.validated += 1;
        match admission {
            Admission::Accepted => self.dependencies.push(fd),
            Admission::Trivial => self.stats.trivial_rejected += 1,
            Admission::Redundant { .. } => self.stats.redundant_rejected += 1,
        }
    }

    pub fn mark_interrupted(&mut self) {
        self.interrupted = true;
    }

    pub fn dependencies(&self) -> &[FunctionalDependency] {
        &self.dependencies
    }

    /// Freeze the accumulated dependencies into the run's report
    pub fn finish(mut self, checks: u64, cache: Option<OracleStats>) -> DiscoveryReport {
        self.stats.checks = checks;
        if let Some(cache) = cache {
            self.stats.cache_hits = cache.hits;
            self.stats.cache_misses = cache.misses;
        }

        DiscoveryReport {
            strategy: self.strategy,
            max_arity: self.max_arity,
            source: self.source,
            dependencies: self.dependencies,
            stats: self.stats,
            started_at: self.started_at,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            interrupted: self.interrupted,
        }
    }
}
