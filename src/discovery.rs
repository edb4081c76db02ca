//! Discovery runs
//!
//! Drives candidate evaluation end to end:
//! universe -> candidates (singletons first) -> validator -> minimality filter -> reporter.
//!
//! Sequential runs admit dependencies as they are found and skip pairs an
//! accepted dependency already implies. Parallel runs validate candidates on a
//! sliding window of blocking workers and apply the minimality filter as a post-pass over the
//! raw results in candidate order, so both modes report the same cover in the
//! same order.

use crate::attribute::{AttributeSet, AttributeUniverse};
use crate::candidates::CandidateGenerator;
use crate::config::{DiscoveryConfig, Strategy};
use crate::dependency::FunctionalDependency;
use crate::error::{FdError, Result};
use crate::minimality::{Admission, MinimalityFilter};
use crate::oracle::PartitionOracle;
use crate::reporter::{DependencyReporter, DiscoveryReport};
use crate::source::TabularDataSource;
use crate::validator::{DependencyValidator, NaiveValidator, RefinementValidator};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Requests a running discovery to stop before its next candidate
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One discovery run over a fixed relation snapshot
pub struct DiscoveryRun {
    source: Arc<dyn TabularDataSource>,
    universe: AttributeUniverse,
    config: DiscoveryConfig,
    max_arity: usize,
    stop: StopHandle,
}

impl DiscoveryRun {
    /// Validate the configuration against the universe; fails before any query.
    pub fn new(
        source: Arc<dyn TabularDataSource>,
        universe: AttributeUniverse,
        config: DiscoveryConfig,
    ) -> Result<Self> {
        config.validate(universe.len())?;
        let max_arity = config.resolve_max_arity(universe.len())?;

        Ok(Self {
            source,
            universe,
            config,
            max_arity,
            stop: StopHandle::default(),
        })
    }

    pub fn universe(&self) -> &AttributeUniverse {
        &self.universe
    }

    pub fn max_arity(&self) -> usize {
        self.max_arity
    }

    pub fn strategy(&self) -> Strategy {
        self.config.strategy
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Fresh validator (and, for refinement, a fresh partition cache)
    fn build_validator(&self) -> (Arc<dyn DependencyValidator>, Option<Arc<PartitionOracle>>) {
        match self.config.strategy {
            Strategy::Naive => {
                let validator: Arc<dyn DependencyValidator> =
                    Arc::new(NaiveValidator::new(Arc::clone(&self.source)));
                (validator, None)
            }
            Strategy::Refinement => {
                let oracle = Arc::new(PartitionOracle::new(Arc::clone(&self.source)));
                let validator: Arc<dyn DependencyValidator> =
                    Arc::new(RefinementValidator::new(Arc::clone(&oracle)));
                (validator, Some(oracle))
            }
        }
    }

    fn start_reporter(&self) -> Result<DependencyReporter> {
        let rows = self.source.row_count()?;
        info!(
            "Discovering dependencies with {} strategy over {} attributes, max arity {} ({})",
            self.config.strategy,
            self.universe.len(),
            self.max_arity,
            self.source.describe()
        );
        if rows == 0 {
            info!("Relation is empty: every non-trivial dependency holds vacuously");
        }

        let mut reporter =
            DependencyReporter::new(self.config.strategy, self.max_arity, self.source.describe());
        reporter.set_row_count(rows);
        Ok(reporter)
    }

    /// Evaluate every candidate on the calling thread.
    pub fn run(&self) -> Result<DiscoveryReport> {
        let generator = CandidateGenerator::new(&self.universe, self.max_arity)?;
        let (validator, oracle) = self.build_validator();
        let mut reporter = self.start_reporter()?;
        let mut filter = MinimalityFilter::new();
        let mut arity = 0;

        for lhs in generator.iter() {
            if self.stop.is_stopped() {
                warn!(
                    "Discovery stopped with {} dependencies accepted",
                    reporter.dependencies().len()
                );
                reporter.mark_interrupted();
                break;
            }
            if lhs.len() != arity {
                arity = lhs.len();
                info!(
                    "Evaluating left-hand sides of size {} ({} dependencies so far)",
                    arity,
                    reporter.dependencies().len()
                );
            }

            for rhs in self.universe.iter() {
                if lhs.contains(rhs) {
                    continue;
                }
                if let Some(by) = filter.implied_by(&lhs, rhs) {
                    debug!("Skipping {} --> {}: implied by {} --> {}", lhs, rhs, by, rhs);
                    reporter.pruned();
                    continue;
                }
                if validator.holds(&lhs, rhs)? {
                    let fd = FunctionalDependency::new(lhs.clone(), rhs.clone());
                    let admission = filter.admit(&fd)?;
                    debug!("{} holds: {:?}", fd, admission);
                    reporter.record(fd, &admission);
                }
            }
            reporter.candidate_evaluated();
        }

        let report = reporter.finish(validator.checks(), oracle.map(|o| o.stats()));
        info!(
            "Found {} dependencies in {:.3}s ({} checks)",
            report.dependencies.len(),
            report.elapsed_secs(),
            report.stats.checks
        );
        Ok(report)
    }

    /// Evaluate candidates on a pool of `workers` blocking tasks.
    ///
    /// At most `workers` candidates are in flight; results are collected in
    /// candidate order as the window slides.
    pub async fn run_parallel(&self) -> Result<DiscoveryReport> {
        let generator = CandidateGenerator::new(&self.universe, self.max_arity)?;
        let (validator, oracle) = self.build_validator();
        let mut reporter = self.start_reporter()?;
        let workers = self.config.workers;

        info!(
            "Dispatching {} candidates to {} workers",
            generator.candidate_count(),
            workers
        );

        let mut in_flight: VecDeque<JoinHandle<Result<Vec<FunctionalDependency>>>> =
            VecDeque::with_capacity(workers);
        let mut raw = Vec::new();
        let mut dispatched = 0usize;

        for lhs in generator.iter() {
            if self.stop.is_stopped() {
                warn!("Discovery stopped after dispatching {} candidates", dispatched);
                reporter.mark_interrupted();
                break;
            }

            if in_flight.len() == workers {
                if let Some(handle) = in_flight.pop_front() {
                    match join_candidate(handle).await {
                        Ok(found) => {
                            raw.extend(found);
                            reporter.candidate_evaluated();
                        }
                        Err(e) => {
                            cancel_all(in_flight).await;
                            return Err(e);
                        }
                    }
                }
            }

            let validator = Arc::clone(&validator);
            let universe = self.universe.clone();
            in_flight.push_back(tokio::task::spawn_blocking(move || {
                validator.validate_candidate(&lhs, &universe)
            }));
            dispatched += 1;
        }

        while let Some(handle) = in_flight.pop_front() {
            match join_candidate(handle).await {
                Ok(found) => {
                    raw.extend(found);
                    reporter.candidate_evaluated();
                }
                Err(e) => {
                    cancel_all(in_flight).await;
                    return Err(e);
                }
            }
        }

        for fd in MinimalityFilter::minimize(raw.iter().cloned())? {
            reporter.record(fd, &Admission::Accepted);
        }
        let accepted = reporter.dependencies().len() as u64;
        let mut report = reporter.finish(validator.checks(), oracle.map(|o| o.stats()));
        report.stats.validated = raw.len() as u64;
        report.stats.redundant_rejected = report.stats.validated - accepted;

        info!(
            "Found {} dependencies in {:.3}s ({} checks, {} workers)",
            report.dependencies.len(),
            report.elapsed_secs(),
            report.stats.checks,
            workers
        );
        Ok(report)
    }

    /// Every non-trivial dependency that holds for some candidate, before
    /// minimality filtering, in candidate order.
    pub fn raw_dependencies(&self) -> Result<Vec<FunctionalDependency>> {
        let generator = CandidateGenerator::new(&self.universe, self.max_arity)?;
        let (validator, _) = self.build_validator();

        let mut raw = Vec::new();
        for lhs in generator.iter() {
            raw.extend(validator.validate_candidate(&lhs, &self.universe)?);
        }
        Ok(raw)
    }

    /// Check a single candidate without running the whole search
    pub fn check(&self, lhs: &AttributeSet) -> Result<Vec<FunctionalDependency>> {
        let (validator, _) = self.build_validator();
        validator.validate_candidate(lhs, &self.universe)
    }
}

async fn join_candidate(
    handle: JoinHandle<Result<Vec<FunctionalDependency>>>,
) -> Result<Vec<FunctionalDependency>> {
    handle
        .await
        .map_err(|e| FdError::Execution(format!("Worker task failed: {}", e)))?
}

/// Cancel queued candidates and wait out the ones already running, so no
/// worker touches the source after the run returns.
async fn cancel_all(in_flight: VecDeque<JoinHandle<Result<Vec<FunctionalDependency>>>>) {
    for handle in &in_flight {
        handle.abort();
    }
    for handle in in_flight {
        let _ = handle.await;
    }
}
