//! Dependency validators
//!
//! Both validators answer the same question, "does `lhs` determine `rhs` on
//! every row?", and must agree on every relation:
//! - [`NaiveValidator`] asks the data source for groups of `lhs` holding more
//!   than one distinct `rhs` value; one grouped scan per pair, no caching.
//! - [`RefinementValidator`] checks that the partition by `lhs` refines the
//!   partition by `rhs`, reusing memoized partitions from the oracle.

use crate::attribute::{Attribute, AttributeSet, AttributeUniverse};
use crate::config::Strategy;
use crate::dependency::FunctionalDependency;
use crate::error::Result;
use crate::oracle::PartitionOracle;
use crate::source::TabularDataSource;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub trait DependencyValidator: Send + Sync {
    fn strategy(&self) -> Strategy;

    /// True when `lhs --> rhs` holds on the whole relation
    fn holds(&self, lhs: &AttributeSet, rhs: &Attribute) -> Result<bool>;

    /// Number of pair checks performed so far
    fn checks(&self) -> u64;

    /// Every non-trivial dependency `lhs --> r` that holds, in universe order
    fn validate_candidate(
        &self,
        lhs: &AttributeSet,
        universe: &AttributeUniverse,
    ) -> Result<Vec<FunctionalDependency>> {
        let mut found = Vec::new();
        for rhs in universe.iter() {
            if lhs.contains(rhs) {
                continue;
            }
            if self.holds(lhs, rhs)? {
                found.push(FunctionalDependency::new(lhs.clone(), rhs.clone()));
            }
        }
        Ok(found)
    }
}

pub struct NaiveValidator {
    source: Arc<dyn TabularDataSource>,
    checks: AtomicU64,
}

impl NaiveValidator {
    pub fn new(source: Arc<dyn TabularDataSource>) -> Self {
        Self {
            source,
            checks: AtomicU64::new(0),
        }
    }
}

impl DependencyValidator for NaiveValidator {
    fn strategy(&self) -> Strategy {
        Strategy::Naive
    }

    fn holds(&self, lhs: &AttributeSet, rhs: &Attribute) -> Result<bool> {
        self.checks.fetch_add(1, Ordering::Relaxed);
        let violating = self.source.distinct_count_groups(lhs, rhs)?;
        Ok(violating.iter().all(|group| group.distinct_values <= 1))
    }

    fn checks(&self) -> u64 {
        self.checks.load(Ordering::Relaxed)
    }
}

pub struct RefinementValidator {
    oracle: Arc<PartitionOracle>,
    checks: AtomicU64,
}

impl RefinementValidator {
    pub fn new(oracle: Arc<PartitionOracle>) -> Self {
        Self {
            oracle,
            checks: AtomicU64::new(0),
        }
    }

    pub fn oracle(&self) -> &Arc<PartitionOracle> {
        &self.oracle
    }
}

impl DependencyValidator for RefinementValidator {
    fn strategy(&self) -> Strategy {
        Strategy::Refinement
    }

    fn holds(&self, lhs: &AttributeSet, rhs: &Attribute) -> Result<bool> {
        self.checks.fetch_add(1, Ordering::Relaxed);
        let left = self.oracle.partition_of(lhs)?;
        let right = self
            .oracle
            .partition_of(&AttributeSet::singleton(rhs.clone()))?;
        Ok(left.refines(&right))
    }

    fn checks(&self) -> u64 {
        self.checks.load(Ordering::Relaxed)
    }
}
