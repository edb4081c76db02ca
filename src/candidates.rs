//! Candidate Generator
//!
//! Enumerates left-hand-side attribute sets in non-decreasing size order,
//! bounded by a maximum arity. Within one size, sets come out in the
//! lexicographic order of universe positions.

use crate::attribute::{Attribute, AttributeSet, AttributeUniverse};
use crate::error::{FdError, Result};
use itertools::Itertools;

/// A left-hand side together with the pool of right-hand attributes to test
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub lhs: AttributeSet,
    pub rhs_pool: &'a [Attribute],
}

/// Enumerates every non-empty attribute set of size `<= max_arity`
#[derive(Debug, Clone)]
pub struct CandidateGenerator<'a> {
    universe: &'a AttributeUniverse,
    max_arity: usize,
}

impl<'a> CandidateGenerator<'a> {
    /// Create a generator, validating `1 <= max_arity <= |universe|`.
    pub fn new(universe: &'a AttributeUniverse, max_arity: usize) -> Result<Self> {
        if universe.is_empty() {
            return Err(FdError::InvalidConfig(
                "Cannot generate candidates over an empty attribute universe".to_string(),
            ));
        }
        if max_arity == 0 || max_arity > universe.len() {
            return Err(FdError::InvalidConfig(format!(
                "Maximum arity {} is outside [1, {}]",
                max_arity,
                universe.len()
            )));
        }

        Ok(Self {
            universe,
            max_arity,
        })
    }

    pub fn max_arity(&self) -> usize {
        self.max_arity
    }

    /// Number of candidates the generator will yield: sum of C(n, k) for k in 1..=max_arity.
    ///
    /// Saturates at `usize::MAX` for very wide universes.
    pub fn candidate_count(&self) -> usize {
        let n = self.universe.len();
        (1..=self.max_arity)
            .map(|k| binomial(n, k))
            .fold(0usize, usize::saturating_add)
    }

    /// Left-hand sides, singletons first
    pub fn iter(&self) -> impl Iterator<Item = AttributeSet> + 'a {
        let attributes = self.universe.attributes();
        (1..=self.max_arity).flat_map(move |size| {
            attributes
                .iter()
                .cloned()
                .combinations(size)
                .map(AttributeSet::from_canonical)
        })
    }

    /// Left-hand sides paired with the full universe as right-hand pool
    pub fn candidates(&self) -> impl Iterator<Item = Candidate<'a>> + 'a {
        let pool = self.universe.attributes();
        self.iter().map(move |lhs| Candidate {
            lhs,
            rhs_pool: pool,
        })
    }
}

fn binomial(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    // Each partial product is itself a binomial, so the division is exact
    let mut acc: u128 = 1;
    for i in 0..k {
        acc = match acc.checked_mul((n - i) as u128) {
            Some(product) => product / (i + 1) as u128,
            None => return usize::MAX,
        };
    }
    usize::try_from(acc).unwrap_or(usize::MAX)
}
