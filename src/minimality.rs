//! Minimality Filter
//!
//! Keeps the accepted set a minimal cover: trivial dependencies are refused,
//! and so is any dependency whose left-hand side contains the left-hand side
//! of an already accepted dependency with the same right-hand side.
//!
//! Redundancy can only be detected against shorter dependencies that were
//! admitted first, so dependencies must arrive in non-decreasing left-hand
//! size. The filter refuses out-of-order input instead of silently keeping a
//! redundant dependency.

use crate::attribute::{Attribute, AttributeSet};
use crate::dependency::FunctionalDependency;
use crate::error::{FdError, Result};
use std::collections::HashMap;

/// Outcome of offering a dependency to the filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    /// Right-hand side already in the left-hand side
    Trivial,
    /// Implied by an accepted dependency with left-hand side `by`
    Redundant { by: AttributeSet },
}

#[derive(Debug, Default)]
pub struct MinimalityFilter {
    accepted: HashMap<Attribute, Vec<AttributeSet>>,
    largest_lhs: usize,
}

impl MinimalityFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepted left-hand side that makes `lhs --> rhs` redundant, if any
    pub fn implied_by(&self, lhs: &AttributeSet, rhs: &Attribute) -> Option<&AttributeSet> {
        self.accepted
            .get(rhs)?
            .iter()
            .find(|shorter| shorter.is_subset_of(lhs))
    }

    /// Offer a validated dependency; accepted ones are remembered.
    pub fn admit(&mut self, fd: &FunctionalDependency) -> Result<Admission> {
        if fd.is_trivial() {
            return Ok(Admission::Trivial);
        }
        if fd.lhs.len() < self.largest_lhs {
            return Err(FdError::OutOfOrder(format!(
                "'{}' has a {}-attribute left-hand side after {}-attribute ones were admitted",
                fd,
                fd.lhs.len(),
                self.largest_lhs
            )));
        }
        self.largest_lhs = fd.lhs.len();

        if let Some(by) = self.implied_by(&fd.lhs, &fd.rhs) {
            return Ok(Admission::Redundant { by: by.clone() });
        }

        self.accepted
            .entry(fd.rhs.clone())
            .or_default()
            .push(fd.lhs.clone());
        Ok(Admission::Accepted)
    }

    /// Number of accepted dependencies
    pub fn len(&self) -> usize {
        self.accepted.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reduce raw dependencies to a minimal cover.
    ///
    /// Input is stably sorted by left-hand size first, so dependencies of
    /// equal size keep their discovery order.
    pub fn minimize(
        raw: impl IntoIterator<Item = FunctionalDependency>,
    ) -> Result<Vec<FunctionalDependency>> {
        let mut raw: Vec<FunctionalDependency> = raw.into_iter().collect();
        raw.sort_by_key(|fd| fd.lhs.len());

        let mut filter = Self::new();
        let mut kept = Vec::new();
        for fd in raw {
            if filter.admit(&fd)? == Admission::Accepted {
                kept.push(fd);
            }
        }
        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeUniverse;

    fn fd(u: &AttributeUniverse, lhs: &[&str], rhs: &str) -> FunctionalDependency {
        FunctionalDependency::new(u.set_of(lhs).unwrap(), u.get(rhs).unwrap().clone())
    }

    fn universe() -> AttributeUniverse {
        AttributeUniverse::new(["a", "b", "c", "d"]).unwrap()
    }

    #[test]
    fn test_trivial_rejected() {
        let u = universe();
        let mut filter = MinimalityFilter::new();
        assert_eq!(filter.admit(&fd(&u, &["a", "b"], "a")).unwrap(), Admission::Trivial);
        assert!(filter.is_empty());
    }

    #[test]
    fn test_superset_redundant() {
        let u = universe();
        let mut filter = MinimalityFilter::new();

        assert_eq!(filter.admit(&fd(&u, &["a"], "c")).unwrap(), Admission::Accepted);
        assert_eq!(
            filter.admit(&fd(&u, &["a", "b"], "c")).unwrap(),
            Admission::Redundant {
                by: u.set_of(&["a"]).unwrap()
            }
        );
        // same right-hand side, unrelated left-hand side
        assert_eq!(filter.admit(&fd(&u, &["b", "d"], "c")).unwrap(), Admission::Accepted);
        // different right-hand side
        assert_eq!(filter.admit(&fd(&u, &["a", "b"], "d")).unwrap(), Admission::Accepted);
        assert_eq!(filter.len(), 3);
    }

    #[test]
    fn test_out_of_order_refused() {
        let u = universe();
        let mut filter = MinimalityFilter::new();
        filter.admit(&fd(&u, &["a", "b"], "c")).unwrap();

        let err = filter.admit(&fd(&u, &["a"], "c")).unwrap_err();
        assert!(matches!(err, FdError::OutOfOrder(_)));
    }

    #[test]
    fn test_minimize_sorts_by_size() {
        let u = universe();
        let raw = vec![
            fd(&u, &["a", "b"], "c"),
            fd(&u, &["b"], "d"),
            fd(&u, &["a"], "c"),
            fd(&u, &["b", "c"], "d"),
        ];

        let kept: Vec<String> = MinimalityFilter::minimize(raw)
            .unwrap()
            .iter()
            .map(|fd| fd.to_string())
            .collect();
        assert_eq!(kept, vec!["b --> d", "a --> c"]);
    }
}
