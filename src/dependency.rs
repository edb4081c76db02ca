use crate::attribute::{Attribute, AttributeSet};
use serde::Serialize;
use std::fmt;

/// `lhs --> rhs`: rows agreeing on every attribute of `lhs` agree on `rhs`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FunctionalDependency {
    pub lhs: AttributeSet,
    pub rhs: Attribute,
}

impl FunctionalDependency {
    pub fn new(lhs: AttributeSet, rhs: Attribute) -> Self {
        Self { lhs, rhs }
    }

    /// The right-hand side is already part of the left-hand side
    pub fn is_trivial(&self) -> bool {
        self.lhs.contains(&self.rhs)
    }

    /// `other` has the same right-hand side and a left-hand side contained in ours
    pub fn is_implied_by(&self, other: &FunctionalDependency) -> bool {
        self.rhs == other.rhs && other.lhs.is_subset_of(&self.lhs)
    }
}

impl fmt::Display for FunctionalDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --> {}", self.lhs, self.rhs)
    }
}
