//! Row partitions
//!
//! A partition groups row identifiers into equivalence classes of rows that
//! agree on every attribute of some attribute set. Classes are stored as
//! native sets and kept in a canonical order (by smallest member), so two
//! partitions of the same snapshot compare equal no matter in which order the
//! data source produced its groups.

use crate::error::{FdError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Opaque, stable identifier of one row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId(pub i64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rows sharing the same values on an attribute set
pub type EquivalenceClass = BTreeSet<RowId>;

/// Immutable partition of the relation's row identifiers
#[derive(Debug, Clone)]
pub struct Partition {
    classes: Vec<EquivalenceClass>,

    /// Row id -> index of the class holding it
    class_of: HashMap<RowId, usize>,
}

impl Partition {
    /// Build a partition from the classes returned by a data source.
    ///
    /// Empty classes are dropped. A row id appearing in two classes means the
    /// source is inconsistent and is reported as a data-source error.
    pub fn from_classes(classes: impl IntoIterator<Item = EquivalenceClass>) -> Result<Self> {
        let mut classes: Vec<EquivalenceClass> =
            classes.into_iter().filter(|c| !c.is_empty()).collect();
        classes.sort_by_key(|class| class.first().copied());

        let mut class_of = HashMap::with_capacity(classes.iter().map(|c| c.len()).sum());
        for (index, class) in classes.iter().enumerate() {
            for row in class {
                if class_of.insert(*row, index).is_some() {
                    return Err(FdError::DataSource(format!(
                        "Row {} was returned in more than one equivalence class",
                        row
                    )));
                }
            }
        }

        Ok(Self { classes, class_of })
    }

    pub fn classes(&self) -> &[EquivalenceClass] {
        &self.classes
    }

    /// Number of equivalence classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Number of rows covered by the partition
    pub fn row_count(&self) -> usize {
        self.class_of.len()
    }

    pub fn class_containing(&self, row: RowId) -> Option<&EquivalenceClass> {
        self.class_of.get(&row).map(|&index| &self.classes[index])
    }

    /// True when every class of `self` is contained in some class of `other`.
    ///
    /// Classes of `other` are disjoint, so the only one that can contain a
    /// class of `self` is the class holding its smallest row. The first class
    /// without a container rejects the whole refinement.
    pub fn refines(&self, other: &Partition) -> bool {
        self.classes.iter().all(|class| {
            let Some(first) = class.first() else {
                return true;
            };
            match other.class_containing(*first) {
                Some(container) => class.is_subset(container),
                None => false,
            }
        })
    }

    /// True when the union of the classes is exactly `rows`.
    ///
    /// Disjointness is already enforced on construction.
    pub fn covers(&self, rows: &BTreeSet<RowId>) -> bool {
        self.class_of.len() == rows.len() && rows.iter().all(|row| self.class_of.contains_key(row))
    }

    /// All row ids covered by the partition
    pub fn rows(&self) -> BTreeSet<RowId> {
        self.class_of.keys().copied().collect()
    }
}

impl PartialEq for Partition {
    fn eq(&self, other: &Self) -> bool {
        self.classes == other.classes
    }
}

impl Eq for Partition {}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(ids: &[i64]) -> EquivalenceClass {
        ids.iter().map(|&id| RowId(id)).collect()
    }

    #[test]
    fn test_canonical_order() {
        let a = Partition::from_classes(vec![class(&[3, 4]), class(&[1, 2])]).unwrap();
        let b = Partition::from_classes(vec![class(&[2, 1]), class(&[4, 3])]).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.classes()[0], class(&[1, 2]));
        assert_eq!(a.row_count(), 4);
    }

    #[test]
    fn test_overlapping_classes_are_rejected() {
        let err = Partition::from_classes(vec![class(&[1, 2]), class(&[2, 3])]).unwrap_err();
        assert!(matches!(err, FdError::DataSource(_)));
    }

    #[test]
    fn test_refinement() {
        let fine = Partition::from_classes(vec![class(&[1]), class(&[2]), class(&[3, 4])]).unwrap();
        let coarse = Partition::from_classes(vec![class(&[1, 2]), class(&[3, 4])]).unwrap();

        assert!(fine.refines(&coarse));
        assert!(!coarse.refines(&fine));
        assert!(fine.refines(&fine));
    }

    #[test]
    fn test_split_class_does_not_refine() {
        // {2, 3} straddles two classes of the right partition
        let left = Partition::from_classes(vec![class(&[1]), class(&[2, 3])]).unwrap();
        let right = Partition::from_classes(vec![class(&[1, 2]), class(&[3])]).unwrap();

        assert!(!left.refines(&right));
    }

    #[test]
    fn test_empty_partition_refines_anything() {
        let empty = Partition::from_classes(Vec::new()).unwrap();
        let other = Partition::from_classes(vec![class(&[1])]).unwrap();

        assert!(empty.refines(&other));
        assert!(empty.refines(&empty));
        assert!(empty.is_empty());
    }

    #[test]
    fn test_covers() {
        let p = Partition::from_classes(vec![class(&[1, 3]), class(&[2])]).unwrap();
        assert!(p.covers(&class(&[1, 2, 3])));
        assert!(!p.covers(&class(&[1, 2])));
        assert!(!p.covers(&class(&[1, 2, 3, 4])));
    }
}
