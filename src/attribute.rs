//! Attribute Universe
//!
//! The fixed, ordered set of column names over which dependencies are sought.
//! Attributes carry their position in the universe so that attribute sets have
//! one canonical ordering, which makes them usable as cache keys and keeps
//! candidate enumeration deterministic.

use crate::error::{FdError, Result};
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

/// One column of the relation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Attribute {
    /// Position in the universe (primary sort key)
    position: usize,

    /// Column name as known to the data source
    name: String,
}

impl Attribute {
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Serialize for Attribute {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}

/// Non-empty, duplicate-free, canonically ordered set of attributes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AttributeSet(Vec<Attribute>);

impl AttributeSet {
    /// Build a set from arbitrary attributes, sorting and removing duplicates.
    pub fn new(attributes: impl IntoIterator<Item = Attribute>) -> Result<Self> {
        let mut attributes: Vec<Attribute> = attributes.into_iter().collect();
        attributes.sort();
        attributes.dedup();

        if attributes.is_empty() {
            return Err(FdError::InvalidConfig(
                "An attribute set must contain at least one attribute".to_string(),
            ));
        }

        Ok(Self(attributes))
    }

    pub fn singleton(attribute: Attribute) -> Self {
        Self(vec![attribute])
    }

    /// Wrap attributes that are already sorted and distinct.
    pub(crate) fn from_canonical(attributes: Vec<Attribute>) -> Self {
        debug_assert!(!attributes.is_empty());
        debug_assert!(attributes.windows(2).all(|w| w[0] < w[1]));
        Self(attributes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, attribute: &Attribute) -> bool {
        self.0.binary_search(attribute).is_ok()
    }

    /// True when every attribute of `self` is also in `other`.
    pub fn is_subset_of(&self, other: &AttributeSet) -> bool {
        if self.len() > other.len() {
            return false;
        }
        self.0.iter().all(|attribute| other.contains(attribute))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.0.iter()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.0
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|a| a.name()).collect()
    }
}

impl fmt::Display for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join(", "))
    }
}

impl<'a> IntoIterator for &'a AttributeSet {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Ordered attribute universe for one discovery run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeUniverse {
    attributes: Vec<Attribute>,
}

impl AttributeUniverse {
    /// Create a universe from column names, in the given order.
    ///
    /// Fails when no names are given or a name repeats.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut attributes = Vec::new();

        for (position, name) in names.into_iter().enumerate() {
            let name: String = name.into();
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(FdError::InvalidConfig(format!(
                    "Attribute name at position {} is empty",
                    position
                )));
            }
            if !seen.insert(trimmed.to_string()) {
                return Err(FdError::InvalidConfig(format!(
                    "Attribute '{}' appears more than once in the universe",
                    trimmed
                )));
            }
            attributes.push(Attribute {
                position,
                name: trimmed.to_string(),
            });
        }

        if attributes.is_empty() {
            return Err(FdError::InvalidConfig(
                "The attribute universe is empty".to_string(),
            ));
        }

        Ok(Self { attributes })
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.attributes.iter()
    }

    /// Look up an attribute by column name
    pub fn get(&self, name: &str) -> Result<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| FdError::UnknownAttribute(name.to_string()))
    }

    /// Build an attribute set from column names
    pub fn set_of(&self, names: &[&str]) -> Result<AttributeSet> {
        let attributes = names
            .iter()
            .map(|name| self.get(name).cloned())
            .collect::<Result<Vec<_>>>()?;
        AttributeSet::new(attributes)
    }
}
