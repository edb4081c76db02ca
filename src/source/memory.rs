//! In-memory relation
//!
//! Rows are kept as value vectors with explicit row identifiers. Grouping is
//! done with hash maps keyed by value tuples.

use super::{GroupCount, TabularDataSource};
use crate::attribute::{Attribute, AttributeSet};
use crate::error::{FdError, Result};
use crate::partition::{EquivalenceClass, RowId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single cell value
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Parse a raw text cell: empty -> NULL, then integer, float, text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        if let Ok(v) = trimmed.parse::<i64>() {
            return Value::Int(v);
        }
        if let Ok(v) = trimmed.parse::<f64>() {
            return Value::Float(v);
        }
        Value::Text(trimmed.to_string())
    }
}

// Floats compare by bit pattern so values can key hash maps
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(v) => v.hash(state),
            Value::Int(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Text(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Relation held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryTable {
    columns: Vec<String>,
    rows: Vec<(RowId, Vec<Value>)>,
    ids: HashSet<RowId>,
}

impl InMemoryTable {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            ids: HashSet::new(),
        }
    }

    /// Build a table whose row ids are 1, 2, 3, ... in insertion order
    pub fn from_rows<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Build a table from raw text cells, parsed with [`Value::parse`]
    pub fn from_string_rows<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: &[Vec<&str>],
    ) -> Result<Self> {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|cell| Value::parse(cell)).collect())
            .collect();
        Self::from_rows(columns, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row with the next free sequential id
    pub fn push_row(&mut self, values: Vec<Value>) -> Result<RowId> {
        let mut next = self.rows.len() as i64 + 1;
        while self.ids.contains(&RowId(next)) {
            next += 1;
        }
        let id = RowId(next);
        self.push_row_with_id(id, values)?;
        Ok(id)
    }

    /// Append a row under an explicit surrogate key
    pub fn push_row_with_id(&mut self, id: RowId, values: Vec<Value>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(FdError::DataSource(format!(
                "Row {} has {} values but the table has {} columns",
                id,
                values.len(),
                self.columns.len()
            )));
        }
        if !self.ids.insert(id) {
            return Err(FdError::DataSource(format!("Duplicate row id {}", id)));
        }
        self.rows.push((id, values));
        Ok(())
    }

    fn column_index(&self, attribute: &Attribute) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == attribute.name())
            .ok_or_else(|| FdError::UnknownAttribute(attribute.name().to_string()))
    }

    fn column_indices(&self, attributes: &AttributeSet) -> Result<Vec<usize>> {
        attributes.iter().map(|a| self.column_index(a)).collect()
    }
}

impl TabularDataSource for InMemoryTable {
    fn distinct_count_groups(
        &self,
        group_by: &AttributeSet,
        target: &Attribute,
    ) -> Result<Vec<GroupCount>> {
        let keys = self.column_indices(group_by)?;
        let target = self.column_index(target)?;

        let mut groups: HashMap<Vec<&Value>, HashSet<&Value>> = HashMap::new();
        for (_, values) in &self.rows {
            let key: Vec<&Value> = keys.iter().map(|&i| &values[i]).collect();
            groups.entry(key).or_default().insert(&values[target]);
        }

        Ok(groups
            .into_values()
            .filter(|distinct| distinct.len() > 1)
            .map(|distinct| GroupCount {
                distinct_values: distinct.len() as u64,
            })
            .collect())
    }

    fn row_partition(&self, attributes: &AttributeSet) -> Result<Vec<EquivalenceClass>> {
        let keys = self.column_indices(attributes)?;

        let mut groups: HashMap<Vec<&Value>, EquivalenceClass> = HashMap::new();
        for (id, values) in &self.rows {
            let key: Vec<&Value> = keys.iter().map(|&i| &values[i]).collect();
            groups.entry(key).or_default().insert(*id);
        }

        Ok(groups.into_values().collect())
    }

    fn row_count(&self) -> Result<usize> {
        Ok(self.rows.len())
    }

    fn describe(&self) -> String {
        format!(
            "in-memory table ({} columns, {} rows)",
            self.columns.len(),
            self.rows.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeUniverse;

    fn table() -> InMemoryTable {
        InMemoryTable::from_rows(
            ["a", "b"],
            vec![
                vec![1.into(), "x".into()],
                vec![1.into(), "y".into()],
                vec![2.into(), Value::Null],
                vec![2.into(), Value::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_distinct_count_groups() {
        let u = AttributeUniverse::new(["a", "b"]).unwrap();
        let t = table();

        let groups = t
            .distinct_count_groups(&u.set_of(&["a"]).unwrap(), u.get("b").unwrap())
            .unwrap();
        assert_eq!(groups, vec![GroupCount { distinct_values: 2 }]);

        let groups = t
            .distinct_count_groups(&u.set_of(&["b"]).unwrap(), u.get("a").unwrap())
            .unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn test_nulls_group_together() {
        let u = AttributeUniverse::new(["a", "b"]).unwrap();
        let classes = table().row_partition(&u.set_of(&["b"]).unwrap()).unwrap();

        assert_eq!(classes.len(), 3);
        assert!(classes
            .iter()
            .any(|c| c.len() == 2 && c.contains(&RowId(3)) && c.contains(&RowId(4))));
    }

    #[test]
    fn test_row_shape_is_checked() {
        let mut t = InMemoryTable::new(["a", "b"]);
        assert!(t.push_row(vec![1.into()]).is_err());
        t.push_row_with_id(RowId(7), vec![1.into(), 2.into()]).unwrap();
        assert!(t.push_row_with_id(RowId(7), vec![1.into(), 2.into()]).is_err());
    }

    #[test]
    fn test_unknown_column() {
        let u = AttributeUniverse::new(["a", "zzz"]).unwrap();
        let err = table().row_partition(&u.set_of(&["zzz"]).unwrap()).unwrap_err();
        assert!(matches!(err, FdError::UnknownAttribute(_)));
    }

    #[test]
    fn test_parse_cells() {
        assert_eq!(Value::parse(""), Value::Null);
        assert_eq!(Value::parse(" 42 "), Value::Int(42));
        assert_eq!(Value::parse("7.5"), Value::Float(7.5));
        assert_eq!(Value::parse("Drama"), Value::Text("Drama".to_string()));
    }

    #[test]
    fn test_from_string_rows() {
        let t = InMemoryTable::from_string_rows(
            ["movieid", "runtime"],
            &[vec!["tt1", "95"], vec!["tt1", "95"], vec!["tt2", ""]],
        )
        .unwrap();
        assert_eq!(t.len(), 3);

        let u = AttributeUniverse::new(["movieid", "runtime"]).unwrap();
        let classes = t.row_partition(&u.set_of(&["runtime"]).unwrap()).unwrap();
        assert_eq!(classes.len(), 2);
        assert!(classes.iter().any(|c| c.len() == 1 && c.contains(&RowId(3))));
    }
}
