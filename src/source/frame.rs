//! Polars-backed relation
//!
//! Wraps a `DataFrame` with a row-identifier column. When the frame has no
//! surrogate key, a row index column is generated. Distinct counts and
//! partitions are computed with lazy `group_by` aggregations.

use super::{GroupCount, TabularDataSource};
use crate::attribute::{Attribute, AttributeSet};
use crate::error::{FdError, Result};
use crate::partition::{EquivalenceClass, RowId};
use polars::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Name of the generated row index column
pub const ROW_INDEX_COLUMN: &str = "__fd_row_id";

const DISTINCT_COLUMN: &str = "__fd_distinct";

/// Relation backed by a polars `DataFrame`
#[derive(Debug)]
pub struct DataFrameSource {
    frame: DataFrame,
    /// Integer column the partitions are read from
    row_id: String,
    /// User-supplied key column, excluded from the attributes
    key: Option<String>,
}

impl DataFrameSource {
    /// Wrap a frame, using `row_id` as surrogate key or generating one.
    ///
    /// A given row-id column must be non-null and unique. Integer keys are
    /// used as row identifiers directly; any other key type is backed by a
    /// generated row index.
    pub fn new(mut frame: DataFrame, row_id: Option<&str>) -> Result<Self> {
        let key = match row_id {
            Some(name) => {
                let column = frame.column(name).map_err(|_| {
                    FdError::UnknownAttribute(format!("row id column '{}'", name))
                })?;
                if column.null_count() > 0 {
                    return Err(FdError::DataSource(format!(
                        "Row id column '{}' contains NULL values",
                        name
                    )));
                }
                if column.n_unique()? != frame.height() {
                    return Err(FdError::DataSource(format!(
                        "Row id column '{}' is not unique",
                        name
                    )));
                }
                Some(name.to_string())
            }
            None => None,
        };

        let integer_key = match &key {
            Some(name) => frame.column(name)?.dtype().is_integer(),
            None => false,
        };

        let row_id = match key.as_deref() {
            Some(name) if integer_key => {
                let ids = frame
                    .column(name)?
                    .strict_cast(&DataType::Int64)
                    .map_err(|e| {
                        FdError::DataSource(format!(
                            "Row id column '{}' does not fit in Int64: {}",
                            name, e
                        ))
                    })?;
                frame.with_column(ids)?;
                name.to_string()
            }
            _ => {
                frame = frame.with_row_index(ROW_INDEX_COLUMN, None)?;
                let ids = frame.column(ROW_INDEX_COLUMN)?.cast(&DataType::Int64)?;
                frame.with_column(ids)?;
                ROW_INDEX_COLUMN.to_string()
            }
        };

        debug!(
            "Wrapped frame with {} rows, row id column '{}'",
            frame.height(),
            row_id
        );

        Ok(Self { frame, row_id, key })
    }

    /// Load a CSV file with a header row
    pub fn from_csv(path: &Path, row_id: Option<&str>) -> Result<Self> {
        info!("Loading relation from {:?}", path);

        let frame = LazyCsvReader::new(path)
            .with_infer_schema_length(Some(10000))
            .finish()
            .map_err(|e| {
                FdError::DataSource(format!("Failed to read CSV file {:?}: {}", path, e))
            })?
            .collect()
            .map_err(|e| FdError::DataSource(format!("Failed to collect CSV data: {}", e)))?;

        Self::new(frame, row_id)
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Every column except the row identifier, in frame order
    pub fn attribute_columns(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .filter(|name| !self.is_key(name))
            .map(|name| name.to_string())
            .collect()
    }

    fn is_key(&self, name: &str) -> bool {
        name == self.row_id || self.key.as_deref() == Some(name)
    }

    fn ensure_columns<'a>(
        &self,
        attributes: impl IntoIterator<Item = &'a Attribute>,
    ) -> Result<()> {
        for attribute in attributes {
            if self.is_key(attribute.name()) || self.frame.column(attribute.name()).is_err() {
                return Err(FdError::UnknownAttribute(attribute.name().to_string()));
            }
        }
        Ok(())
    }

    fn key_exprs(attributes: &AttributeSet) -> Vec<Expr> {
        attributes.iter().map(|a| col(a.name())).collect()
    }
}

impl TabularDataSource for DataFrameSource {
    fn distinct_count_groups(
        &self,
        group_by: &AttributeSet,
        target: &Attribute,
    ) -> Result<Vec<GroupCount>> {
        self.ensure_columns(group_by.iter().chain(std::iter::once(target)))?;

        // A grouping key has exactly one value per group
        if group_by.contains(target) {
            return Ok(Vec::new());
        }

        let grouped = self
            .frame
            .clone()
            .lazy()
            .group_by(Self::key_exprs(group_by))
            .agg([col(target.name()).n_unique().alias(DISTINCT_COLUMN)])
            .filter(col(DISTINCT_COLUMN).gt(lit(1)))
            .collect()
            .map_err(|e| {
                FdError::DataSource(format!(
                    "Distinct count of {} grouped by {} failed: {}",
                    target, group_by, e
                ))
            })?;

        let counts = grouped
            .column(DISTINCT_COLUMN)?
            .cast(&DataType::UInt64)?;

        Ok(counts
            .u64()?
            .into_iter()
            .flatten()
            .map(|distinct_values| GroupCount { distinct_values })
            .collect())
    }

    fn row_partition(&self, attributes: &AttributeSet) -> Result<Vec<EquivalenceClass>> {
        self.ensure_columns(attributes)?;

        let grouped = self
            .frame
            .clone()
            .lazy()
            .group_by(Self::key_exprs(attributes))
            .agg([col(&self.row_id)])
            .collect()
            .map_err(|e| {
                FdError::DataSource(format!("Partition by {} failed: {}", attributes, e))
            })?;

        let ids = grouped.column(&self.row_id)?.list()?;
        let mut classes = Vec::with_capacity(grouped.height());
        for group in ids.into_iter() {
            let Some(rows) = group else {
                continue;
            };
            let class: EquivalenceClass = rows.i64()?.into_iter().flatten().map(RowId).collect();
            classes.push(class);
        }

        Ok(classes)
    }

    fn row_count(&self) -> Result<usize> {
        Ok(self.frame.height())
    }

    fn describe(&self) -> String {
        format!(
            "data frame ({} columns, {} rows)",
            self.frame.width(),
            self.frame.height()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeUniverse;

    fn frame() -> DataFrame {
        df! [
            "nid" => [10i64, 11, 12],
            "movieid" => ["tt1", "tt1", "tt2"],
            "runtime" => [Some(95i64), Some(95), None],
            "genre" => ["Drama", "Comedy", "Drama"]
        ]
        .unwrap()
    }

    #[test]
    fn test_generated_row_index() {
        let source = DataFrameSource::new(frame(), None).unwrap();
        assert_eq!(source.attribute_columns().len(), 4);
        assert_eq!(source.row_count().unwrap(), 3);
    }

    #[test]
    fn test_explicit_row_id_must_be_unique() {
        let dup = df! [
            "nid" => [1i64, 1],
            "a" => [1i64, 2]
        ]
        .unwrap();
        assert!(DataFrameSource::new(dup, Some("nid")).is_err());
    }

    #[test]
    fn test_partition_uses_row_ids() {
        let source = DataFrameSource::new(frame(), Some("nid")).unwrap();
        let u = AttributeUniverse::new(source.attribute_columns()).unwrap();

        let mut classes = source
            .row_partition(&u.set_of(&["movieid"]).unwrap())
            .unwrap();
        classes.sort();

        let expected: Vec<EquivalenceClass> = vec![
            [RowId(10), RowId(11)].into_iter().collect(),
            [RowId(12)].into_iter().collect(),
        ];
        assert_eq!(classes, expected);
    }

    #[test]
    fn test_distinct_counts() {
        let source = DataFrameSource::new(frame(), Some("nid")).unwrap();
        let u = AttributeUniverse::new(source.attribute_columns()).unwrap();

        let violating = source
            .distinct_count_groups(&u.set_of(&["movieid"]).unwrap(), u.get("genre").unwrap())
            .unwrap();
        assert_eq!(violating, vec![GroupCount { distinct_values: 2 }]);

        let holding = source
            .distinct_count_groups(&u.set_of(&["movieid"]).unwrap(), u.get("runtime").unwrap())
            .unwrap();
        assert!(holding.is_empty());
    }

    #[test]
    fn test_text_row_id_is_backed_by_row_index() {
        let frame = df! [
            "code" => ["r1", "r2", "r3"],
            "a" => [1i64, 1, 2],
            "b" => [10i64, 20, 30]
        ]
        .unwrap();
        let source = DataFrameSource::new(frame, Some("code")).unwrap();
        assert_eq!(source.attribute_columns(), vec!["a", "b"]);

        let u = AttributeUniverse::new(source.attribute_columns()).unwrap();
        let classes = source.row_partition(&u.set_of(&["a"]).unwrap()).unwrap();
        let mut sizes: Vec<usize> = classes.iter().map(|c| c.len()).collect();
        sizes.sort();
        assert_eq!(sizes, vec![1, 2]);

        let violating = source
            .distinct_count_groups(&u.set_of(&["a"]).unwrap(), u.get("b").unwrap())
            .unwrap();
        assert_eq!(violating, vec![GroupCount { distinct_values: 2 }]);

        let u = AttributeUniverse::new(["code"]).unwrap();
        let err = source.row_partition(&u.set_of(&["code"]).unwrap()).unwrap_err();
        assert!(matches!(err, FdError::UnknownAttribute(_)));
    }

    #[test]
    fn test_row_id_with_nulls_is_rejected() {
        let frame = df! [
            "code" => [Some("r1"), None],
            "a" => [1i64, 2]
        ]
        .unwrap();
        let err = DataFrameSource::new(frame, Some("code")).unwrap_err();
        assert!(err.is_data_source());
    }

    #[test]
    fn test_row_id_is_not_an_attribute() {
        let source = DataFrameSource::new(frame(), Some("nid")).unwrap();
        let u = AttributeUniverse::new(["nid"]).unwrap();
        let err = source.row_partition(&u.set_of(&["nid"]).unwrap()).unwrap_err();
        assert!(matches!(err, FdError::UnknownAttribute(_)));
    }
}
