//! Tabular data sources
//!
//! The discovery engine reads the relation only through [`TabularDataSource`].
//! Three backends are provided:
//! - [`InMemoryTable`]: rows held in memory, used by tests and small inputs
//! - [`DataFrameSource`]: a polars `DataFrame` (CSV files load into this)
//! - [`SqliteSource`]: a table inside a SQLite database
//!
//! Every backend treats NULL as an ordinary value: two NULLs agree with each
//! other and disagree with any non-NULL value. This keeps the distinct-count
//! test and the partition test in agreement on every relation.

pub mod frame;
pub mod memory;
pub mod sqlite;

use crate::attribute::{Attribute, AttributeSet};
use crate::error::Result;
use crate::partition::EquivalenceClass;
use serde::{Deserialize, Serialize};

pub use self::frame::DataFrameSource;
pub use self::memory::{InMemoryTable, Value};
pub use self::sqlite::SqliteSource;

/// One group of a grouped distinct-count query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCount {
    /// Distinct values of the target attribute inside the group
    pub distinct_values: u64,
}

/// Read access to one relation snapshot
pub trait TabularDataSource: Send + Sync {
    /// Groups induced by `group_by` holding more than one distinct value of `target`.
    ///
    /// An empty result means `group_by` determines `target`.
    fn distinct_count_groups(
        &self,
        group_by: &AttributeSet,
        target: &Attribute,
    ) -> Result<Vec<GroupCount>>;

    /// Row identifiers grouped by their value tuple on `attributes`
    fn row_partition(&self, attributes: &AttributeSet) -> Result<Vec<EquivalenceClass>>;

    /// Number of rows in the snapshot
    fn row_count(&self) -> Result<usize>;

    /// Short human-readable name for logs
    fn describe(&self) -> String;
}

impl<T: TabularDataSource + ?Sized> TabularDataSource for std::sync::Arc<T> {
    fn distinct_count_groups(
        &self,
        group_by: &AttributeSet,
        target: &Attribute,
    ) -> Result<Vec<GroupCount>> {
        (**self).distinct_count_groups(group_by, target)
    }

    fn row_partition(&self, attributes: &AttributeSet) -> Result<Vec<EquivalenceClass>> {
        (**self).row_partition(attributes)
    }

    fn row_count(&self) -> Result<usize> {
        (**self).row_count()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
