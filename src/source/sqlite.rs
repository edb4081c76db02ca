//! SQLite-backed relation
//!
//! Issues the grouped `COUNT(DISTINCT ...)` query directly for the naive
//! strategy, and ranks rows by their value tuple with `DENSE_RANK()` to read
//! partitions back as native row identifiers.

use super::{GroupCount, TabularDataSource};
use crate::attribute::{Attribute, AttributeSet};
use crate::error::{FdError, Result};
use crate::partition::{EquivalenceClass, RowId};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Default surrogate key: SQLite's implicit rowid
pub const DEFAULT_ROW_ID: &str = "rowid";

/// Relation stored in one SQLite table
#[derive(Debug)]
pub struct SqliteSource {
    db: Mutex<Connection>,
    table: String,
    row_id: String,
    /// Schema read once when the source is created
    table_columns: Vec<String>,
}

impl SqliteSource {
    /// Open a database file
    pub fn open(path: impl AsRef<Path>, table: &str, row_id: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening SQLite relation {:?}, table '{}'", path, table);

        let db = Connection::open(path).map_err(|e| {
            FdError::DataSource(format!("Failed to open database {:?}: {}", path, e))
        })?;
        Self::from_connection(db, table, row_id)
    }

    /// Use an existing connection (e.g. an in-memory database)
    ///
    /// A row-id column other than SQLite's implicit rowid must exist and be
    /// non-null and unique.
    pub fn from_connection(db: Connection, table: &str, row_id: Option<&str>) -> Result<Self> {
        let table_columns = read_table_columns(&db, table)?;
        if table_columns.is_empty() {
            return Err(FdError::DataSource(format!(
                "Table '{}' does not exist or has no columns",
                table
            )));
        }

        let source = Self {
            db: Mutex::new(db),
            table: table.to_string(),
            row_id: row_id.unwrap_or(DEFAULT_ROW_ID).to_string(),
            table_columns,
        };

        if !source.is_rowid_alias() {
            source.check_row_id()?;
        }

        Ok(source)
    }

    /// Column names of the table, excluding the row identifier
    pub fn columns(&self) -> Result<Vec<String>> {
        Ok(self
            .table_columns
            .iter()
            .filter(|name| !name.eq_ignore_ascii_case(&self.row_id))
            .cloned()
            .collect())
    }

    fn has_column(&self, name: &str) -> bool {
        self.table_columns
            .iter()
            .any(|column| column.eq_ignore_ascii_case(name))
    }

    /// Attributes must be real columns; a quoted unknown name would otherwise
    /// be read as a string literal.
    fn ensure_columns<'a>(
        &self,
        attributes: impl IntoIterator<Item = &'a Attribute>,
    ) -> Result<()> {
        for attribute in attributes {
            let name = attribute.name();
            if name.eq_ignore_ascii_case(&self.row_id) || !self.has_column(name) {
                return Err(FdError::UnknownAttribute(name.to_string()));
            }
        }
        Ok(())
    }

    fn check_row_id(&self) -> Result<()> {
        if !self.has_column(&self.row_id) {
            return Err(FdError::UnknownAttribute(format!(
                "row id column '{}'",
                self.row_id
            )));
        }

        let sql = format!(
            "SELECT COUNT(*) - COUNT({rid}), COUNT({rid}) - COUNT(DISTINCT {rid}), \
             COALESCE(SUM(typeof({rid}) NOT IN ('integer', 'null')), 0) FROM {table}",
            rid = quote_ident(&self.row_id),
            table = quote_ident(&self.table),
        );
        let (nulls, duplicates, non_integer): (i64, i64, i64) = self
            .lock()?
            .query_row(&sql, [], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .map_err(|e| FdError::DataSource(format!("Query '{}' failed: {}", sql, e)))?;

        if nulls > 0 {
            return Err(FdError::DataSource(format!(
                "Row id column '{}' contains NULL values",
                self.row_id
            )));
        }
        if duplicates > 0 {
            return Err(FdError::DataSource(format!(
                "Row id column '{}' is not unique",
                self.row_id
            )));
        }
        if non_integer > 0 {
            return Err(FdError::DataSource(format!(
                "Row id column '{}' holds non-integer values",
                self.row_id
            )));
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| FdError::DataSource("SQLite connection lock poisoned".to_string()))
    }

    fn is_rowid_alias(&self) -> bool {
        ["rowid", "oid", "_rowid_"]
            .iter()
            .any(|alias| self.row_id.eq_ignore_ascii_case(alias))
    }

    fn row_id_expr(&self) -> String {
        // Quoting an implicit rowid alias would turn it into a string literal
        if self.is_rowid_alias() {
            self.row_id.clone()
        } else {
            quote_ident(&self.row_id)
        }
    }

    fn column_list(attributes: &AttributeSet) -> String {
        attributes
            .iter()
            .map(|a| quote_ident(a.name()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn read_table_columns(db: &Connection, table: &str) -> Result<Vec<String>> {
    let sql = format!("PRAGMA table_info({})", quote_ident(table));
    let schema_error = |e: rusqlite::Error| {
        FdError::DataSource(format!("Failed to read schema of '{}': {}", table, e))
    };

    let mut stmt = db.prepare(&sql).map_err(schema_error)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(schema_error)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl TabularDataSource for SqliteSource {
    fn distinct_count_groups(
        &self,
        group_by: &AttributeSet,
        target: &Attribute,
    ) -> Result<Vec<GroupCount>> {
        self.ensure_columns(group_by.iter().chain(std::iter::once(target)))?;

        let target = quote_ident(target.name());
        // NULL counts as one more distinct value
        let distinct = format!("COUNT(DISTINCT {t}) + MAX({t} IS NULL)", t = target);
        let sql = format!(
            "SELECT {distinct} FROM {table} GROUP BY {keys} HAVING {distinct} > 1",
            distinct = distinct,
            table = quote_ident(&self.table),
            keys = Self::column_list(group_by),
        );
        debug!("{}", sql);

        let db = self.lock()?;
        let mut stmt = db
            .prepare(&sql)
            .map_err(|e| FdError::DataSource(format!("Failed to prepare '{}': {}", sql, e)))?;
        let counts = stmt
            .query_map([], |row| row.get::<_, i64>(0))
            .map_err(|e| FdError::DataSource(format!("Query '{}' failed: {}", sql, e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| FdError::DataSource(format!("Query '{}' failed: {}", sql, e)))?;

        Ok(counts
            .into_iter()
            .map(|n| GroupCount {
                distinct_values: n.max(0) as u64,
            })
            .collect())
    }

    fn row_partition(&self, attributes: &AttributeSet) -> Result<Vec<EquivalenceClass>> {
        self.ensure_columns(attributes)?;

        let sql = format!(
            "SELECT {rid}, DENSE_RANK() OVER (ORDER BY {keys}) AS class \
             FROM {table} ORDER BY class",
            rid = self.row_id_expr(),
            keys = Self::column_list(attributes),
            table = quote_ident(&self.table),
        );
        debug!("{}", sql);

        let db = self.lock()?;
        let mut stmt = db
            .prepare(&sql)
            .map_err(|e| FdError::DataSource(format!("Failed to prepare '{}': {}", sql, e)))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))
            .map_err(|e| FdError::DataSource(format!("Query '{}' failed: {}", sql, e)))?;

        let mut classes: Vec<EquivalenceClass> = Vec::new();
        let mut current = None;
        for row in rows {
            let (id, class) =
                row.map_err(|e| FdError::DataSource(format!("Query '{}' failed: {}", sql, e)))?;
            if current != Some(class) {
                classes.push(EquivalenceClass::new());
                current = Some(class);
            }
            if let Some(last) = classes.last_mut() {
                last.insert(RowId(id));
            }
        }

        Ok(classes)
    }

    fn row_count(&self) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(&self.table));
        let db = self.lock()?;
        let count: i64 = db
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| FdError::DataSource(format!("Query '{}' failed: {}", sql, e)))?;
        Ok(count.max(0) as usize)
    }

    fn describe(&self) -> String {
        format!("sqlite table '{}'", self.table)
    }
}
