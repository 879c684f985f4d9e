//! Session-scoped SQLite access producing the table snapshots that
//! clustering runs are built from.

use std::collections::BTreeSet;
use std::path::Path;

use log::debug;
use rusqlite::{Connection, OpenFlags};

use crate::error::DatabaseError;
use crate::tuple::Value;

/// Observed domain of one table column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnDomain {
    Numeric { min: f64, max: f64 },
    Categorical { values: BTreeSet<String> },
}

/// One column of a fetched table, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct TableColumn {
    pub name: String,
    pub domain: ColumnDomain,
}

/// Distinct rows of one table plus per-column domain metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSnapshot {
    pub columns: Vec<TableColumn>,
    pub rows: Vec<Vec<Value>>,
}

/// Source of table snapshots for clustering requests.
pub trait TableProvider {
    fn fetch(&self, table: &str) -> Result<TableSnapshot, DatabaseError>;
}

/// Snapshot provider backed by a SQLite database file.
///
/// Every session opens its own provider, so no connection state is shared
/// between concurrent sessions.
#[derive(Debug)]
pub struct SqliteProvider {
    conn: Connection,
}

struct RawColumn {
    name: String,
    numeric: bool,
}

impl SqliteProvider {
    /// Opens the database read-only; a missing file fails as a
    /// connection error.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|source| DatabaseError::Connection {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub(crate) fn in_memory() -> Self {
        Self {
            conn: Connection::open_in_memory().expect("open in-memory database"),
        }
    }

    fn ensure_table_exists(&self, table: &str) -> Result<(), DatabaseError> {
        let present: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )?;
        if present == 0 {
            return Err(DatabaseError::UnknownTable(table.to_string()));
        }
        Ok(())
    }

    fn read_columns(&self, table: &str) -> Result<Vec<RawColumn>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", table))?;
        let columns = stmt
            .query_map([], |row| {
                let name: String = row.get(1)?;
                let decl: Option<String> = row.get(2)?;
                Ok(RawColumn {
                    numeric: is_numeric_decl(decl.as_deref().unwrap_or_default()),
                    name,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    fn read_distinct_rows(
        &self,
        table: &str,
        columns: &[RawColumn],
    ) -> Result<Vec<Vec<Value>>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT DISTINCT * FROM {}", table))?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Vec::with_capacity(columns.len());
            for (i, column) in columns.iter().enumerate() {
                let value = if column.numeric {
                    row.get::<_, Option<f64>>(i)?.map(Value::Continuous)
                } else {
                    row.get::<_, Option<String>>(i)?.map(Value::Discrete)
                };
                match value {
                    Some(v) => record.push(v),
                    None => {
                        return Err(DatabaseError::MissingValue {
                            column: column.name.clone(),
                        });
                    }
                }
            }
            records.push(record);
        }
        Ok(records)
    }

    fn numeric_domain(&self, table: &str, column: &str) -> Result<ColumnDomain, DatabaseError> {
        let quoted = quote_identifier(column);
        let (min, max): (Option<f64>, Option<f64>) = self.conn.query_row(
            &format!("SELECT MIN({0}), MAX({0}) FROM {1}", quoted, table),
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        match (min, max) {
            (Some(min), Some(max)) => Ok(ColumnDomain::Numeric { min, max }),
            _ => Err(DatabaseError::MissingValue {
                column: column.to_string(),
            }),
        }
    }

    fn categorical_domain(&self, table: &str, column: &str) -> Result<ColumnDomain, DatabaseError> {
        let quoted = quote_identifier(column);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT DISTINCT {0} FROM {1} ORDER BY {0}",
            quoted, table
        ))?;
        let mut values = BTreeSet::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            match row.get::<_, Option<String>>(0)? {
                Some(v) => {
                    values.insert(v);
                }
                None => {
                    return Err(DatabaseError::MissingValue {
                        column: column.to_string(),
                    });
                }
            }
        }
        Ok(ColumnDomain::Categorical { values })
    }
}

impl TableProvider for SqliteProvider {
    fn fetch(&self, table: &str) -> Result<TableSnapshot, DatabaseError> {
        validate_table_name(table)?;
        self.ensure_table_exists(table)?;
        let raw = self.read_columns(table)?;
        let rows = self.read_distinct_rows(table, &raw)?;
        if rows.is_empty() {
            return Err(DatabaseError::EmptyTable(table.to_string()));
        }
        let mut columns = Vec::with_capacity(raw.len());
        for column in &raw {
            let domain = if column.numeric {
                self.numeric_domain(table, &column.name)?
            } else {
                self.categorical_domain(table, &column.name)?
            };
            columns.push(TableColumn {
                name: column.name.clone(),
                domain,
            });
        }
        debug!(
            "fetched {} rows across {} columns from {}",
            rows.len(),
            columns.len(),
            table
        );
        Ok(TableSnapshot { columns, rows })
    }
}

/// Table names are interpolated into statements and must be plain
/// identifiers.
fn validate_table_name(table: &str) -> Result<(), DatabaseError> {
    let mut chars = table.chars();
    let head_ok = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    let tail_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if head_ok && tail_ok {
        Ok(())
    } else {
        Err(DatabaseError::InvalidTableName(table.to_string()))
    }
}

/// Declared types carrying these markers hold numbers under SQLite's
/// affinity rules; everything else is treated as categorical.
fn is_numeric_decl(decl: &str) -> bool {
    let upper = decl.to_ascii_uppercase();
    ["INT", "REAL", "FLOA", "DOUB", "NUM", "DEC"]
        .iter()
        .any(|marker| upper.contains(marker))
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
