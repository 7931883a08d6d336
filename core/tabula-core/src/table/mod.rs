//! Table engine: the row store and its index-transactional row operations.

mod column;
mod coordinator;
mod printer;

pub use column::{Column, Schema};

use std::cmp::Ordering;
use std::collections::HashMap;

use ahash::AHashMap;
use parking_lot::RwLock;
use rayon::prelude::*;

use crate::error::{TabulaError, TabulaResult};
use crate::value::{Blob, Value, compare, deserialize};

/// A materialized, caller-owned query result row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSnapshot {
    /// Position of the row at the time of the query.
    pub position: usize,
    /// Deserialized cell values in schema order.
    pub values: Vec<Value>,
}

/// An in-memory table: an ordered schema and a dense row vector, with
/// per-column secondary indexes kept aligned with the rows.
///
/// All operations take `&self`; a table is shared freely across threads.
/// Mutations hold the row-vector write lock across the index fan-out and
/// the vector edit, and queries hold the read lock across index
/// consultation and materialization, so readers observe either the state
/// before a row operation or after it, never a torn row.
pub struct Table {
    /// Ordered schema; immutable for the table's lifetime.
    columns: Vec<Column>,
    /// Column name to schema position, built once at creation.
    positions: AHashMap<String, usize>,
    /// Dense row vector; each row holds one blob per column.
    rows: RwLock<Vec<Vec<Blob>>>,
}

impl Table {
    /// Creates a table from an ordered column list.
    ///
    /// Fails with [`TabulaError::InvalidData`] on an empty or duplicate
    /// column name.
    pub fn new(columns: Vec<Column>) -> TabulaResult<Self> {
        let mut positions = AHashMap::with_capacity(columns.len());
        for (i, col) in columns.iter().enumerate() {
            if col.name().is_empty() {
                return Err(TabulaError::InvalidData("empty column name".to_string()));
            }
            if positions.insert(col.name().to_string(), i).is_some() {
                return Err(TabulaError::InvalidData(format!(
                    "duplicate column name '{}'",
                    col.name()
                )));
            }
        }
        Ok(Self {
            columns,
            positions,
            rows: RwLock::new(Vec::new()),
        })
    }

    /// The table schema in column order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Number of rows currently stored.
    pub fn row_count(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    fn column_position(&self, name: &str) -> TabulaResult<usize> {
        self.positions
            .get(name)
            .copied()
            .ok_or_else(|| TabulaError::ColumnNotFound(name.to_string()))
    }

    fn check_type(&self, column: &str, ci: usize, value: &Value) -> TabulaResult<()> {
        let expected = self.columns[ci].tabular_type();
        if value.tabular_type() != expected {
            return Err(TabulaError::TypeMismatch {
                column: column.to_string(),
                expected,
                actual: value.tabular_type(),
            });
        }
        Ok(())
    }

    /// Checks every supplied name and value type against the schema,
    /// returning the schema position and serialized form of each value.
    fn validate_values(
        &self,
        values: &HashMap<String, Value>,
    ) -> TabulaResult<Vec<(usize, Blob)>> {
        let mut supplied = Vec::with_capacity(values.len());
        for (name, value) in values {
            let ci = self.column_position(name)?;
            self.check_type(name, ci, value)?;
            supplied.push((ci, value.to_blob()));
        }
        Ok(supplied)
    }

    /// Inserts a row assembled from `values`, falling back to each column's
    /// default for omitted columns.
    pub fn insert_row(&self, values: &HashMap<String, Value>) -> TabulaResult<()> {
        let supplied = self.validate_values(values)?;

        let mut row: Vec<Blob> = self
            .columns
            .iter()
            .map(|col| col.default_blob().clone())
            .collect();
        for (ci, blob) in supplied {
            row[ci] = blob;
        }

        let mut rows = self.rows.write();
        let position = rows.len();
        coordinator::add_row(&self.columns, &row, position)?;
        rows.push(row);
        tracing::debug!(position, "row inserted");
        Ok(())
    }

    /// Returns a deep copy of the stored row at `position`.
    pub fn get_row(&self, position: usize) -> TabulaResult<Vec<Blob>> {
        let rows = self.rows.read();
        rows.get(position).cloned().ok_or(TabulaError::IndexOutOfBounds {
            index: position,
            len: rows.len(),
        })
    }

    /// Overwrites the supplied columns of the row at `position`.
    pub fn update_row(
        &self,
        position: usize,
        values: &HashMap<String, Value>,
    ) -> TabulaResult<()> {
        let supplied = self.validate_values(values)?;

        let mut rows = self.rows.write();
        let len = rows.len();
        let old_row = match rows.get(position) {
            Some(row) => row.clone(),
            None => return Err(TabulaError::IndexOutOfBounds { index: position, len }),
        };

        let mut new_row = old_row.clone();
        for (ci, blob) in supplied {
            new_row[ci] = blob;
        }

        coordinator::update_row(&self.columns, &old_row, &new_row, position)?;
        rows[position] = new_row;
        tracing::debug!(position, "row updated");
        Ok(())
    }

    /// Deletes the row at `position`, shifting every later row down by one
    /// and re-binding their index entries to the shifted positions.
    pub fn delete_row(&self, position: usize) -> TabulaResult<()> {
        let mut rows = self.rows.write();
        let len = rows.len();
        if position >= len {
            return Err(TabulaError::IndexOutOfBounds { index: position, len });
        }

        coordinator::delete_row(&self.columns, &rows[position], position)?;

        // Later rows shift down by one; their index entries must follow.
        let mut rebind_failed = false;
        for i in position + 1..len {
            let row = &rows[i];
            let rebound = coordinator::delete_row(&self.columns, row, i)
                .and_then(|_| coordinator::add_row(&self.columns, row, i - 1));
            if let Err(err) = rebound {
                tracing::warn!(row = i, error = %err, "re-bind failed during delete, rebuilding indexes");
                rebind_failed = true;
                break;
            }
        }

        rows.remove(position);
        tracing::debug!(position, "row deleted");

        if rebind_failed {
            self.rebuild_indexes(&rows)?;
        }
        Ok(())
    }

    /// Rows whose `column` value equals `value`.
    pub fn find(&self, column: &str, value: &Value) -> TabulaResult<Vec<RowSnapshot>> {
        let ci = self.column_position(column)?;
        self.check_type(column, ci, value)?;
        let target = value.to_blob();

        let rows = self.rows.read();
        let positions = match self.columns[ci].indexer() {
            Some(indexer) => indexer.find(&target),
            None => {
                let ty = self.columns[ci].tabular_type();
                rows.par_iter()
                    .enumerate()
                    .filter(|(_, row)| compare(ty, &row[ci], &target) == Ordering::Equal)
                    .map(|(position, _)| position)
                    .collect()
            }
        };
        self.materialize(&rows, positions)
    }

    /// Rows whose `column` value lies in the closed interval `[min, max]`.
    ///
    /// An inverted range yields no rows.
    pub fn find_in_range(
        &self,
        column: &str,
        min: &Value,
        max: &Value,
    ) -> TabulaResult<Vec<RowSnapshot>> {
        let ci = self.column_position(column)?;
        self.check_type(column, ci, min)?;
        self.check_type(column, ci, max)?;
        let lo = min.to_blob();
        let hi = max.to_blob();

        let rows = self.rows.read();
        let positions = match self.columns[ci].indexer() {
            Some(indexer) => indexer.find_in_range(&lo, &hi),
            None => {
                let ty = self.columns[ci].tabular_type();
                rows.par_iter()
                    .enumerate()
                    .filter(|(_, row)| {
                        compare(ty, &row[ci], &lo) != Ordering::Less
                            && compare(ty, &row[ci], &hi) != Ordering::Greater
                    })
                    .map(|(position, _)| position)
                    .collect()
            }
        };
        self.materialize(&rows, positions)
    }

    /// Rebuilds every column's index from the current rows.
    ///
    /// Recovery hook for the case where a coordinator rollback failed and
    /// left some index out of step with the row vector.
    pub fn restore_indexing(&self) -> TabulaResult<()> {
        let rows = self.rows.write();
        self.rebuild_indexes(&rows)
    }

    /// Snapshots every stored row.
    pub fn scan(&self) -> TabulaResult<Vec<RowSnapshot>> {
        let rows = self.rows.read();
        let all = (0..rows.len()).collect();
        self.materialize(&rows, all)
    }

    fn rebuild_indexes(&self, rows: &[Vec<Blob>]) -> TabulaResult<()> {
        for col in &self.columns {
            if let Some(indexer) = col.indexer() {
                indexer.clear();
            }
        }
        for (position, row) in rows.iter().enumerate() {
            coordinator::add_row(&self.columns, row, position)?;
        }
        tracing::debug!(rows = rows.len(), "indexes rebuilt");
        Ok(())
    }

    fn materialize(
        &self,
        rows: &[Vec<Blob>],
        positions: Vec<usize>,
    ) -> TabulaResult<Vec<RowSnapshot>> {
        positions
            .into_iter()
            .map(|position| {
                let row = rows.get(position).ok_or(TabulaError::IndexOutOfBounds {
                    index: position,
                    len: rows.len(),
                })?;
                let values = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(col, blob)| deserialize(col.tabular_type(), blob))
                    .collect::<TabulaResult<Vec<Value>>>()?;
                Ok(RowSnapshot { position, values })
            })
            .collect()
    }
}
