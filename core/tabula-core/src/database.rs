//! Database registry: named tables under one concurrent map.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::error::{TabulaError, TabulaResult};
use crate::table::{Column, Table};

/// Top-level registry mapping table names to table handles.
///
/// The registry owns its tables for their lifetime; handles returned by
/// [`Database::get_table`] share a table without transferring ownership.
pub struct Database {
    tables: DashMap<String, Arc<Table>>,
}

impl Database {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
        }
    }

    /// Creates a table under `name` with the given schema.
    ///
    /// Fails with [`TabulaError::TableExists`] when the name is taken and
    /// with [`TabulaError::InvalidData`] on a malformed schema.
    pub fn create_table(
        &self,
        name: impl Into<String>,
        columns: Vec<Column>,
    ) -> TabulaResult<()> {
        let name = name.into();
        let table = Table::new(columns)?;
        match self.tables.entry(name) {
            Entry::Occupied(entry) => Err(TabulaError::TableExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                tracing::debug!(table = entry.key().as_str(), "table created");
                entry.insert(Arc::new(table));
                Ok(())
            }
        }
    }

    /// Returns a handle to the named table.
    pub fn get_table(&self, name: &str) -> TabulaResult<Arc<Table>> {
        self.tables
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| TabulaError::TableNotFound(name.to_string()))
    }

    /// Drops the named table together with its columns and indexes.
    pub fn delete_table(&self, name: &str) -> TabulaResult<()> {
        match self.tables.remove(name) {
            Some(_) => {
                tracing::debug!(table = name, "table deleted");
                Ok(())
            }
            None => Err(TabulaError::TableNotFound(name.to_string())),
        }
    }

    /// Whether a table exists under `name`.
    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Names of every table, in unspecified order.
    pub fn list_tables(&self) -> Vec<String> {
        self.tables.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}
