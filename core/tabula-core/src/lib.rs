//! # tabula-core
//!
//! An in-memory, single-process, typed relational table store. Tables hold
//! ordered, typed columns and dense rows of serialized scalar values. Any
//! column can carry a secondary index (hash for equality, B+ tree for
//! equality and ranges) chosen at creation time; row mutations fan out to
//! every index all-or-nothing and roll back on partial failure.
//!
//! ## Quick start
//!
//! ```rust
//! use std::collections::HashMap;
//! use tabula_core::{Column, Database, IndexerKind, TabularType, Value};
//!
//! # fn main() -> tabula_core::TabulaResult<()> {
//! let db = Database::new();
//! db.create_table(
//!     "users",
//!     vec![
//!         Column::new("id", TabularType::Int32, Value::Int32(0), IndexerKind::Hash)?,
//!         Column::new("name", TabularType::String, Value::from(""), IndexerKind::None)?,
//!     ],
//! )?;
//!
//! let users = db.get_table("users")?;
//! users.insert_row(&HashMap::from([
//!     ("id".to_string(), Value::Int32(1)),
//!     ("name".to_string(), Value::from("Alice")),
//! ]))?;
//!
//! let hits = users.find("id", &Value::Int32(1))?;
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].values[1], Value::from("Alice"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Module structure
//! - [`value`]: scalar types, the binary codec, per-type total ordering
//! - [`indexer`]: the [`Indexer`] trait and its hash / B+ tree backends
//! - [`table`]: row store and index-transactional row operations
//! - [`database`]: name-to-table registry
//! - [`error`]: [`TabulaError`] / [`TabulaResult`]
//! - [`logging`]: optional `tracing-subscriber` initialization

pub mod database;
pub mod error;
pub mod indexer;
pub mod logging;
pub mod table;
pub mod value;

// Re-export commonly used types
pub use database::Database;
pub use error::{TabulaError, TabulaResult};
pub use indexer::{BTreeIndexer, HashIndexer, Indexer, IndexerKind};
pub use table::{Column, RowSnapshot, Schema, Table};
pub use value::{Blob, TabularType, Value, compare, deserialize};
