//! Error types for the tabula engine.
//!
//! All public APIs return `TabulaResult<T>`; no panics in library code.

use thiserror::Error;

use crate::value::TabularType;

/// Unified error type for all tabula operations.
#[derive(Debug, Error)]
pub enum TabulaError {
    /// Registry creation with a name that is already taken
    #[error("table '{0}' already exists")]
    TableExists(String),

    /// Registry get/delete on an unknown name
    #[error("table '{0}' not found")]
    TableNotFound(String),

    /// Row operation referenced an unknown column name
    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    /// Supplied value's runtime type does not match its column
    #[error("type mismatch for column '{column}': expected {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: TabularType,
        actual: TabularType,
    },

    /// Blob cannot be deserialized (truncated or malformed)
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Row position outside the row vector
    #[error("row index {index} out of bounds (row count {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Indexer already holds the exact (value, position) pair
    #[error("index entry already exists for position {0}")]
    IndexExists(usize),

    /// Indexer holds no such (value, position) pair
    #[error("index entry not found for position {0}")]
    IndexNotFound(usize),

    /// Indexer failure wrapped with the operation and column it hit
    #[error("index {op} on column '{column}': {source}")]
    Index {
        op: &'static str,
        column: String,
        #[source]
        source: Box<TabulaError>,
    },

    /// A row operation failed and undoing the completed part failed too
    #[error("operation failed ({source}); rollback failed ({rollback})")]
    RollbackFailed {
        source: Box<TabulaError>,
        rollback: Box<TabulaError>,
    },
}

/// Result type alias for all tabula operations.
pub type TabulaResult<T> = Result<T, TabulaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_table_exists() {
        let err = TabulaError::TableExists("users".to_string());
        assert_eq!(err.to_string(), "table 'users' already exists");
    }

    #[test]
    fn error_display_type_mismatch() {
        let err = TabulaError::TypeMismatch {
            column: "score".to_string(),
            expected: TabularType::Float64,
            actual: TabularType::Int32,
        };
        assert_eq!(
            err.to_string(),
            "type mismatch for column 'score': expected Float64, got Int32"
        );
    }

    #[test]
    fn error_display_out_of_bounds() {
        let err = TabulaError::IndexOutOfBounds { index: 7, len: 3 };
        assert_eq!(err.to_string(), "row index 7 out of bounds (row count 3)");
    }

    #[test]
    fn error_display_wrapped_index_failure() {
        let err = TabulaError::Index {
            op: "add",
            column: "id".to_string(),
            source: Box::new(TabulaError::IndexExists(4)),
        };
        assert_eq!(
            err.to_string(),
            "index add on column 'id': index entry already exists for position 4"
        );
    }

    #[test]
    fn error_display_rollback_failed_keeps_both_causes() {
        let err = TabulaError::RollbackFailed {
            source: Box::new(TabulaError::IndexExists(1)),
            rollback: Box::new(TabulaError::IndexNotFound(2)),
        };
        let text = err.to_string();
        assert!(text.contains("index entry already exists for position 1"));
        assert!(text.contains("index entry not found for position 2"));
    }
}
