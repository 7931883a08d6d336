//! Column definitions.

use std::fmt;

use crate::error::{TabulaError, TabulaResult};
use crate::indexer::{Indexer, IndexerKind};
use crate::value::{Blob, TabularType, Value};

/// Ordered, immutable column list defining a table.
pub type Schema = Vec<Column>;

/// A named, typed slot in a table schema.
///
/// The column owns its secondary index (if any) and the serialized default
/// used whenever an insert omits the column. Name and type never change
/// after construction.
pub struct Column {
    name: String,
    ty: TabularType,
    default: Blob,
    kind: IndexerKind,
    indexer: Option<Box<dyn Indexer>>,
}

impl Column {
    /// Creates a column with the given default value and indexer kind.
    ///
    /// Fails with [`TabulaError::TypeMismatch`] when the default value's
    /// runtime type disagrees with `ty`.
    pub fn new(
        name: impl Into<String>,
        ty: TabularType,
        default: Value,
        kind: IndexerKind,
    ) -> TabulaResult<Self> {
        let name = name.into();
        if default.tabular_type() != ty {
            return Err(TabulaError::TypeMismatch {
                column: name,
                expected: ty,
                actual: default.tabular_type(),
            });
        }
        Ok(Self {
            default: default.to_blob(),
            indexer: kind.build(ty),
            name,
            ty,
            kind,
        })
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared scalar type.
    pub fn tabular_type(&self) -> TabularType {
        self.ty
    }

    /// Indexer selection made at creation time.
    pub fn indexer_kind(&self) -> IndexerKind {
        self.kind
    }

    /// Serialized default value.
    pub fn default_blob(&self) -> &Blob {
        &self.default
    }

    /// The owned indexer instance, absent for [`IndexerKind::None`].
    pub(crate) fn indexer(&self) -> Option<&dyn Indexer> {
        self.indexer.as_deref()
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("kind", &self.kind)
            .finish()
    }
}
