//! Pluggable secondary indexes.
//!
//! An indexer maps serialized column values to the positions of the rows
//! holding them. Each implementation keeps its own reader-writer lock, so
//! every method is callable from any thread through `&self`.

mod btree;
mod hash;

pub use btree::BTreeIndexer;
pub use hash::HashIndexer;

use smallvec::SmallVec;

use crate::error::TabulaResult;
use crate::value::{Blob, TabularType};

/// Row positions carrying one distinct value. Most values map to a handful
/// of rows, so the list stays inline.
pub(crate) type PositionList = SmallVec<[usize; 4]>;

/// Secondary index over `(value, row position)` pairs for one column.
///
/// `find` and `find_in_range` return positions in unspecified order;
/// callers must not assume any.
pub trait Indexer: Send + Sync {
    /// Inserts a mapping. Fails with [`TabulaError::IndexExists`] when the
    /// exact `(value, position)` pair is already present.
    ///
    /// [`TabulaError::IndexExists`]: crate::error::TabulaError::IndexExists
    fn add(&self, value: &Blob, position: usize) -> TabulaResult<()>;

    /// Removes the exact pair. Fails with [`TabulaError::IndexNotFound`]
    /// when it is absent.
    ///
    /// [`TabulaError::IndexNotFound`]: crate::error::TabulaError::IndexNotFound
    fn delete(&self, value: &Blob, position: usize) -> TabulaResult<()>;

    /// Atomically re-keys `position` from `old` to `new`. Values equal
    /// under the type comparator are a no-op success.
    fn update(&self, old: &Blob, new: &Blob, position: usize) -> TabulaResult<()>;

    /// All positions mapped to `value`; empty when none.
    fn find(&self, value: &Blob) -> Vec<usize>;

    /// All positions whose value lies in the closed interval `[min, max]`;
    /// empty when none or when the range is inverted.
    fn find_in_range(&self, min: &Blob, max: &Blob) -> Vec<usize>;

    /// Drops every entry, leaving an empty index of the same kind.
    fn clear(&self);
}

/// Indexer selection made at column-creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexerKind {
    /// No secondary index; queries on the column scan the row vector.
    None,
    /// Equality-only hash index.
    Hash,
    /// Ordered index supporting equality and range lookups.
    BPlusTree,
}

impl IndexerKind {
    /// Builds an indexer instance for a column of type `ty`, or `None` for
    /// [`IndexerKind::None`].
    pub fn build(self, ty: TabularType) -> Option<Box<dyn Indexer>> {
        match self {
            IndexerKind::None => None,
            IndexerKind::Hash => Some(Box::new(HashIndexer::new(ty))),
            IndexerKind::BPlusTree => Some(Box::new(BTreeIndexer::new(ty))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_none_kind() {
        assert!(IndexerKind::None.build(TabularType::Int32).is_none());
    }

    #[test]
    fn test_build_indexed_kinds() {
        assert!(IndexerKind::Hash.build(TabularType::String).is_some());
        assert!(IndexerKind::BPlusTree.build(TabularType::Float64).is_some());
    }
}
