//! Equality-only hash index.

use std::cmp::Ordering;

use ahash::AHashMap;
use parking_lot::RwLock;
use smallvec::smallvec;

use super::{Indexer, PositionList};
use crate::error::{TabulaError, TabulaResult};
use crate::value::{Blob, TabularType, compare};

/// Hash index mapping serialized values to row positions.
///
/// Lookup and mutation are O(1) on the value's byte string. Range queries
/// scan every key with the typed comparator, so range-heavy columns belong
/// on the B+ tree indexer instead.
pub struct HashIndexer {
    ty: TabularType,
    store: RwLock<AHashMap<Blob, PositionList>>,
}

impl HashIndexer {
    /// Creates an empty index for values of type `ty`.
    pub fn new(ty: TabularType) -> Self {
        Self {
            ty,
            store: RwLock::new(AHashMap::new()),
        }
    }
}

impl Indexer for HashIndexer {
    fn add(&self, value: &Blob, position: usize) -> TabulaResult<()> {
        let mut store = self.store.write();
        match store.get_mut(value) {
            Some(positions) => {
                if positions.contains(&position) {
                    return Err(TabulaError::IndexExists(position));
                }
                positions.push(position);
            }
            None => {
                store.insert(value.clone(), smallvec![position]);
            }
        }
        Ok(())
    }

    fn delete(&self, value: &Blob, position: usize) -> TabulaResult<()> {
        let mut store = self.store.write();
        let Some(positions) = store.get_mut(value) else {
            return Err(TabulaError::IndexNotFound(position));
        };
        let Some(i) = positions.iter().position(|&p| p == position) else {
            return Err(TabulaError::IndexNotFound(position));
        };
        positions.remove(i);
        if positions.is_empty() {
            store.remove(value);
        }
        Ok(())
    }

    fn update(&self, old: &Blob, new: &Blob, position: usize) -> TabulaResult<()> {
        if compare(self.ty, old, new) == Ordering::Equal {
            return Ok(());
        }

        // Single critical section: readers never observe the position
        // absent, and a failed update leaves the map untouched.
        let mut store = self.store.write();

        if store.get(new).is_some_and(|ps| ps.contains(&position)) {
            return Err(TabulaError::IndexExists(position));
        }

        let Some(positions) = store.get_mut(old) else {
            return Err(TabulaError::IndexNotFound(position));
        };
        let Some(i) = positions.iter().position(|&p| p == position) else {
            return Err(TabulaError::IndexNotFound(position));
        };
        positions.remove(i);
        if positions.is_empty() {
            store.remove(old);
        }

        store.entry(new.clone()).or_default().push(position);
        Ok(())
    }

    fn find(&self, value: &Blob) -> Vec<usize> {
        self.store
            .read()
            .get(value)
            .map(|positions| positions.to_vec())
            .unwrap_or_default()
    }

    fn find_in_range(&self, min: &Blob, max: &Blob) -> Vec<usize> {
        let store = self.store.read();
        let mut result = Vec::new();
        for (value, positions) in store.iter() {
            if compare(self.ty, value, min) != Ordering::Less
                && compare(self.ty, value, max) != Ordering::Greater
            {
                result.extend_from_slice(positions);
            }
        }
        result
    }

    fn clear(&self) {
        self.store.write().clear();
    }
}
