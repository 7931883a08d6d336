//! Ordered B+ tree index.
//!
//! A multiway search tree whose nodes hold sorted *bunches*, a bunch being
//! one serialized value together with every row position carrying it. Keys
//! live in internal nodes and leaves alike; lookups binary-search each node
//! on the way down and range queries walk the tree in order. The whole
//! tree sits behind a single reader-writer lock.

use std::cmp::Ordering;

use parking_lot::RwLock;
use smallvec::smallvec;

use super::{Indexer, PositionList};
use crate::error::{TabulaError, TabulaResult};
use crate::value::{Blob, TabularType, compare};

/// Sizing heuristic for the default fanout: one node should roughly fill a
/// page, each bunch costing a key plus a child pointer.
const TARGET_PAGE_BYTES: usize = 4096;
const KEY_PTR_BYTES: usize = 16;
const NODE_OVERHEAD_BYTES: usize = 64;

/// Smallest degree for which splits and merges stay well-defined.
const MIN_DEGREE: usize = 3;

fn default_degree() -> usize {
    (TARGET_PAGE_BYTES - NODE_OVERHEAD_BYTES) / KEY_PTR_BYTES
}

/// One distinct value and the positions of every row carrying it.
struct Bunch {
    value: Blob,
    positions: PositionList,
}

struct Node {
    bunches: Vec<Bunch>,
    /// Empty for leaves; otherwise holds `bunches.len() + 1` subtrees.
    children: Vec<Box<Node>>,
}

impl Node {
    fn leaf() -> Self {
        Self {
            bunches: Vec::new(),
            children: Vec::new(),
        }
    }

    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

struct Tree {
    ty: TabularType,
    degree: usize,
    root: Option<Box<Node>>,
}

/// Ordered index over serialized values, supporting exact and closed-range
/// lookup with the column's typed comparator.
pub struct BTreeIndexer {
    inner: RwLock<Tree>,
}

impl BTreeIndexer {
    /// Creates an index for values of type `ty` with the page-heuristic
    /// default fanout.
    pub fn new(ty: TabularType) -> Self {
        Self {
            inner: RwLock::new(Tree {
                ty,
                degree: default_degree(),
                root: None,
            }),
        }
    }

    /// Creates an index with an explicit fanout.
    ///
    /// Fails with [`TabulaError::InvalidData`] when `degree < 3`.
    pub fn with_degree(ty: TabularType, degree: usize) -> TabulaResult<Self> {
        if degree < MIN_DEGREE {
            return Err(TabulaError::InvalidData(format!(
                "b+ tree degree must be at least {MIN_DEGREE}, got {degree}"
            )));
        }
        Ok(Self {
            inner: RwLock::new(Tree {
                ty,
                degree,
                root: None,
            }),
        })
    }
}

impl Indexer for BTreeIndexer {
    fn add(&self, value: &Blob, position: usize) -> TabulaResult<()> {
        self.inner.write().add(value, position)
    }

    fn delete(&self, value: &Blob, position: usize) -> TabulaResult<()> {
        self.inner.write().delete(value, position)
    }

    fn update(&self, old: &Blob, new: &Blob, position: usize) -> TabulaResult<()> {
        self.inner.write().update(old, new, position)
    }

    fn find(&self, value: &Blob) -> Vec<usize> {
        self.inner.read().find(value)
    }

    fn find_in_range(&self, min: &Blob, max: &Blob) -> Vec<usize> {
        self.inner.read().find_in_range(min, max)
    }

    fn clear(&self) {
        self.inner.write().root = None;
    }
}

impl Tree {
    /// Bunch count below which a non-root node underflows.
    fn min_bunches(&self) -> usize {
        (self.degree - 1) / 2
    }

    fn add(&mut self, value: &Blob, position: usize) -> TabulaResult<()> {
        let ty = self.ty;
        let degree = self.degree;

        match &mut self.root {
            None => {
                let mut root = Node::leaf();
                root.bunches.push(Bunch {
                    value: value.clone(),
                    positions: smallvec![position],
                });
                self.root = Some(Box::new(root));
                return Ok(());
            }
            Some(root) => {
                // An existing bunch absorbs the position wherever it lives.
                if let Some(result) = append_existing(ty, root, value, position) {
                    return result;
                }
                insert_descend(ty, degree, root, value.clone(), position);
            }
        }

        let root_full = self
            .root
            .as_ref()
            .is_some_and(|root| root.bunches.len() == degree);
        if root_full {
            if let Some(mut old_root) = self.root.take() {
                let (promoted, right) = split_node(&mut old_root);
                self.root = Some(Box::new(Node {
                    bunches: vec![promoted],
                    children: vec![old_root, right],
                }));
            }
        }
        Ok(())
    }

    fn delete(&mut self, value: &Blob, position: usize) -> TabulaResult<()> {
        let ty = self.ty;
        let min = self.min_bunches();

        let root_empty = match self.root.as_deref_mut() {
            None => return Err(TabulaError::IndexNotFound(position)),
            Some(root) => {
                remove_from(ty, min, root, value, position)?;
                root.bunches.is_empty()
            }
        };

        if root_empty {
            if let Some(mut old_root) = self.root.take() {
                if !old_root.children.is_empty() {
                    // Height shrinks; the single child becomes the root.
                    self.root = Some(old_root.children.remove(0));
                }
            }
        }
        Ok(())
    }

    fn update(&mut self, old: &Blob, new: &Blob, position: usize) -> TabulaResult<()> {
        if compare(self.ty, old, new) == Ordering::Equal {
            return Ok(());
        }
        self.delete(old, position)?;
        if let Err(err) = self.add(new, position) {
            // Re-seat the old entry so a failed update leaves the tree
            // exactly as it was.
            return match self.add(old, position) {
                Ok(()) => Err(err),
                Err(rollback) => Err(TabulaError::RollbackFailed {
                    source: Box::new(err),
                    rollback: Box::new(rollback),
                }),
            };
        }
        Ok(())
    }

    fn find(&self, value: &Blob) -> Vec<usize> {
        let mut node = match &self.root {
            Some(root) => root.as_ref(),
            None => return Vec::new(),
        };
        loop {
            let i = lower_bound(self.ty, &node.bunches, value);
            if i < node.bunches.len()
                && compare(self.ty, &node.bunches[i].value, value) == Ordering::Equal
            {
                return node.bunches[i].positions.to_vec();
            }
            if node.is_leaf() {
                return Vec::new();
            }
            node = node.children[i].as_ref();
        }
    }

    fn find_in_range(&self, min: &Blob, max: &Blob) -> Vec<usize> {
        let mut out = Vec::new();
        if compare(self.ty, min, max) == Ordering::Greater {
            return out;
        }
        if let Some(root) = &self.root {
            collect_range(self.ty, root, min, max, &mut out);
        }
        out
    }
}

/// First bunch index whose value is not below `value`.
fn lower_bound(ty: TabularType, bunches: &[Bunch], value: &Blob) -> usize {
    bunches.partition_point(|bunch| compare(ty, &bunch.value, value) == Ordering::Less)
}

/// Appends `position` to the bunch already holding `value`, wherever it
/// lives in the subtree. `None` means the value is not present.
fn append_existing(
    ty: TabularType,
    node: &mut Node,
    value: &Blob,
    position: usize,
) -> Option<TabulaResult<()>> {
    let i = lower_bound(ty, &node.bunches, value);
    if i < node.bunches.len() && compare(ty, &node.bunches[i].value, value) == Ordering::Equal {
        let bunch = &mut node.bunches[i];
        if bunch.positions.contains(&position) {
            return Some(Err(TabulaError::IndexExists(position)));
        }
        bunch.positions.push(position);
        return Some(Ok(()));
    }
    if node.is_leaf() {
        return None;
    }
    append_existing(ty, &mut node.children[i], value, position)
}

/// Inserts a fresh bunch into the subtree's covering leaf, splitting full
/// children on the way back up. The caller splits the root if needed.
fn insert_descend(ty: TabularType, degree: usize, node: &mut Node, value: Blob, position: usize) {
    let i = lower_bound(ty, &node.bunches, &value);
    if node.is_leaf() {
        node.bunches.insert(
            i,
            Bunch {
                value,
                positions: smallvec![position],
            },
        );
        return;
    }
    insert_descend(ty, degree, &mut node.children[i], value, position);
    if node.children[i].bunches.len() == degree {
        let (promoted, right) = split_node(&mut node.children[i]);
        node.bunches.insert(i, promoted);
        node.children.insert(i + 1, right);
    }
}

/// Splits a full node at its middle bunch. The node keeps the left half;
/// the middle bunch and the new right sibling are returned for the parent.
fn split_node(node: &mut Node) -> (Bunch, Box<Node>) {
    let mid = (node.bunches.len() - 1) / 2;
    let mut right_bunches = node.bunches.split_off(mid);
    let promoted = right_bunches.remove(0);
    let right_children = if node.is_leaf() {
        Vec::new()
    } else {
        node.children.split_off(mid + 1)
    };
    let right = Box::new(Node {
        bunches: right_bunches,
        children: right_children,
    });
    (promoted, right)
}

/// Removes `position` from the bunch holding `value` in this subtree,
/// dropping the bunch when its position list empties and rebalancing
/// children on the way back up.
fn remove_from(
    ty: TabularType,
    min: usize,
    node: &mut Node,
    value: &Blob,
    position: usize,
) -> TabulaResult<()> {
    let i = lower_bound(ty, &node.bunches, value);
    let here =
        i < node.bunches.len() && compare(ty, &node.bunches[i].value, value) == Ordering::Equal;

    if here {
        let bunch = &mut node.bunches[i];
        let Some(p) = bunch.positions.iter().position(|&p| p == position) else {
            return Err(TabulaError::IndexNotFound(position));
        };
        bunch.positions.remove(p);
        if !bunch.positions.is_empty() {
            return Ok(());
        }
        if node.is_leaf() {
            node.bunches.remove(i);
            return Ok(());
        }
        // Spent bunch in an internal node: substitute its in-order
        // predecessor, which lives in a leaf of the left subtree, keeping
        // the search order intact.
        match remove_max(min, &mut node.children[i]) {
            Some(predecessor) => node.bunches[i] = predecessor,
            None => {
                // Empty left subtree; collapse it with the spent bunch.
                node.bunches.remove(i);
                node.children.remove(i);
                return Ok(());
            }
        }
        rebalance_child(min, node, i);
        return Ok(());
    }

    if node.is_leaf() {
        return Err(TabulaError::IndexNotFound(position));
    }

    remove_from(ty, min, &mut node.children[i], value, position)?;
    rebalance_child(min, node, i);
    Ok(())
}

/// Detaches and returns the rightmost bunch of the subtree.
fn remove_max(min: usize, node: &mut Node) -> Option<Bunch> {
    if node.is_leaf() {
        return node.bunches.pop();
    }
    let last = node.children.len() - 1;
    let bunch = remove_max(min, &mut node.children[last]);
    rebalance_child(min, node, last);
    bunch
}

/// Restores the minimum bunch count of `parent.children[i]` after a
/// removal below it, borrowing from a sibling through the parent separator
/// or merging with one.
fn rebalance_child(min: usize, parent: &mut Node, i: usize) {
    if parent.children[i].bunches.len() >= min {
        return;
    }

    if i > 0 && parent.children[i - 1].bunches.len() > min {
        // Rotate the left sibling's greatest bunch through the separator.
        let left = &mut parent.children[i - 1];
        let spare_bunch = left.bunches.pop();
        let spare_child = left.children.pop();
        if let Some(spare) = spare_bunch {
            let separator = std::mem::replace(&mut parent.bunches[i - 1], spare);
            let child = &mut parent.children[i];
            child.bunches.insert(0, separator);
            if let Some(subtree) = spare_child {
                child.children.insert(0, subtree);
            }
        }
        return;
    }

    if i + 1 < parent.children.len() && parent.children[i + 1].bunches.len() > min {
        // Rotate the right sibling's least bunch through the separator.
        let right = &mut parent.children[i + 1];
        let spare_bunch = if right.bunches.is_empty() {
            None
        } else {
            Some(right.bunches.remove(0))
        };
        let spare_child = if right.children.is_empty() {
            None
        } else {
            Some(right.children.remove(0))
        };
        if let Some(spare) = spare_bunch {
            let separator = std::mem::replace(&mut parent.bunches[i], spare);
            let child = &mut parent.children[i];
            child.bunches.push(separator);
            if let Some(subtree) = spare_child {
                child.children.push(subtree);
            }
        }
        return;
    }

    // No sibling can lend; merge with one, pulling the separator down.
    if i > 0 {
        merge_children(parent, i - 1);
    } else if i + 1 < parent.children.len() {
        merge_children(parent, i);
    }
}

/// Merges `children[i + 1]` into `children[i]` with separator `bunches[i]`
/// pulled down between them.
fn merge_children(parent: &mut Node, i: usize) {
    let separator = parent.bunches.remove(i);
    let Node { bunches, children } = *parent.children.remove(i + 1);
    let left = &mut parent.children[i];
    left.bunches.push(separator);
    left.bunches.extend(bunches);
    left.children.extend(children);
}

/// In-order sweep of the subtree for positions in `[min, max]`.
fn collect_range(ty: TabularType, node: &Node, min: &Blob, max: &Blob, out: &mut Vec<usize>) {
    let start = lower_bound(ty, &node.bunches, min);
    for i in start..node.bunches.len() {
        if !node.is_leaf() {
            collect_range(ty, &node.children[i], min, max, out);
        }
        if compare(ty, &node.bunches[i].value, max) == Ordering::Greater {
            return;
        }
        out.extend_from_slice(&node.bunches[i].positions);
    }
    if !node.is_leaf() {
        collect_range(ty, &node.children[node.bunches.len()], min, max, out);
    }
}
