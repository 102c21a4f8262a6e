//! Arena-allocated B-tree index.

use crate::config::DEFAULT_MIN_DEGREE;
use crate::error::{CoreError, CoreResult};
use crate::index::traits::{Index, IndexKey, RangeIndex};
use crate::types::Offset;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

type NodeId = usize;

/// One tree node: sorted `(key, offset)` entries and, if internal, one
/// more child than entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Node<K> {
    keys: Vec<(K, Offset)>,
    children: Vec<NodeId>,
}

impl<K> Node<K> {
    fn leaf() -> Self {
        Self {
            keys: Vec::new(),
            children: Vec::new(),
        }
    }

    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// B-tree index for ordered traversal and range queries.
///
/// `BTreeIndex` maps an ordered key (a release year, a record id) to the
/// offsets of every record carrying it. Keys are not unique: equal keys
/// are kept side by side and a new key lands after the existing equal keys
/// of the node it is inserted into.
///
/// Nodes live in an arena and refer to each other by position, so the
/// whole tree serializes as a flat list.
///
/// # Structure
///
/// With minimum degree `t`:
/// - every node except the root holds between `t - 1` and `2t - 1` keys
/// - an internal node with `n` keys has `n + 1` children
/// - keys in child `i` are `<=` key `i`, keys in child `i + 1` are `>=` key `i`
/// - all leaves are at the same depth
///
/// # Example
///
/// ```rust
/// use cinedex_core::{BTreeIndex, Index, Offset, RangeIndex};
///
/// let mut years: BTreeIndex<i32> = BTreeIndex::new(3)?;
/// years.insert(1910, Offset::new(0));
/// years.insert(1912, Offset::new(234));
///
/// assert_eq!(years.range_lookup(&1900, &1911), vec![Offset::new(0)]);
/// # Ok::<(), cinedex_core::CoreError>(())
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BTreeIndex<K> {
    min_degree: usize,
    root: NodeId,
    len: usize,
    nodes: Vec<Node<K>>,
}

impl<K: IndexKey> Default for BTreeIndex<K> {
    fn default() -> Self {
        Self::empty(DEFAULT_MIN_DEGREE)
    }
}

impl<K: IndexKey> BTreeIndex<K> {
    /// Creates an empty tree with minimum degree `t`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if `t < 2`.
    pub fn new(min_degree: usize) -> CoreResult<Self> {
        if min_degree < 2 {
            return Err(CoreError::invalid_config(format!(
                "B-tree minimum degree must be at least 2, got {min_degree}"
            )));
        }
        Ok(Self::empty(min_degree))
    }

    fn empty(min_degree: usize) -> Self {
        Self {
            min_degree,
            root: 0,
            len: 0,
            nodes: vec![Node::leaf()],
        }
    }

    /// Builds a tree from `(key, offset)` pairs, inserted in order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if `t < 2`.
    pub fn from_entries<I>(min_degree: usize, entries: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = (K, Offset)>,
    {
        let mut tree = Self::new(min_degree)?;
        for (key, offset) in entries {
            tree.insert(key, offset);
        }
        Ok(tree)
    }

    /// Returns the minimum degree `t`.
    #[must_use]
    pub fn min_degree(&self) -> usize {
        self.min_degree
    }

    /// Returns the number of levels (1 for a lone root).
    #[must_use]
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut node = &self.nodes[self.root];
        while let Some(&child) = node.children.first() {
            height += 1;
            node = &self.nodes[child];
        }
        height
    }

    /// Returns the number of allocated nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the smallest key.
    #[must_use]
    pub fn min_key(&self) -> Option<&K> {
        let mut node = &self.nodes[self.root];
        while let Some(&child) = node.children.first() {
            node = &self.nodes[child];
        }
        node.keys.first().map(|(key, _)| key)
    }

    /// Returns the largest key.
    #[must_use]
    pub fn max_key(&self) -> Option<&K> {
        let mut node = &self.nodes[self.root];
        while let Some(&child) = node.children.last() {
            node = &self.nodes[child];
        }
        node.keys.last().map(|(key, _)| key)
    }

    /// Returns the offsets stored under `key`, deduplicated.
    #[must_use]
    pub fn search(&self, key: &K) -> Vec<Offset> {
        self.search_range(key, key)
    }

    /// Returns the offsets of every key in `min..=max` in key order,
    /// deduplicated. Empty when `min > max`.
    #[must_use]
    pub fn search_range(&self, min: &K, max: &K) -> Vec<Offset> {
        if min > max {
            return Vec::new();
        }
        let mut found = Vec::new();
        self.collect_range(self.root, min, max, &mut found);

        let mut seen = HashSet::with_capacity(found.len());
        found.retain(|offset| seen.insert(*offset));
        found
    }

    /// Walks only the subtrees that can hold keys in `min..=max`.
    fn collect_range(&self, id: NodeId, min: &K, max: &K, out: &mut Vec<Offset>) {
        let node = &self.nodes[id];
        let lo = node.keys.partition_point(|(k, _)| k < min);
        let hi = node.keys.partition_point(|(k, _)| k <= max);

        if node.is_leaf() {
            out.extend(node.keys[lo..hi].iter().map(|(_, offset)| *offset));
            return;
        }
        for i in lo..=hi {
            self.collect_range(node.children[i], min, max, out);
            if i < hi {
                out.push(node.keys[i].1);
            }
        }
    }

    /// Iterates every `(key, offset)` entry in key order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K> {
        let mut iter = Iter {
            tree: self,
            stack: Vec::new(),
        };
        iter.descend(self.root);
        iter
    }

    fn max_keys(&self) -> usize {
        2 * self.min_degree - 1
    }

    fn alloc(&mut self, node: Node<K>) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn insert_entry(&mut self, key: K, offset: Offset) {
        let root = self.root;
        if self.nodes[root].keys.len() == self.max_keys() {
            let new_root = self.alloc(Node {
                keys: Vec::new(),
                children: vec![root],
            });
            self.root = new_root;
            self.split_child(new_root, 0);
        }
        self.insert_non_full(self.root, key, offset);
        self.len += 1;
    }

    /// Descends from a non-full node, splitting full children on the way.
    fn insert_non_full(&mut self, mut id: NodeId, key: K, offset: Offset) {
        loop {
            let mut pos = self.nodes[id].keys.partition_point(|(k, _)| k <= &key);
            if self.nodes[id].is_leaf() {
                self.nodes[id].keys.insert(pos, (key, offset));
                return;
            }

            let child = self.nodes[id].children[pos];
            if self.nodes[child].keys.len() == self.max_keys() {
                self.split_child(id, pos);
                if self.nodes[id].keys[pos].0 <= key {
                    pos += 1;
                }
            }
            id = self.nodes[id].children[pos];
        }
    }

    /// Splits the full child `i` of `parent`, promoting its middle key.
    fn split_child(&mut self, parent: NodeId, i: usize) {
        let t = self.min_degree;
        let child = self.nodes[parent].children[i];

        let mut upper = self.nodes[child].keys.split_off(t - 1);
        let middle = upper.remove(0);
        let children = if self.nodes[child].is_leaf() {
            Vec::new()
        } else {
            self.nodes[child].children.split_off(t)
        };

        let sibling = self.alloc(Node {
            keys: upper,
            children,
        });
        let parent = &mut self.nodes[parent];
        parent.keys.insert(i, middle);
        parent.children.insert(i + 1, sibling);
    }

    /// Checks every structural invariant of the tree.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexCorruption`] describing the first violation.
    pub fn validate(&self) -> CoreResult<()> {
        if self.min_degree < 2 {
            return Err(CoreError::index_corruption(format!(
                "minimum degree {} is below 2",
                self.min_degree
            )));
        }
        if self.root >= self.nodes.len() {
            return Err(CoreError::index_corruption("root is not an allocated node"));
        }

        let mut check = Validation {
            visited: vec![false; self.nodes.len()],
            leaf_depth: None,
            entries: 0,
        };
        self.validate_node(self.root, None, None, 0, &mut check)?;

        if check.entries != self.len {
            return Err(CoreError::index_corruption(format!(
                "tree holds {} entries but records length {}",
                check.entries, self.len
            )));
        }
        if let Some(orphan) = check.visited.iter().position(|seen| !seen) {
            return Err(CoreError::index_corruption(format!(
                "node {orphan} is not reachable from the root"
            )));
        }
        Ok(())
    }

    fn validate_node(
        &self,
        id: NodeId,
        lower: Option<&K>,
        upper: Option<&K>,
        depth: usize,
        check: &mut Validation,
    ) -> CoreResult<()> {
        match check.visited.get_mut(id) {
            None => {
                return Err(CoreError::index_corruption(format!(
                    "child {id} is not an allocated node"
                )))
            }
            Some(true) => {
                return Err(CoreError::index_corruption(format!(
                    "node {id} is reachable more than once"
                )))
            }
            Some(seen) => *seen = true,
        }

        let node = &self.nodes[id];
        let count = node.keys.len();
        if count > self.max_keys() {
            return Err(CoreError::index_corruption(format!(
                "node {id} holds {count} keys, above {}",
                self.max_keys()
            )));
        }
        if id != self.root && count < self.min_degree - 1 {
            return Err(CoreError::index_corruption(format!(
                "node {id} holds {count} keys, below {}",
                self.min_degree - 1
            )));
        }
        if node.keys.windows(2).any(|pair| pair[0].0 > pair[1].0) {
            return Err(CoreError::index_corruption(format!(
                "keys of node {id} are out of order"
            )));
        }
        let out_of_bounds = node.keys.iter().any(|(key, _)| {
            lower.is_some_and(|low| key < low) || upper.is_some_and(|high| key > high)
        });
        if out_of_bounds {
            return Err(CoreError::index_corruption(format!(
                "node {id} holds a key outside its parent's separators"
            )));
        }
        check.entries += count;

        if node.is_leaf() {
            match check.leaf_depth {
                None => check.leaf_depth = Some(depth),
                Some(expected) if expected != depth => {
                    return Err(CoreError::index_corruption(format!(
                        "leaf {id} at depth {depth}, expected {expected}"
                    )))
                }
                Some(_) => {}
            }
            return Ok(());
        }

        if node.children.len() != count + 1 {
            return Err(CoreError::index_corruption(format!(
                "node {id} has {count} keys and {} children",
                node.children.len()
            )));
        }
        for (i, &child) in node.children.iter().enumerate() {
            let low = if i == 0 { lower } else { Some(&node.keys[i - 1].0) };
            let high = if i == count { upper } else { Some(&node.keys[i].0) };
            self.validate_node(child, low, high, depth + 1, check)?;
        }
        Ok(())
    }
}

struct Validation {
    visited: Vec<bool>,
    leaf_depth: Option<usize>,
    entries: usize,
}

impl<K: IndexKey> Index<K> for BTreeIndex<K> {
    fn insert(&mut self, key: K, offset: Offset) {
        self.insert_entry(key, offset);
    }

    fn lookup(&self, key: &K) -> Vec<Offset> {
        self.search(key)
    }

    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        *self = Self::empty(self.min_degree);
    }
}

impl<K: IndexKey> RangeIndex<K> for BTreeIndex<K> {
    fn range_lookup(&self, min: &K, max: &K) -> Vec<Offset> {
        self.search_range(min, max)
    }
}

/// In-order iterator over a [`BTreeIndex`].
pub struct Iter<'a, K> {
    tree: &'a BTreeIndex<K>,
    /// Nodes on the current path and the next key to yield from each.
    stack: Vec<(NodeId, usize)>,
}

impl<K> Iter<'_, K> {
    fn descend(&mut self, mut id: NodeId) {
        loop {
            self.stack.push((id, 0));
            match self.tree.nodes[id].children.first() {
                Some(&child) => id = child,
                None => return,
            }
        }
    }
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = (&'a K, Offset);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (id, idx) = *self.stack.last()?;
            let tree = self.tree;
            let node = &tree.nodes[id];
            if idx < node.keys.len() {
                if let Some(top) = self.stack.last_mut() {
                    top.1 += 1;
                }
                if !node.is_leaf() {
                    self.descend(node.children[idx + 1]);
                }
                let (key, offset) = &node.keys[idx];
                return Some((key, *offset));
            }
            self.stack.pop();
        }
    }
}
