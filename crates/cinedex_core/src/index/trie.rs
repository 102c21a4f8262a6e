//! Prefix trie over lower-cased titles.

use crate::error::{CoreError, CoreResult};
use crate::index::traits::{Index, PrefixIndex};
use crate::types::Offset;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

type NodeId = usize;

const ROOT: NodeId = 0;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TrieNode {
    children: BTreeMap<char, NodeId>,
    terminal: bool,
    offsets: Vec<Offset>,
}

/// Character trie answering case-insensitive title prefix queries.
///
/// Whole titles are inserted (not individual words), lower-cased. Nodes
/// live in an arena; node 0 is the root and stands for the empty string.
/// Prefix results are collected depth-first with children visited in
/// character order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefixTrie {
    nodes: Vec<TrieNode>,
    len: usize,
}

impl Default for PrefixTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl PrefixTrie {
    /// Creates an empty trie.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
            len: 0,
        }
    }

    /// Returns the number of allocated nodes, root included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the offsets of every title starting with `prefix`,
    /// ignoring case. An empty prefix matches everything.
    #[must_use]
    pub fn search_prefix(&self, prefix: &str) -> Vec<Offset> {
        let Some(start) = self.find(&prefix.to_lowercase()) else {
            return Vec::new();
        };

        let mut found = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            found.extend_from_slice(&node.offsets);
            // Reversed so the smallest character is popped first.
            stack.extend(node.children.values().rev().copied());
        }
        found
    }

    /// Returns the offsets stored under exactly `title`, ignoring case.
    #[must_use]
    pub fn search_exact(&self, title: &str) -> Vec<Offset> {
        self.find(&title.to_lowercase())
            .map(|id| &self.nodes[id])
            .filter(|node| node.terminal)
            .map(|node| node.offsets.clone())
            .unwrap_or_default()
    }

    fn find(&self, lowered: &str) -> Option<NodeId> {
        lowered
            .chars()
            .try_fold(ROOT, |id, ch| self.nodes[id].children.get(&ch).copied())
    }

    /// Checks that every node is reached once and the entry count matches.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexCorruption`] describing the first violation.
    pub fn validate(&self) -> CoreResult<()> {
        if self.nodes.is_empty() {
            return Err(CoreError::index_corruption("trie has no root node"));
        }

        let mut visited = vec![false; self.nodes.len()];
        let mut entries = 0;
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            match visited.get_mut(id) {
                None => {
                    return Err(CoreError::index_corruption(format!(
                        "trie child {id} is not an allocated node"
                    )))
                }
                Some(true) => {
                    return Err(CoreError::index_corruption(format!(
                        "trie node {id} is reachable more than once"
                    )))
                }
                Some(seen) => *seen = true,
            }

            let node = &self.nodes[id];
            if node.terminal == node.offsets.is_empty() {
                return Err(CoreError::index_corruption(format!(
                    "trie node {id} terminal flag disagrees with its offsets"
                )));
            }
            entries += node.offsets.len();
            stack.extend(node.children.values().copied());
        }

        if entries != self.len {
            return Err(CoreError::index_corruption(format!(
                "trie holds {entries} entries but records {}",
                self.len
            )));
        }
        if visited.iter().any(|seen| !seen) {
            return Err(CoreError::index_corruption(
                "trie has nodes unreachable from the root",
            ));
        }
        Ok(())
    }
}

impl Index<String> for PrefixTrie {
    fn insert(&mut self, title: String, offset: Offset) {
        let mut id = ROOT;
        for ch in title.to_lowercase().chars() {
            id = match self.nodes[id].children.get(&ch) {
                Some(&child) => child,
                None => {
                    self.nodes.push(TrieNode::default());
                    let child = self.nodes.len() - 1;
                    self.nodes[id].children.insert(ch, child);
                    child
                }
            };
        }
        let node = &mut self.nodes[id];
        node.terminal = true;
        node.offsets.push(offset);
        self.len += 1;
    }

    fn lookup(&self, title: &String) -> Vec<Offset> {
        self.search_exact(title)
    }

    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        *self = Self::new();
    }
}

impl PrefixIndex for PrefixTrie {
    fn prefix_lookup(&self, prefix: &str) -> Vec<Offset> {
        self.search_prefix(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn off(i: usize) -> Offset {
        Offset::from_index(i)
    }

    fn sample() -> PrefixTrie {
        let mut trie = PrefixTrie::new();
        trie.insert("Hamlet".into(), off(0));
        trie.insert("Hamlet Returns".into(), off(1));
        trie.insert("Othello".into(), off(2));
        trie.insert("hamlet".into(), off(3));
        trie
    }

    #[test]
    fn prefix_is_case_insensitive() {
        let trie = sample();
        assert_eq!(trie.search_prefix("HAM"), vec![off(0), off(3), off(1)]);
        assert_eq!(trie.search_prefix("oth"), vec![off(2)]);
    }

    #[test]
    fn empty_prefix_returns_everything() {
        let trie = sample();
        let mut all = trie.search_prefix("");
        all.sort();
        assert_eq!(all, vec![off(0), off(1), off(2), off(3)]);
    }

    #[test]
    fn missing_prefix_is_empty() {
        let trie = sample();
        assert!(trie.search_prefix("macbeth").is_empty());
        assert!(trie.search_prefix("hamlets").is_empty());
    }

    #[test]
    fn exact_lookup_needs_a_terminal() {
        let trie = sample();
        assert_eq!(trie.lookup(&"HAMLET".to_string()), vec![off(0), off(3)]);
        assert!(trie.search_exact("Haml").is_empty());
    }

    #[test]
    fn children_visited_in_character_order() {
        let mut trie = PrefixTrie::new();
        trie.insert("ac".into(), off(0));
        trie.insert("ab".into(), off(1));
        trie.insert("a".into(), off(2));
        assert_eq!(trie.search_prefix("a"), vec![off(2), off(1), off(0)]);
    }

    #[test]
    fn non_ascii_titles() {
        let mut trie = PrefixTrie::new();
        trie.insert("Ödipus".into(), off(0));
        trie.insert("Amélie".into(), off(1));
        assert_eq!(trie.search_prefix("öd"), vec![off(0)]);
        assert_eq!(trie.search_prefix("amé"), vec![off(1)]);
        trie.validate().unwrap();
    }

    #[test]
    fn clear_resets() {
        let mut trie = sample();
        trie.clear();
        assert!(trie.is_empty());
        assert_eq!(trie.node_count(), 1);
        assert!(trie.search_prefix("").is_empty());
    }

    #[test]
    fn validate_detects_bad_count() {
        let mut trie = sample();
        trie.validate().unwrap();
        trie.len += 1;
        assert!(trie.validate().is_err());
    }

    proptest! {
        #[test]
        fn prefix_of_inserted_title_finds_it(
            titles in prop::collection::vec("[A-Za-z ]{0,12}", 1..40),
            pick in any::<prop::sample::Index>(),
        ) {
            let mut trie = PrefixTrie::new();
            for (i, title) in titles.iter().enumerate() {
                trie.insert(title.clone(), off(i));
            }
            prop_assert!(trie.validate().is_ok());
            prop_assert_eq!(trie.search_prefix("").len(), titles.len());

            let i = pick.index(titles.len());
            let wanted = titles[i].to_lowercase();
            let mut found = trie.search_exact(&titles[i].to_uppercase());
            found.sort();
            let expected: Vec<Offset> = titles
                .iter()
                .enumerate()
                .filter(|(_, t)| t.to_lowercase() == wanted)
                .map(|(j, _)| off(j))
                .collect();
            prop_assert_eq!(found, expected);
        }
    }
}
