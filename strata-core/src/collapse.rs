//! Collapse concrete paths into a compact covering set of path-sets.
//!
//! Paths are grouped by length and loaded into a key trie. Each trie level
//! merges sibling keys whose collapsed suffixes are identical, and runs of
//! consecutive integer keys become ranges. The result is exact: expanding
//! it yields the input paths (without duplicates) and nothing else.

use std::collections::BTreeMap;

use crate::path::{Key, KeySet, Path, PathSet};

#[derive(Default)]
struct Trie {
    children: BTreeMap<Key, Trie>,
}

impl Trie {
    fn insert(&mut self, path: &[Key]) {
        let mut node = self;
        for key in path {
            node = node.children.entry(key.clone()).or_default();
        }
    }

    /// Segment sequences covering exactly the paths below this node.
    fn collapse(&self) -> Vec<Vec<KeySet>> {
        if self.children.is_empty() {
            return vec![Vec::new()];
        }

        let mut groups: Vec<(Vec<Vec<KeySet>>, Vec<Key>)> = Vec::new();
        for (key, child) in &self.children {
            let suffixes = child.collapse();
            match groups.iter_mut().find(|(existing, _)| *existing == suffixes) {
                Some((_, keys)) => keys.push(key.clone()),
                None => groups.push((suffixes, vec![key.clone()])),
            }
        }

        groups
            .into_iter()
            .flat_map(|(suffixes, keys)| {
                let head = KeySet::from_keys(keys);
                suffixes.into_iter().map(move |suffix| {
                    let mut segments = Vec::with_capacity(suffix.len() + 1);
                    segments.push(head.clone());
                    segments.extend(suffix);
                    segments
                })
            })
            .collect()
    }
}

/// Collapse `paths` into path-sets, shortest paths first.
///
/// Empty paths address nothing and are dropped.
pub fn collapse(paths: &[Path]) -> Vec<PathSet> {
    let mut by_length: BTreeMap<usize, Trie> = BTreeMap::new();
    for path in paths.iter().filter(|path| !path.is_empty()) {
        by_length.entry(path.len()).or_default().insert(path);
    }

    by_length
        .into_values()
        .flat_map(|trie| trie.collapse())
        .map(PathSet::new)
        .collect()
}
