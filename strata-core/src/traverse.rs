//! Path-set traversal.
//!
//! Expands path-sets against a sparse graph and yields every addressed
//! `(path, node)` pair exactly once: path-sets in order, depth-first, keys of
//! each segment in key-set order. Missing intermediate nodes are descended
//! through as if they were empty branches, so absence is reported at the
//! full depth of every addressed path.

use crate::graph::GraphNode;
use crate::path::{Key, Path, PathSet};

struct Frame<'a> {
    node: Option<&'a GraphNode>,
    keys: Box<dyn Iterator<Item = Key> + 'a>,
}

/// Lazy iterator over the `(path, node)` pairs addressed by a slice of path-sets.
pub struct Traversal<'a> {
    graph: &'a GraphNode,
    path_sets: std::slice::Iter<'a, PathSet>,
    current: Option<&'a PathSet>,
    stack: Vec<Frame<'a>>,
    path: Path,
}

impl<'a> Iterator for Traversal<'a> {
    type Item = (Path, Option<&'a GraphNode>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.stack.is_empty() {
                let path_set = self.path_sets.next()?;
                if let Some(first) = path_set.segments().first() {
                    self.current = Some(path_set);
                    self.path.clear();
                    self.stack.push(Frame {
                        node: Some(self.graph),
                        keys: first.keys(),
                    });
                }
                continue;
            }

            let depth = self.stack.len() - 1;
            let frame = self.stack.last_mut()?;
            let Some(key) = frame.keys.next() else {
                self.stack.pop();
                continue;
            };
            let child = frame.node.and_then(|node| node.child(&key));

            self.path.truncate(depth);
            self.path.push(key);

            let segments = self.current?.segments();
            match segments.get(depth + 1) {
                None => return Some((self.path.clone(), child)),
                Some(segment) => self.stack.push(Frame {
                    node: child,
                    keys: segment.keys(),
                }),
            }
        }
    }
}

/// Traverse `path_sets` against `graph`.
pub fn traverse<'a>(path_sets: &'a [PathSet], graph: &'a GraphNode) -> Traversal<'a> {
    Traversal {
        graph,
        path_sets: path_sets.iter(),
        current: None,
        stack: Vec::new(),
        path: Vec::new(),
    }
}

/// Call `f` for every addressed `(path, node)` pair.
pub fn visit<F>(path_sets: &[PathSet], graph: &GraphNode, mut f: F)
where
    F: FnMut(Path, Option<&GraphNode>),
{
    for (path, node) in traverse(path_sets, graph) {
        f(path, node);
    }
}

/// Fold every addressed `(path, node)` pair into an accumulator.
pub fn reduce<A, F>(path_sets: &[PathSet], graph: &GraphNode, init: A, mut f: F) -> A
where
    F: FnMut(A, Path, Option<&GraphNode>) -> A,
{
    traverse(path_sets, graph).fold(init, |acc, (path, node)| f(acc, path, node))
}
