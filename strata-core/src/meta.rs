//! Path metadata: which addressed paths a graph can answer.

use tracing::trace;

use crate::classify::{classify_at, is_unmaterialized, now_millis, Classification};
use crate::graph::GraphNode;
use crate::path::{Key, Path, PathSet};
use crate::traverse::reduce;

/// How strictly visited values are judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetaMode {
    /// Expired and error values are unhandled too.
    #[default]
    Full,
    /// Only unmaterialized values are unhandled. Used for source results,
    /// which are trusted as fresh.
    MaterializationOnly,
}

/// Paths of one traversal, split by classification.
///
/// `unmaterialized` is a subset of `unhandled`. All three lists keep
/// traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMeta {
    pub handled: Vec<Path>,
    pub unhandled: Vec<Path>,
    pub unmaterialized: Vec<Path>,
}

impl PathMeta {
    /// Classify every path addressed by `path_sets` against `graph` now.
    pub fn build(path_sets: &[PathSet], graph: &GraphNode, mode: MetaMode) -> Self {
        Self::build_at(path_sets, graph, mode, now_millis())
    }

    /// Classify every path addressed by `path_sets` against `graph` at `now_ms`.
    pub fn build_at(path_sets: &[PathSet], graph: &GraphNode, mode: MetaMode, now_ms: i64) -> Self {
        let meta = reduce(path_sets, graph, Self::default(), |mut meta, path, node| {
            meta.record(path, classify_at(node, now_ms), mode);
            meta
        });
        trace!(
            handled = meta.handled.len(),
            unhandled = meta.unhandled.len(),
            unmaterialized = meta.unmaterialized.len(),
            "Built path metadata"
        );
        meta
    }

    fn record(&mut self, path: Path, classification: Classification, mode: MetaMode) {
        let handled = match mode {
            MetaMode::Full => classification.is_handled(),
            MetaMode::MaterializationOnly => !classification.is_unmaterialized(),
        };
        if classification.is_unmaterialized() {
            self.unmaterialized.push(path.clone());
        }
        if handled {
            self.handled.push(path);
        } else {
            self.unhandled.push(path);
        }
    }

    pub fn has_unhandled(&self) -> bool {
        !self.unhandled.is_empty()
    }

    pub fn has_unmaterialized(&self) -> bool {
        !self.unmaterialized.is_empty()
    }
}

/// Remove the first unmaterialized node along `path` from `graph`.
///
/// Returns whether a node was removed. Stops without change when a
/// non-branch node is reached before anything unmaterialized.
pub fn prune_unmaterialized(graph: &mut GraphNode, path: &[Key]) -> bool {
    let mut node = graph;
    for key in path {
        let GraphNode::Branch(children) = node else {
            return false;
        };
        if is_unmaterialized(children.get(key)) {
            return children.remove(key).is_some();
        }
        match children.get_mut(key) {
            Some(child) => node = child,
            None => return false,
        }
    }
    false
}
