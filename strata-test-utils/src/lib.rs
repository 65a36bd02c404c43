//! Strata Test Utilities
//!
//! Centralized test infrastructure for the Strata workspace:
//! - In-memory tiers with failure injection and write recording
//! - Proptest generators for keys, key-sets, paths, path-sets and graphs
//! - Fixtures for building graphs from JSON

pub use strata_core::{
    Envelope, GraphError, GraphNode, Key, KeySet, Path, PathSet, Range, StrataConfig,
};
pub use strata_tier::{Coordinator, GraphTier, TierError, TierResult};

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;
use strata_core::traverse;

// ============================================================================
// MEMORY TIER
// ============================================================================

/// Handler answering `call` on a [`MemoryTier`].
pub type CallHandler = Box<dyn Fn(&Path, &[Value]) -> TierResult<Envelope> + Send + Sync>;

/// In-memory graph tier for testing.
///
/// `get` returns every addressed node that exists (including expired atoms
/// and error nodes) and omits the rest. `set` merges into the stored graph.
/// Each operation can be made to fail, and every call is recorded.
#[derive(Default)]
pub struct MemoryTier {
    graph: RwLock<GraphNode>,
    get_failure: Option<String>,
    set_failure: Option<String>,
    call_failure: Option<String>,
    call_handler: Option<CallHandler>,
    get_requests: Mutex<Vec<Vec<PathSet>>>,
    sets: Mutex<Vec<Envelope>>,
    calls: AtomicUsize,
}

impl MemoryTier {
    /// Create an empty tier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tier holding `graph`.
    pub fn with_graph(graph: GraphNode) -> Self {
        Self {
            graph: RwLock::new(graph),
            ..Self::default()
        }
    }

    /// Create a tier from a JSON graph literal.
    pub fn from_json(value: Value) -> Self {
        Self::with_graph(fixtures::graph(value))
    }

    /// Make every `get` fail with `reason`.
    pub fn failing_get(mut self, reason: impl Into<String>) -> Self {
        self.get_failure = Some(reason.into());
        self
    }

    /// Make every `set` fail with `reason`.
    pub fn failing_set(mut self, reason: impl Into<String>) -> Self {
        self.set_failure = Some(reason.into());
        self
    }

    /// Make every `call` fail with `reason`.
    pub fn failing_call(mut self, reason: impl Into<String>) -> Self {
        self.call_failure = Some(reason.into());
        self
    }

    /// Answer `call` with `handler`. Without one, `call` is unsupported.
    pub fn with_call_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Path, &[Value]) -> TierResult<Envelope> + Send + Sync + 'static,
    {
        self.call_handler = Some(Box::new(handler));
        self
    }

    /// Copy of the stored graph.
    pub fn snapshot(&self) -> GraphNode {
        self.graph
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of `get` calls received, failed ones included.
    pub fn get_count(&self) -> usize {
        self.get_requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Path-sets of every `get` received, in order.
    pub fn get_requests(&self) -> Vec<Vec<PathSet>> {
        self.get_requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Envelopes of every `set` received, in order, failed ones included.
    pub fn sets(&self) -> Vec<Envelope> {
        self.sets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_count(&self) -> usize {
        self.sets.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` sets have arrived or `timeout` passes.
    ///
    /// Returns whether the count was reached. Used to observe background
    /// backfill writes.
    pub async fn wait_for_sets(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.set_count() >= count {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }
}

#[async_trait]
impl GraphTier for MemoryTier {
    async fn get(&self, path_sets: &[PathSet]) -> TierResult<Envelope> {
        self.get_requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path_sets.to_vec());
        if let Some(reason) = &self.get_failure {
            return Err(TierError::failed(reason.clone()));
        }

        let stored = self.graph.read().unwrap_or_else(PoisonError::into_inner);
        let mut envelope = Envelope::default();
        for (path, node) in traverse(path_sets, &stored) {
            if let Some(node) = node {
                envelope.json_graph.set_path(&path, node.clone());
                envelope.paths.push(path);
            }
        }
        Ok(envelope)
    }

    async fn set(&self, envelope: Envelope) -> TierResult<Envelope> {
        self.sets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(envelope.clone());
        if let Some(reason) = &self.set_failure {
            return Err(TierError::failed(reason.clone()));
        }

        self.graph
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .merge(envelope.json_graph.clone());
        Ok(envelope)
    }

    async fn call(
        &self,
        path: &Path,
        args: &[Value],
        _result_path_sets: &[PathSet],
    ) -> TierResult<Envelope> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.call_failure {
            return Err(TierError::failed(reason.clone()));
        }
        match &self.call_handler {
            Some(handler) => handler(path, args),
            None => Err(TierError::Unsupported { operation: "call" }),
        }
    }
}

/// Tier that panics on every operation.
#[derive(Debug, Default)]
pub struct PanickingTier;

#[async_trait]
impl GraphTier for PanickingTier {
    async fn get(&self, _path_sets: &[PathSet]) -> TierResult<Envelope> {
        panic!("PanickingTier::get")
    }

    async fn set(&self, _envelope: Envelope) -> TierResult<Envelope> {
        panic!("PanickingTier::set")
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating Strata addressing and graph types.

    use super::*;
    use proptest::collection::vec;
    use proptest::prelude::*;
    use strata_core::Atom;

    /// Generate a key: a small integer or a short lowercase name.
    pub fn arb_key() -> impl Strategy<Value = Key> {
        prop_oneof![
            (0i64..12).prop_map(Key::Integer),
            "[a-d]{1,2}".prop_map(Key::name),
        ]
    }

    /// Generate a range of up to four keys; may be empty.
    pub fn arb_range() -> impl Strategy<Value = Range> {
        (0i64..10, 0i64..5).prop_map(|(from, length)| Range::with_length(from, length))
    }

    /// Generate a key-set: a key, a range, or a list mixing both.
    pub fn arb_keyset() -> impl Strategy<Value = KeySet> {
        let item = prop_oneof![
            arb_key().prop_map(KeySet::Key),
            arb_range().prop_map(KeySet::Range),
        ];
        prop_oneof![
            3 => arb_key().prop_map(KeySet::Key),
            1 => arb_range().prop_map(KeySet::Range),
            1 => vec(item, 0..4).prop_map(KeySet::List),
        ]
    }

    /// Generate a non-empty path-set.
    pub fn arb_path_set() -> impl Strategy<Value = PathSet> {
        vec(arb_keyset(), 1..4).prop_map(PathSet::new)
    }

    /// Generate a non-empty concrete path.
    pub fn arb_path() -> impl Strategy<Value = Path> {
        vec(arb_key(), 1..4)
    }

    /// Generate a leaf node of any classification.
    pub fn arb_leaf() -> impl Strategy<Value = GraphNode> {
        prop_oneof![
            4 => any::<i32>().prop_map(GraphNode::atom),
            1 => "[a-z]{0,6}".prop_map(GraphNode::atom),
            1 => Just(GraphNode::Atom(Atom::expiring(1, strata_core::constants::EXPIRES_NOW))),
            1 => Just(GraphNode::error("failed upstream")),
            1 => Just(GraphNode::Atom(Atom::undefined())),
        ]
    }

    /// Generate a graph holding only materialized, unexpiring leaves.
    pub fn arb_fresh_graph() -> impl Strategy<Value = GraphNode> {
        vec((arb_path(), any::<i32>()), 0..12).prop_map(|entries| {
            let mut graph = GraphNode::empty();
            for (path, value) in entries {
                graph.set_path(&path, GraphNode::atom(value));
            }
            graph
        })
    }

    /// Generate a graph whose leaves may be stale, failed or undefined.
    pub fn arb_graph() -> impl Strategy<Value = GraphNode> {
        vec((arb_path(), arb_leaf()), 0..12).prop_map(|entries| {
            let mut graph = GraphNode::empty();
            for (path, leaf) in entries {
                graph.set_path(&path, leaf);
            }
            graph
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Graph fixtures.

    use super::*;

    /// Decode a JSON graph literal. Panics on malformed input.
    pub fn graph(value: Value) -> GraphNode {
        match GraphNode::from_json(value) {
            Ok(graph) => graph,
            Err(e) => panic!("invalid graph fixture: {e}"),
        }
    }

    /// Envelope for `paths` backed by the JSON graph literal `value`.
    pub fn envelope(paths: Vec<Path>, value: Value) -> Envelope {
        Envelope::new(paths, graph(value))
    }

    /// Coordinator over two memory tiers with the default configuration.
    pub fn coordinator(
        cache: &std::sync::Arc<MemoryTier>,
        source: &std::sync::Arc<MemoryTier>,
    ) -> Coordinator {
        Coordinator::new(cache.clone(), source.clone())
    }
}

// ============================================================================
// TESTS
// ============================================================================
