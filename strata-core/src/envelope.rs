//! The unit exchanged with tiers: handled paths plus the graph backing them.

use serde::{Deserialize, Serialize};

use crate::graph::GraphNode;
use crate::path::Path;

/// Result of a tier operation.
///
/// Missing fields decode as empty, so `{}` is a valid envelope.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub paths: Vec<Path>,
    #[serde(default, rename = "jsonGraph")]
    pub json_graph: GraphNode,
}

impl Envelope {
    pub fn new(paths: Vec<Path>, json_graph: GraphNode) -> Self {
        Self { paths, json_graph }
    }

    /// No paths and an empty graph.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.json_graph.is_empty_branch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use serde_json::json;

    #[test]
    fn test_missing_fields_default_to_empty() {
        let envelope: Envelope = serde_json::from_value(json!({})).expect("deserialize");
        assert!(envelope.is_empty());
        assert_eq!(envelope, Envelope::default());
    }

    #[test]
    fn test_wire_field_names() {
        let mut graph = GraphNode::empty();
        graph.set_path(&path!["u", 1, "name"], GraphNode::atom("A"));
        let envelope = Envelope::new(vec![path!["u", 1, "name"]], graph);

        let value = serde_json::to_value(&envelope).expect("serialize");
        assert_eq!(
            value,
            json!({"paths": [["u", 1, "name"]], "jsonGraph": {"u": {"1": {"name": "A"}}}})
        );
        assert!(!envelope.is_empty());
    }
}
