//! JSON graph nodes.
//!
//! A graph is a tree of [`GraphNode::Branch`] maps whose leaves are atoms,
//! references or error nodes. A key with no node is a distinct state from a
//! key holding an empty branch.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::constants::{ATOM_TYPE, ERROR_TYPE, EXPIRES_KEY, REF_TYPE, TYPE_KEY, VALUE_KEY};
use crate::error::SyntaxError;
use crate::path::{path_to_json, Key, Path};

/// A leaf value with optional expiry (epoch milliseconds or a sentinel).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Atom {
    /// `None` is an undefined atom, which counts as unmaterialized.
    pub value: Option<Value>,
    pub expires: Option<i64>,
}

impl Atom {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: Some(value.into()),
            expires: None,
        }
    }

    pub fn expiring(value: impl Into<Value>, expires: i64) -> Self {
        Self {
            value: Some(value.into()),
            expires: Some(expires),
        }
    }

    pub fn undefined() -> Self {
        Self::default()
    }
}

/// One node of a JSON graph.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphNode {
    Branch(BTreeMap<Key, GraphNode>),
    Atom(Atom),
    /// Points at another location in the graph.
    Reference(Path),
    Error(Value),
}

impl Default for GraphNode {
    fn default() -> Self {
        GraphNode::empty()
    }
}

impl GraphNode {
    /// An empty branch.
    pub fn empty() -> Self {
        GraphNode::Branch(BTreeMap::new())
    }

    pub fn atom(value: impl Into<Value>) -> Self {
        GraphNode::Atom(Atom::new(value))
    }

    pub fn reference(path: Path) -> Self {
        GraphNode::Reference(path)
    }

    pub fn error(value: impl Into<Value>) -> Self {
        GraphNode::Error(value.into())
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, GraphNode::Branch(_))
    }

    pub fn is_empty_branch(&self) -> bool {
        matches!(self, GraphNode::Branch(children) if children.is_empty())
    }

    pub fn as_branch(&self) -> Option<&BTreeMap<Key, GraphNode>> {
        match self {
            GraphNode::Branch(children) => Some(children),
            _ => None,
        }
    }

    /// Child at `key`. Non-branch nodes have no children.
    pub fn child(&self, key: &Key) -> Option<&GraphNode> {
        self.as_branch().and_then(|children| children.get(key))
    }

    /// Node at `path`, without following references.
    pub fn get_path(&self, path: &[Key]) -> Option<&GraphNode> {
        path.iter().try_fold(self, |node, key| node.child(key))
    }

    /// Store `node` at `path`, creating intermediate branches and replacing
    /// any non-branch node found on the way.
    pub fn set_path(&mut self, path: &[Key], node: GraphNode) {
        let Some((last, parents)) = path.split_last() else {
            *self = node;
            return;
        };

        let mut current = self;
        for key in parents {
            if !current.is_branch() {
                *current = GraphNode::empty();
            }
            let GraphNode::Branch(children) = current else {
                return;
            };
            current = children.entry(key.clone()).or_insert_with(GraphNode::empty);
        }
        if !current.is_branch() {
            *current = GraphNode::empty();
        }
        if let GraphNode::Branch(children) = current {
            children.insert(last.clone(), node);
        }
    }

    /// Right-biased structural merge: branches merge key by key, anything
    /// else is replaced by `other`.
    pub fn merge(&mut self, other: GraphNode) {
        match (self, other) {
            (GraphNode::Branch(mine), GraphNode::Branch(theirs)) => {
                for (key, node) in theirs {
                    match mine.entry(key) {
                        Entry::Occupied(mut slot) => slot.get_mut().merge(node),
                        Entry::Vacant(slot) => {
                            slot.insert(node);
                        }
                    }
                }
            }
            (this, other) => *this = other,
        }
    }

    /// Decode from the conventional JSON graph encoding.
    ///
    /// Objects with a `$type` of `atom`, `ref` or `error` are sentinels; other
    /// objects are branches; bare primitives and arrays are atoms.
    pub fn from_json(value: Value) -> Result<Self, SyntaxError> {
        match value {
            Value::Object(mut object) => match object.remove(TYPE_KEY) {
                None => {
                    let mut children = BTreeMap::new();
                    for (key, child) in object {
                        children.insert(Key::name(key), GraphNode::from_json(child)?);
                    }
                    Ok(GraphNode::Branch(children))
                }
                Some(Value::String(type_name)) => match type_name.as_str() {
                    ATOM_TYPE => Ok(GraphNode::Atom(Atom {
                        value: object.remove(VALUE_KEY),
                        expires: parse_expires(object.remove(EXPIRES_KEY))?,
                    })),
                    REF_TYPE => parse_reference(object.remove(VALUE_KEY)),
                    ERROR_TYPE => Ok(GraphNode::Error(
                        object.remove(VALUE_KEY).unwrap_or(Value::Null),
                    )),
                    _ => Err(SyntaxError::UnknownNodeType { type_name }),
                },
                Some(other) => Err(SyntaxError::UnknownNodeType {
                    type_name: other.to_string(),
                }),
            },
            primitive => Ok(GraphNode::atom(primitive)),
        }
    }

    /// Encode using the conventional JSON graph encoding.
    pub fn to_json(&self) -> Value {
        match self {
            GraphNode::Branch(children) => Value::Object(
                children
                    .iter()
                    .map(|(key, child)| (key.to_string(), child.to_json()))
                    .collect(),
            ),
            GraphNode::Atom(Atom {
                value: Some(value),
                expires: None,
            }) if !value.is_object() && !value.is_array() => value.clone(),
            GraphNode::Atom(atom) => {
                let mut object = sentinel(ATOM_TYPE);
                if let Some(value) = &atom.value {
                    object.insert(VALUE_KEY.into(), value.clone());
                }
                if let Some(expires) = atom.expires {
                    object.insert(EXPIRES_KEY.into(), Value::from(expires));
                }
                Value::Object(object)
            }
            GraphNode::Reference(path) => {
                let mut object = sentinel(REF_TYPE);
                object.insert(VALUE_KEY.into(), path_to_json(path));
                Value::Object(object)
            }
            GraphNode::Error(value) => {
                let mut object = sentinel(ERROR_TYPE);
                object.insert(VALUE_KEY.into(), value.clone());
                Value::Object(object)
            }
        }
    }
}

fn sentinel(type_name: &str) -> Map<String, Value> {
    let mut object = Map::new();
    object.insert(TYPE_KEY.into(), Value::from(type_name));
    object
}

fn parse_expires(raw: Option<Value>) -> Result<Option<i64>, SyntaxError> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| SyntaxError::InvalidExpiry {
                value: value.to_string(),
            }),
    }
}

fn parse_reference(raw: Option<Value>) -> Result<GraphNode, SyntaxError> {
    let Some(Value::Array(items)) = raw else {
        return Err(SyntaxError::InvalidReference {
            reason: "reference value must be an array of keys".to_string(),
        });
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(Key::name(s)),
            Value::Number(n) => n.as_i64().map(Key::Integer).ok_or_else(|| {
                SyntaxError::InvalidReference {
                    reason: format!("non-integer key {n}"),
                }
            }),
            other => Err(SyntaxError::InvalidReference {
                reason: format!("unsupported key {other}"),
            }),
        })
        .collect::<Result<Path, _>>()
        .map(GraphNode::Reference)
}

impl Serialize for GraphNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for GraphNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        GraphNode::from_json(value).map_err(de::Error::custom)
    }
}

impl TryFrom<Value> for GraphNode {
    type Error = SyntaxError;

    fn try_from(value: Value) -> Result<Self, SyntaxError> {
        GraphNode::from_json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use serde_json::json;

    fn graph(value: Value) -> GraphNode {
        GraphNode::from_json(value).expect("valid graph")
    }

    #[test]
    fn test_primitives_decode_as_atoms() {
        let node = graph(json!({"u": {"1": {"name": "A", "age": 30, "tags": ["x"]}}}));
        assert_eq!(
            node.get_path(&path!["u", 1, "name"]),
            Some(&GraphNode::atom("A"))
        );
        assert_eq!(node.get_path(&path!["u", 1, "age"]), Some(&GraphNode::atom(30)));
        assert_eq!(
            node.get_path(&path!["u", 1, "tags"]),
            Some(&GraphNode::atom(json!(["x"])))
        );
    }

    #[test]
    fn test_sentinels_decode() {
        let node = graph(json!({
            "a": {"$type": "atom", "value": 1, "$expires": 0},
            "b": {"$type": "atom"},
            "r": {"$type": "ref", "value": ["u", 1]},
            "e": {"$type": "error", "value": "boom"}
        }));
        assert_eq!(
            node.child(&Key::from("a")),
            Some(&GraphNode::Atom(Atom::expiring(1, 0)))
        );
        assert_eq!(
            node.child(&Key::from("b")),
            Some(&GraphNode::Atom(Atom::undefined()))
        );
        assert_eq!(
            node.child(&Key::from("r")),
            Some(&GraphNode::reference(path!["u", 1]))
        );
        assert_eq!(node.child(&Key::from("e")), Some(&GraphNode::error("boom")));
    }

    #[test]
    fn test_malformed_sentinels_are_rejected() {
        assert!(matches!(
            GraphNode::from_json(json!({"$type": "nope"})),
            Err(SyntaxError::UnknownNodeType { .. })
        ));
        assert!(matches!(
            GraphNode::from_json(json!({"$type": "ref", "value": "u"})),
            Err(SyntaxError::InvalidReference { .. })
        ));
        assert!(matches!(
            GraphNode::from_json(json!({"$type": "atom", "value": 1, "$expires": "soon"})),
            Err(SyntaxError::InvalidExpiry { .. })
        ));
    }

    #[test]
    fn test_to_json_restores_encoding() {
        let source = json!({
            "u": {
                "1": {"name": "A", "meta": {"$type": "atom", "value": {"k": 1}}},
                "2": {"$type": "ref", "value": ["u", 1]}
            },
            "stale": {"$type": "atom", "value": "x", "$expires": 0}
        });
        assert_eq!(graph(source.clone()).to_json(), source);
    }

    #[test]
    fn test_set_path_creates_branches() {
        let mut node = GraphNode::empty();
        node.set_path(&path!["u", 1, "name"], GraphNode::atom("A"));
        assert_eq!(node, graph(json!({"u": {"1": {"name": "A"}}})));

        // Non-branch intermediates are replaced.
        node.set_path(&path!["u", 1, "name", "first"], GraphNode::atom("B"));
        assert_eq!(node, graph(json!({"u": {"1": {"name": {"first": "B"}}}})));
    }

    #[test]
    fn test_merge_is_right_biased() {
        let mut left = graph(json!({
            "u": {"1": {"name": "A", "age": {"$type": "error", "value": "x"}}}
        }));
        left.merge(graph(json!({"u": {"1": {"age": 27}, "2": {"name": "B"}}})));
        assert_eq!(
            left,
            graph(json!({"u": {"1": {"name": "A", "age": 27}, "2": {"name": "B"}}}))
        );
    }

    #[test]
    fn test_merge_replaces_expired_atom_entirely() {
        let mut left = graph(json!({"a": {"$type": "atom", "value": 26, "$expires": 0}}));
        left.merge(graph(json!({"a": {"$type": "atom", "value": 27}})));
        assert_eq!(left.child(&Key::from("a")), Some(&GraphNode::atom(27)));
    }

    #[test]
    fn test_integer_object_keys_are_canonical() {
        let node = graph(json!({"byId": {"24": {"msg": "hi"}}}));
        assert!(node.get_path(&path!["byId", 24, "msg"]).is_some());
        assert!(node.get_path(&path!["byId", "24", "msg"]).is_some());
    }

    #[test]
    fn test_try_from_value() {
        let node = GraphNode::try_from(json!({"a": 1})).expect("valid graph");
        assert_eq!(node.get_path(&path!["a"]), Some(&GraphNode::atom(1)));

        let bad: Result<GraphNode, SyntaxError> =
            GraphNode::try_from(json!({"a": {"$type": "bogus"}}));
        assert!(matches!(bad, Err(SyntaxError::UnknownNodeType { .. })));
    }

    #[test]
    fn test_serde_roundtrip_through_graph_node() {
        let node: GraphNode =
            serde_json::from_value(json!({"a": {"$type": "error", "value": {"code": 1}}}))
                .expect("deserialize");
        assert_eq!(
            serde_json::to_value(&node).expect("serialize"),
            json!({"a": {"$type": "error", "value": {"code": 1}}})
        );
    }
}
