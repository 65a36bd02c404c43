//! Value classification.
//!
//! Decides whether a visited node can be served as-is (handled) or must be
//! escalated to the source tier (unhandled).

use serde::{Deserialize, Serialize};

use crate::constants::{EXPIRES_NEVER, EXPIRES_NOW, EXPIRES_UNSET};
use crate::graph::{Atom, GraphNode};

/// Usability of a visited node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    Materialized,
    Expired,
    ErrorValue,
    /// No node, or an atom with an undefined value.
    Unmaterialized,
}

impl Classification {
    pub fn is_handled(&self) -> bool {
        matches!(self, Classification::Materialized)
    }

    pub fn is_unhandled(&self) -> bool {
        !self.is_handled()
    }

    pub fn is_unmaterialized(&self) -> bool {
        matches!(self, Classification::Unmaterialized)
    }
}

/// Current time in epoch milliseconds, the unit of `$expires`.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Whether an expiry has passed at `now_ms`.
///
/// Absent, [`EXPIRES_UNSET`] and [`EXPIRES_NEVER`] never expire;
/// [`EXPIRES_NOW`] is always expired; anything else is an absolute time.
pub fn is_expired_at(expires: Option<i64>, now_ms: i64) -> bool {
    match expires {
        None | Some(EXPIRES_UNSET) | Some(EXPIRES_NEVER) => false,
        Some(EXPIRES_NOW) => true,
        Some(at) => at < now_ms,
    }
}

/// Whether `node` is an atom whose expiry has passed.
pub fn is_expired(node: &GraphNode) -> bool {
    match node {
        GraphNode::Atom(atom) => is_expired_at(atom.expires, now_millis()),
        _ => false,
    }
}

/// Whether `node` is absent or an undefined atom. Independent of time.
pub fn is_unmaterialized(node: Option<&GraphNode>) -> bool {
    matches!(
        node,
        None | Some(GraphNode::Atom(Atom { value: None, .. }))
    )
}

/// Classify against the current time.
pub fn classify(node: Option<&GraphNode>) -> Classification {
    classify_at(node, now_millis())
}

/// Classify against an explicit time.
pub fn classify_at(node: Option<&GraphNode>, now_ms: i64) -> Classification {
    match node {
        None => Classification::Unmaterialized,
        Some(GraphNode::Atom(atom)) => match atom.value {
            None => Classification::Unmaterialized,
            Some(_) if is_expired_at(atom.expires, now_ms) => Classification::Expired,
            Some(_) => Classification::Materialized,
        },
        Some(GraphNode::Error(_)) => Classification::ErrorValue,
        Some(GraphNode::Reference(_)) | Some(GraphNode::Branch(_)) => {
            Classification::Materialized
        }
    }
}
