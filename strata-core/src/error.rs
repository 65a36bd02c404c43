//! Error types for Strata operations

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::constants::MSG_UNKNOWN;
use crate::graph::GraphNode;
use crate::path::Path;

/// Status carried by every negotiation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorStatus {
    /// The source tier failed. Always fatal.
    SourceFail,
    /// The cache tier failed. Never fatal.
    CacheFail,
    /// A requested path resolved to nothing.
    Unmaterialized,
    /// An unanticipated fault inside a negotiation.
    Unknown,
}

impl ErrorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorStatus::SourceFail => "SOURCE_FAIL",
            ErrorStatus::CacheFail => "CACHE_FAIL",
            ErrorStatus::Unmaterialized => "UNMATERIALIZED",
            ErrorStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error value delivered on a result channel (fatal) or on the diagnostic
/// broadcast (non-fatal).
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{status}: {message}{}", .detail.as_deref().map(|d| format!(" ({d})")).unwrap_or_default())]
pub struct GraphError {
    pub status: ErrorStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unmaterialized: Option<Vec<Path>>,
}

impl GraphError {
    pub fn new(status: ErrorStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            detail: None,
            unmaterialized: None,
        }
    }

    pub fn source_fail(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(ErrorStatus::SourceFail, message).with_detail(detail)
    }

    pub fn cache_fail(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(ErrorStatus::CacheFail, message).with_detail(detail)
    }

    pub fn unmaterialized(message: impl Into<String>, paths: Vec<Path>) -> Self {
        Self {
            unmaterialized: Some(paths),
            ..Self::new(ErrorStatus::Unmaterialized, message)
        }
    }

    pub fn unknown(detail: impl Into<String>) -> Self {
        Self::new(ErrorStatus::Unknown, MSG_UNKNOWN).with_detail(detail)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Paths that were still unmaterialized, if this error reports any.
    pub fn unmaterialized_paths(&self) -> &[Path] {
        self.unmaterialized.as_deref().unwrap_or_default()
    }

    /// Render as an error node, the shape errors take inside a JSON graph.
    pub fn to_node(&self) -> GraphNode {
        let mut payload = Map::new();
        payload.insert("status".into(), json!(self.status.as_str()));
        payload.insert("message".into(), json!(self.message));
        if let Some(detail) = &self.detail {
            payload.insert("detail".into(), json!(detail));
        }
        if let Some(paths) = &self.unmaterialized {
            payload.insert("unmaterialized".into(), json!(paths));
        }
        GraphNode::Error(Value::Object(payload))
    }
}

/// Malformed JSON graph input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("Invalid reference target: {reason}")]
    InvalidReference { reason: String },

    #[error("Unknown node type: {type_name}")]
    UnknownNodeType { type_name: String },

    #[error("Invalid expiry on atom: {value}")]
    InvalidExpiry { value: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Result type alias for negotiated operations.
pub type GraphResult<T> = Result<T, GraphError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;

    #[test]
    fn test_status_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_value(ErrorStatus::SourceFail).expect("serialize"),
            json!("SOURCE_FAIL")
        );
        assert_eq!(
            serde_json::from_value::<ErrorStatus>(json!("UNMATERIALIZED")).expect("deserialize"),
            ErrorStatus::Unmaterialized
        );
    }

    #[test]
    fn test_graph_error_display_includes_detail() {
        let err = GraphError::cache_fail("Error requesting data from cache", "disk full");
        let msg = format!("{}", err);
        assert!(msg.contains("CACHE_FAIL"));
        assert!(msg.contains("Error requesting data from cache"));
        assert!(msg.contains("disk full"));

        let err = GraphError::new(ErrorStatus::Unknown, "Unknown error");
        assert_eq!(format!("{}", err), "UNKNOWN: Unknown error");
    }

    #[test]
    fn test_unmaterialized_error_carries_paths() {
        let err = GraphError::unmaterialized("'Source' has unmaterialized paths", vec![path!["u", 1]]);
        assert_eq!(err.status, ErrorStatus::Unmaterialized);
        assert_eq!(err.unmaterialized_paths(), &[path!["u", 1]]);
        assert!(err.detail.is_none());
    }

    #[test]
    fn test_to_node_is_error_shaped() {
        let err = GraphError::source_fail("Error requesting data from source", "timeout");
        match err.to_node() {
            GraphNode::Error(value) => {
                assert_eq!(value["status"], json!("SOURCE_FAIL"));
                assert_eq!(value["detail"], json!("timeout"));
                assert!(value.get("unmaterialized").is_none());
            }
            other => panic!("expected error node, got {:?}", other),
        }
    }

    #[test]
    fn test_config_error_display_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "diagnostics_capacity".to_string(),
            value: "0".to_string(),
            reason: "must be positive".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("diagnostics_capacity"));
        assert!(msg.contains("must be positive"));
    }
}
