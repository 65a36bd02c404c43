//! Strata Core - Graph Model and Path Algebra
//!
//! Pure data structures and algorithms shared by every Strata crate:
//! - Keys, key-sets, paths and path-sets ([`path`])
//! - The sparse JSON graph and its node variants ([`graph`])
//! - Path-set traversal against a graph ([`traverse`])
//! - Value classification and expiry ([`classify`])
//! - Handled/unhandled path metadata ([`meta`])
//! - Path collapsing ([`collapse`])
//!
//! Nothing here performs I/O. Tier access and negotiation live in
//! `strata-tier`.

pub mod classify;
pub mod collapse;
pub mod config;
pub mod constants;
pub mod envelope;
pub mod error;
pub mod graph;
pub mod meta;
pub mod path;
pub mod traverse;

pub use classify::{
    classify, classify_at, is_expired, is_expired_at, is_unmaterialized, now_millis,
    Classification,
};
pub use collapse::collapse;
pub use config::StrataConfig;
pub use envelope::Envelope;
pub use error::{ConfigError, ErrorStatus, GraphError, GraphResult, SyntaxError};
pub use graph::{Atom, GraphNode};
pub use meta::{prune_unmaterialized, MetaMode, PathMeta};
pub use path::{path_to_json, Key, KeySet, Path, PathSet, Range};
pub use traverse::{reduce, traverse, visit, Traversal};
