//! Constants for Strata
//!
//! Sentinels and defaults shared across the workspace.

// ============================================================================
// EXPIRATION SENTINELS
// ============================================================================

/// `$expires` value marking an atom as never expiring.
pub const EXPIRES_NEVER: i64 = 1;

/// `$expires` value equivalent to an absent expiry.
pub const EXPIRES_UNSET: i64 = -1;

/// `$expires` value marking an atom as already expired.
pub const EXPIRES_NOW: i64 = 0;

// ============================================================================
// JSON GRAPH ENCODING
// ============================================================================

/// Object key carrying the node type of a sentinel.
pub const TYPE_KEY: &str = "$type";

/// Object key carrying the expiry of a sentinel.
pub const EXPIRES_KEY: &str = "$expires";

/// Object key carrying the payload of a sentinel.
pub const VALUE_KEY: &str = "value";

pub const ATOM_TYPE: &str = "atom";
pub const REF_TYPE: &str = "ref";
pub const ERROR_TYPE: &str = "error";

// ============================================================================
// COORDINATOR DEFAULTS
// ============================================================================

/// Default buffer size of the diagnostic broadcast.
pub const DEFAULT_DIAGNOSTICS_CAPACITY: usize = 256;

/// Whether source results are written back to the cache by default.
pub const DEFAULT_BACKFILL_ENABLED: bool = true;

/// Whether set/call results are mirrored to the cache by default.
pub const DEFAULT_MIRROR_WRITES: bool = true;

// ============================================================================
// DIAGNOSTIC MESSAGES
// ============================================================================

pub const MSG_CACHE_GET_FAILED: &str = "Error requesting data from cache";
pub const MSG_CACHE_UNMATERIALIZED: &str = "'Cache' has unmaterialized paths";
pub const MSG_SOURCE_GET_FAILED: &str = "Error requesting data from source";
pub const MSG_SOURCE_UNMATERIALIZED: &str = "'Source' has unmaterialized paths";
pub const MSG_BACKFILL_FAILED: &str = "Error updating cache with new upstream data";
pub const MSG_SET_SOURCE_FAILED: &str = "Failed to run set operation on source";
pub const MSG_SET_CACHE_FAILED: &str = "Failed to run set operation on cache";
pub const MSG_UNKNOWN: &str = "Unknown error";
