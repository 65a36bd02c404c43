//! Strata Tier - Cache/Source Negotiation
//!
//! Binds a cache tier and an authoritative source tier into one accessor:
//! - [`GraphTier`] is the contract both tiers implement
//! - [`Coordinator`] runs get/set/call negotiations between them
//! - [`Diagnostics`] carries non-fatal cache errors to subscribers
//! - [`BackfillQueue`] writes source results back to the cache in the background

pub mod backfill;
pub mod coordinator;
pub mod diagnostics;
mod negotiate;
pub mod tier;

pub use backfill::BackfillQueue;
pub use coordinator::{Coordinator, CoordinatorBuilder};
pub use diagnostics::{Diagnostics, DiagnosticsReceiver};
pub use tier::{single_emission, GraphTier, StreamTier, StreamingTier, TierError, TierResult, TierStream};
