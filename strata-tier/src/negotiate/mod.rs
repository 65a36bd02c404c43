//! Negotiation between the cache tier and the source tier.
//!
//! Reads prefer the cache and escalate only unhandled paths to the source.
//! Writes go to the source first and are mirrored to the cache on success.
//! Source faults fail the operation; cache faults become diagnostics.

mod get;
mod set;

pub(crate) use get::negotiate_get;
pub(crate) use set::{negotiate_call, negotiate_set};

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use strata_core::StrataConfig;

use crate::backfill::BackfillQueue;
use crate::diagnostics::Diagnostics;
use crate::tier::{GraphTier, TierError, TierResult};

/// Everything one negotiation needs, borrowed from the coordinator.
pub(crate) struct NegotiationContext<'a> {
    pub cache: &'a dyn GraphTier,
    pub source: &'a dyn GraphTier,
    pub diagnostics: &'a Diagnostics,
    pub backfill: &'a BackfillQueue,
    pub config: &'a StrataConfig,
}

/// Await a tier operation, turning a panic into [`TierError::Failed`].
///
/// Cache calls go through this so a panicking cache degrades like a failing
/// one instead of aborting the negotiation.
pub(crate) async fn shielded<F, T>(operation: F) -> TierResult<T>
where
    F: Future<Output = TierResult<T>>,
{
    match AssertUnwindSafe(operation).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(TierError::failed(panic_message(panic.as_ref()))),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "negotiation panicked".to_string()
    }
}
