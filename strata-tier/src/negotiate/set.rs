//! Write negotiation for `set` and `call`.
//!
//! The source is authoritative: its failure aborts with no cache mutation.
//! A successful result is mirrored to the cache with `set`, and a mirror
//! failure is reported as a diagnostic while the source result is returned.

use serde_json::Value;
use strata_core::constants::{MSG_SET_CACHE_FAILED, MSG_SET_SOURCE_FAILED};
use strata_core::{path_to_json, Envelope, GraphError, GraphResult, Path, PathSet};
use tracing::{debug, error, warn};

use super::{shielded, NegotiationContext};

pub(crate) async fn negotiate_set(
    ctx: &NegotiationContext<'_>,
    envelope: Envelope,
) -> GraphResult<Envelope> {
    let written = ctx.source.set(envelope).await.map_err(|e| {
        error!(error = %e, "Source set failed");
        GraphError::source_fail(MSG_SET_SOURCE_FAILED, e.to_string())
    })?;

    mirror(ctx, &written, || MSG_SET_CACHE_FAILED.to_string()).await;
    Ok(written)
}

pub(crate) async fn negotiate_call(
    ctx: &NegotiationContext<'_>,
    path: &Path,
    args: &[Value],
    result_path_sets: &[PathSet],
) -> GraphResult<Envelope> {
    let target = path_to_json(path);
    let result = ctx
        .source
        .call(path, args, result_path_sets)
        .await
        .map_err(|e| {
            error!(%target, error = %e, "Source call failed");
            GraphError::source_fail(format!("Could not call {target} on source"), e.to_string())
        })?;

    mirror(ctx, &result, || format!("Could not call {target} on cache")).await;
    Ok(result)
}

/// Write a copy of `envelope` to the cache; the caller keeps the original.
async fn mirror<F>(ctx: &NegotiationContext<'_>, envelope: &Envelope, message: F)
where
    F: FnOnce() -> String,
{
    if !ctx.config.mirror_writes {
        return;
    }
    match shielded(ctx.cache.set(envelope.clone())).await {
        Ok(_) => {
            debug!(paths = envelope.paths.len(), "Mirrored write to cache");
        }
        Err(e) => {
            warn!(error = %e, "Cache mirror failed");
            ctx.diagnostics
                .emit(GraphError::cache_fail(message(), e.to_string()));
        }
    }
}
