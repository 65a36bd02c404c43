//! Read negotiation.

use strata_core::constants::{
    MSG_CACHE_GET_FAILED, MSG_CACHE_UNMATERIALIZED, MSG_SOURCE_GET_FAILED,
    MSG_SOURCE_UNMATERIALIZED,
};
use strata_core::{
    collapse, prune_unmaterialized, Envelope, GraphError, GraphNode, GraphResult, MetaMode, Path,
    PathMeta, PathSet,
};
use tracing::{debug, error, warn};

use super::{shielded, NegotiationContext};

/// What one tier contributed: its (pruned) graph and the path split.
#[derive(Debug, Default)]
struct TierRead {
    graph: GraphNode,
    meta: PathMeta,
}

pub(crate) async fn negotiate_get(
    ctx: &NegotiationContext<'_>,
    path_sets: &[PathSet],
) -> GraphResult<Envelope> {
    let cached = read_cache(ctx, path_sets).await;
    let fetched = read_source(ctx, &cached.meta.unhandled).await?;

    if ctx.config.backfill_enabled && !fetched.meta.handled.is_empty() {
        ctx.backfill.enqueue(Envelope::new(
            fetched.meta.handled.clone(),
            fetched.graph.clone(),
        ));
    }

    debug!(
        from_cache = cached.meta.handled.len(),
        from_source = fetched.meta.handled.len(),
        "Negotiated get"
    );

    let mut paths = cached.meta.handled;
    paths.extend(fetched.meta.handled);
    let mut graph = cached.graph;
    graph.merge(fetched.graph);
    Ok(Envelope::new(paths, graph))
}

/// Query the cache. Never fails: a broken or panicking cache makes every
/// path unhandled.
async fn read_cache(ctx: &NegotiationContext<'_>, path_sets: &[PathSet]) -> TierRead {
    let envelope = match shielded(ctx.cache.get(path_sets)).await {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "Cache get failed; requesting everything from source");
            ctx.diagnostics
                .emit(GraphError::cache_fail(MSG_CACHE_GET_FAILED, e.to_string()));
            let graph = GraphNode::empty();
            let meta = PathMeta::build(path_sets, &graph, MetaMode::Full);
            return TierRead { graph, meta };
        }
    };

    let mut graph = envelope.json_graph;
    let meta = PathMeta::build(path_sets, &graph, MetaMode::Full);
    for path in &meta.unmaterialized {
        prune_unmaterialized(&mut graph, path);
    }
    if meta.has_unmaterialized() {
        debug!(
            count = meta.unmaterialized.len(),
            "Cache left paths unmaterialized"
        );
        ctx.diagnostics.emit(GraphError::unmaterialized(
            MSG_CACHE_UNMATERIALIZED,
            meta.unmaterialized.clone(),
        ));
    }
    TierRead { graph, meta }
}

/// Fetch `unhandled` from the source. The source must materialize all of it.
async fn read_source(ctx: &NegotiationContext<'_>, unhandled: &[Path]) -> GraphResult<TierRead> {
    if unhandled.is_empty() {
        return Ok(TierRead::default());
    }

    let request = collapse(unhandled);
    debug!(
        paths = unhandled.len(),
        path_sets = request.len(),
        "Requesting unhandled paths from source"
    );
    let envelope = ctx.source.get(&request).await.map_err(|e| {
        error!(error = %e, "Source get failed");
        GraphError::source_fail(MSG_SOURCE_GET_FAILED, e.to_string())
    })?;

    let graph = envelope.json_graph;
    let requested: Vec<PathSet> = unhandled.iter().map(|path| PathSet::from_path(path)).collect();
    let meta = PathMeta::build(&requested, &graph, MetaMode::MaterializationOnly);
    if meta.has_unmaterialized() {
        error!(
            count = meta.unmaterialized.len(),
            "Source left requested paths unmaterialized"
        );
        return Err(GraphError::unmaterialized(
            MSG_SOURCE_UNMATERIALIZED,
            meta.unmaterialized,
        ));
    }
    Ok(TierRead { graph, meta })
}
