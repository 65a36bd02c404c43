//! The coordinator: one accessor over a cache tier and a source tier.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::Value;
use strata_core::{ConfigError, Envelope, GraphError, GraphResult, Path, PathSet, StrataConfig};
use tracing::{debug, debug_span, error, Instrument};
use uuid::Uuid;

use crate::backfill::BackfillQueue;
use crate::diagnostics::{Diagnostics, DiagnosticsReceiver};
use crate::negotiate::{
    negotiate_call, negotiate_get, negotiate_set, panic_message, NegotiationContext,
};
use crate::tier::GraphTier;

struct Inner {
    cache: Arc<dyn GraphTier>,
    source: Arc<dyn GraphTier>,
    diagnostics: Diagnostics,
    backfill: BackfillQueue,
    config: StrataConfig,
}

/// Cache-aside accessor binding a cache tier to a source tier.
///
/// Cheap to clone; clones share tiers, diagnostics and the backfill queue.
/// Each operation yields exactly one envelope or one [`GraphError`]. Cache
/// problems never fail an operation; they are published on
/// [`Coordinator::diagnostics`].
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    /// Create a coordinator with the default configuration.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime, since the backfill consumer
    /// is spawned here.
    pub fn new(cache: Arc<dyn GraphTier>, source: Arc<dyn GraphTier>) -> Self {
        Self::with_config(cache, source, StrataConfig::default())
    }

    /// Create a coordinator with an explicit configuration.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn with_config(
        cache: Arc<dyn GraphTier>,
        source: Arc<dyn GraphTier>,
        config: StrataConfig,
    ) -> Self {
        let diagnostics = Diagnostics::new(config.diagnostics_capacity);
        let backfill = BackfillQueue::spawn(Arc::clone(&cache), diagnostics.clone());
        debug!(
            backfill = config.backfill_enabled,
            mirror_writes = config.mirror_writes,
            "Created coordinator"
        );
        Self {
            inner: Arc::new(Inner {
                cache,
                source,
                diagnostics,
                backfill,
                config,
            }),
        }
    }

    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::default()
    }

    /// Read every path addressed by `path_sets`, preferring the cache.
    pub async fn get(&self, path_sets: &[PathSet]) -> GraphResult<Envelope> {
        let ctx = self.context();
        self.run("get", negotiate_get(&ctx, path_sets)).await
    }

    /// Write `envelope` through to the source, then mirror it to the cache.
    pub async fn set(&self, envelope: Envelope) -> GraphResult<Envelope> {
        let ctx = self.context();
        self.run("set", negotiate_set(&ctx, envelope)).await
    }

    /// Invoke the function at `path` on the source, then mirror its result.
    pub async fn call(
        &self,
        path: &Path,
        args: &[Value],
        result_path_sets: &[PathSet],
    ) -> GraphResult<Envelope> {
        let ctx = self.context();
        self.run("call", negotiate_call(&ctx, path, args, result_path_sets))
            .await
    }

    /// Subscribe to non-fatal errors. Only events emitted after subscribing
    /// are delivered.
    pub fn diagnostics(&self) -> DiagnosticsReceiver {
        self.inner.diagnostics.subscribe()
    }

    pub fn config(&self) -> &StrataConfig {
        &self.inner.config
    }

    fn context(&self) -> NegotiationContext<'_> {
        NegotiationContext {
            cache: self.inner.cache.as_ref(),
            source: self.inner.source.as_ref(),
            diagnostics: &self.inner.diagnostics,
            backfill: &self.inner.backfill,
            config: &self.inner.config,
        }
    }

    /// Run one negotiation in its own span, turning a panic into `UNKNOWN`.
    async fn run<F>(&self, operation: &'static str, negotiation: F) -> GraphResult<Envelope>
    where
        F: Future<Output = GraphResult<Envelope>>,
    {
        let operation_id = Uuid::now_v7();
        let span = debug_span!("negotiation", operation, %operation_id);

        async move {
            match AssertUnwindSafe(negotiation).catch_unwind().await {
                Ok(Ok(envelope)) => {
                    debug!(paths = envelope.paths.len(), "Operation succeeded");
                    Ok(envelope)
                }
                Ok(Err(e)) => {
                    debug!(status = %e.status, error = %e, "Operation failed");
                    Err(e)
                }
                Err(panic) => {
                    let detail = panic_message(panic.as_ref());
                    error!(%detail, "Negotiation panicked");
                    Err(GraphError::unknown(detail))
                }
            }
        }
        .instrument(span)
        .await
    }
}

/// Builder for [`Coordinator`] that reports missing tiers as errors.
#[derive(Default)]
pub struct CoordinatorBuilder {
    cache: Option<Arc<dyn GraphTier>>,
    source: Option<Arc<dyn GraphTier>>,
    config: Option<StrataConfig>,
}

impl CoordinatorBuilder {
    pub fn cache(mut self, cache: Arc<dyn GraphTier>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn source(mut self, source: Arc<dyn GraphTier>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn config(mut self, config: StrataConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the coordinator.
    ///
    /// Fails when either tier is missing or the configuration is invalid.
    pub fn build(self) -> Result<Coordinator, ConfigError> {
        let cache = self.cache.ok_or_else(|| ConfigError::MissingRequired {
            field: "cache".to_string(),
        })?;
        let source = self.source.ok_or_else(|| ConfigError::MissingRequired {
            field: "source".to_string(),
        })?;
        let config = self.config.unwrap_or_default();
        config.validate()?;
        Ok(Coordinator::with_config(cache, source, config))
    }
}
