//! Background cache backfill.
//!
//! Source results are written back to the cache off the critical path of
//! `get`. One consumer task applies queued writes in arrival order; failures
//! go to the diagnostic broadcast and never reach the caller.

use std::sync::Arc;

use strata_core::constants::MSG_BACKFILL_FAILED;
use strata_core::{Envelope, GraphError};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::diagnostics::Diagnostics;
use crate::negotiate::shielded;
use crate::tier::GraphTier;

/// Sending half of the backfill queue.
///
/// Dropping every clone ends the consumer task after it drains the queue.
#[derive(Debug, Clone)]
pub struct BackfillQueue {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl BackfillQueue {
    /// Start the consumer task writing into `cache`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn(cache: Arc<dyn GraphTier>, diagnostics: Diagnostics) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_backfill(cache, diagnostics, rx));
        Self { tx }
    }

    /// Queue `envelope` for writing. Never blocks.
    pub fn enqueue(&self, envelope: Envelope) {
        let paths = envelope.paths.len();
        if self.tx.send(envelope).is_err() {
            warn!(paths, "Backfill consumer has stopped; dropping cache update");
        } else {
            debug!(paths, "Queued cache backfill");
        }
    }
}

async fn run_backfill(
    cache: Arc<dyn GraphTier>,
    diagnostics: Diagnostics,
    mut rx: mpsc::UnboundedReceiver<Envelope>,
) {
    while let Some(envelope) = rx.recv().await {
        let paths = envelope.paths.len();
        match shielded(cache.set(envelope)).await {
            Ok(_) => {
                debug!(paths, "Backfilled cache");
            }
            Err(e) => {
                warn!(paths, error = %e, "Cache backfill failed");
                diagnostics.emit(GraphError::cache_fail(MSG_BACKFILL_FAILED, e.to_string()));
            }
        }
    }
    debug!("Backfill queue closed");
}
