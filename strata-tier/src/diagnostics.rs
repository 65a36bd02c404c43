//! Diagnostic broadcast.
//!
//! Non-fatal errors (cache failures, unmaterialized cache paths, failed
//! backfills) are published here instead of failing the operation that hit
//! them. Every subscriber sees every event emitted after it subscribed.
//! Events emitted while nobody is subscribed are dropped.

use futures_util::stream::Stream;
use strata_core::GraphError;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

/// Publishing side of the diagnostic broadcast.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    tx: broadcast::Sender<GraphError>,
}

impl Diagnostics {
    /// Create a broadcast buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish a non-fatal error to every current subscriber.
    pub fn emit(&self, error: GraphError) {
        let status = error.status;
        match self.tx.send(error) {
            Ok(receivers) => {
                debug!(%status, receivers, "Emitted diagnostic");
            }
            Err(_) => {
                debug!(%status, "No subscribers for diagnostic");
            }
        }
    }

    pub fn subscribe(&self) -> DiagnosticsReceiver {
        DiagnosticsReceiver {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Subscription to the diagnostic broadcast.
///
/// The feed ends only when the coordinator that owns it is dropped.
#[derive(Debug)]
pub struct DiagnosticsReceiver {
    rx: broadcast::Receiver<GraphError>,
}

impl DiagnosticsReceiver {
    /// Next diagnostic, or `None` once the feed has closed.
    ///
    /// A subscriber that falls more than the broadcast capacity behind skips
    /// the oldest events.
    pub async fn recv(&mut self) -> Option<GraphError> {
        loop {
            match self.rx.recv().await {
                Ok(error) => return Some(error),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Diagnostics subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next already-buffered diagnostic, without waiting.
    pub fn try_recv(&mut self) -> Option<GraphError> {
        loop {
            match self.rx.try_recv() {
                Ok(error) => return Some(error),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Diagnostics subscriber lagged");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = GraphError> + Send + 'static {
        BroadcastStream::new(self.rx).filter_map(|result| result.ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{ErrorStatus, GraphError};

    #[tokio::test]
    async fn test_every_subscriber_sees_events() {
        let diagnostics = Diagnostics::new(8);
        let mut first = diagnostics.subscribe();
        let mut second = diagnostics.subscribe();
        assert_eq!(diagnostics.subscriber_count(), 2);

        diagnostics.emit(GraphError::cache_fail("cache down", "io"));

        assert_eq!(first.recv().await.map(|e| e.status), Some(ErrorStatus::CacheFail));
        assert_eq!(second.recv().await.map(|e| e.status), Some(ErrorStatus::CacheFail));
        assert!(first.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_events_without_subscribers_are_dropped() {
        let diagnostics = Diagnostics::new(8);
        diagnostics.emit(GraphError::cache_fail("early", "nobody listening"));

        let mut late = diagnostics.subscribe();
        assert!(late.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber_skips_oldest() {
        let diagnostics = Diagnostics::new(2);
        let mut rx = diagnostics.subscribe();
        for i in 0..4 {
            diagnostics.emit(GraphError::cache_fail(format!("event {i}"), "x"));
        }
        assert_eq!(rx.recv().await.map(|e| e.message), Some("event 2".to_string()));
        assert_eq!(rx.recv().await.map(|e| e.message), Some("event 3".to_string()));
    }

    #[tokio::test]
    async fn test_feed_closes_with_sender() {
        let diagnostics = Diagnostics::new(4);
        let mut rx = diagnostics.subscribe();
        drop(diagnostics);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_into_stream_yields_events() {
        let diagnostics = Diagnostics::new(4);
        let stream = diagnostics.subscribe().into_stream();
        diagnostics.emit(GraphError::cache_fail("a", "x"));
        drop(diagnostics);

        let events: Vec<GraphError> = stream.collect().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "a");
    }
}
