//! Tier collaborator contract.
//!
//! Both the cache tier and the source tier implement [`GraphTier`]. Every
//! operation yields exactly one envelope or one failure. Tiers whose native
//! surface is a stream implement [`StreamingTier`] instead and are adapted
//! with [`StreamTier`], which enforces the single-emission contract.

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use serde_json::Value;
use strata_core::{Envelope, Path, PathSet};
use thiserror::Error;

/// Failure reported by a tier.
///
/// The display text becomes the `detail` of the negotiation error raised
/// from it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TierError {
    #[error("{reason}")]
    Failed { reason: String },

    #[error("Tier emitted more than one result for {operation}")]
    MultipleEmissions { operation: &'static str },

    #[error("Tier completed without a result for {operation}")]
    NoEmission { operation: &'static str },

    #[error("Tier does not support {operation}")]
    Unsupported { operation: &'static str },
}

impl TierError {
    pub fn failed(reason: impl Into<String>) -> Self {
        TierError::Failed {
            reason: reason.into(),
        }
    }
}

pub type TierResult<T> = Result<T, TierError>;

/// A cache or source tier.
///
/// Implementations must be safe to share across tasks. The coordinator never
/// locks around tier calls; concurrent writes are the tier's concern.
#[async_trait]
pub trait GraphTier: Send + Sync {
    /// Fetch every path addressed by `path_sets`.
    ///
    /// The returned graph may be partial; missing values are detected by the
    /// caller.
    async fn get(&self, path_sets: &[PathSet]) -> TierResult<Envelope>;

    /// Store the values in `envelope` and return what was written.
    async fn set(&self, envelope: Envelope) -> TierResult<Envelope>;

    /// Invoke the function at `path` with `args`.
    ///
    /// Optional: the default fails with [`TierError::Unsupported`].
    async fn call(
        &self,
        path: &Path,
        args: &[Value],
        result_path_sets: &[PathSet],
    ) -> TierResult<Envelope> {
        let _ = (path, args, result_path_sets);
        Err(TierError::Unsupported { operation: "call" })
    }
}

/// Stream of tier results. A well-behaved tier emits one item and ends.
pub type TierStream = BoxStream<'static, TierResult<Envelope>>;

/// A tier whose operations are streams rather than single results.
pub trait StreamingTier: Send + Sync {
    fn get(&self, path_sets: &[PathSet]) -> TierStream;

    fn set(&self, envelope: Envelope) -> TierStream;

    fn call(&self, path: &Path, args: &[Value], result_path_sets: &[PathSet]) -> TierStream {
        let _ = (path, args, result_path_sets);
        stream::once(async { Err(TierError::Unsupported { operation: "call" }) }).boxed()
    }
}

/// Adapts a [`StreamingTier`] to [`GraphTier`].
pub struct StreamTier<T> {
    inner: T,
}

impl<T: StreamingTier> StreamTier<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[async_trait]
impl<T: StreamingTier> GraphTier for StreamTier<T> {
    async fn get(&self, path_sets: &[PathSet]) -> TierResult<Envelope> {
        single_emission("get", self.inner.get(path_sets)).await
    }

    async fn set(&self, envelope: Envelope) -> TierResult<Envelope> {
        single_emission("set", self.inner.set(envelope)).await
    }

    async fn call(
        &self,
        path: &Path,
        args: &[Value],
        result_path_sets: &[PathSet],
    ) -> TierResult<Envelope> {
        single_emission("call", self.inner.call(path, args, result_path_sets)).await
    }
}

/// Reduce a stream to its single item.
///
/// An error item is returned as-is. A value must be followed by the end of
/// the stream; a second item of either kind is a protocol violation.
pub async fn single_emission<T, S>(operation: &'static str, mut stream: S) -> TierResult<T>
where
    S: Stream<Item = TierResult<T>> + Unpin,
{
    let first = match stream.next().await {
        Some(item) => item?,
        None => return Err(TierError::NoEmission { operation }),
    };
    if stream.next().await.is_some() {
        return Err(TierError::MultipleEmissions { operation });
    }
    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{path, GraphNode};

    fn envelope(value: &str) -> Envelope {
        let mut graph = GraphNode::empty();
        graph.set_path(&path!["v"], GraphNode::atom(value));
        Envelope::new(vec![path!["v"]], graph)
    }

    #[tokio::test]
    async fn test_single_emission_accepts_one_item() {
        let items = stream::iter(vec![Ok(envelope("a"))]);
        let result = single_emission("get", items).await;
        assert_eq!(result, Ok(envelope("a")));
    }

    #[tokio::test]
    async fn test_single_emission_rejects_empty_and_multiple() {
        let none = stream::iter(Vec::<TierResult<Envelope>>::new());
        assert_eq!(
            single_emission("get", none).await,
            Err(TierError::NoEmission { operation: "get" })
        );

        let two = stream::iter(vec![Ok(envelope("a")), Ok(envelope("b"))]);
        assert_eq!(
            single_emission("set", two).await,
            Err(TierError::MultipleEmissions { operation: "set" })
        );
    }

    #[tokio::test]
    async fn test_single_emission_passes_error_through() {
        let failing = stream::iter(vec![Err(TierError::failed("boom")), Ok(envelope("a"))]);
        assert_eq!(
            single_emission("get", failing).await,
            Err(TierError::failed("boom"))
        );
    }

    struct Chatty;

    impl StreamingTier for Chatty {
        fn get(&self, _path_sets: &[PathSet]) -> TierStream {
            stream::iter(vec![Ok(envelope("a")), Ok(envelope("b"))]).boxed()
        }

        fn set(&self, envelope: Envelope) -> TierStream {
            stream::once(async move { Ok(envelope) }).boxed()
        }
    }

    #[tokio::test]
    async fn test_stream_tier_adapter() {
        let tier = StreamTier::new(Chatty);
        assert_eq!(
            GraphTier::get(&tier, &[]).await,
            Err(TierError::MultipleEmissions { operation: "get" })
        );
        assert_eq!(GraphTier::set(&tier, envelope("x")).await, Ok(envelope("x")));
        assert_eq!(
            GraphTier::call(&tier, &path!["f"], &[], &[]).await,
            Err(TierError::Unsupported { operation: "call" })
        );
    }

    #[test]
    fn test_failed_display_is_reason() {
        assert_eq!(TierError::failed("disk full").to_string(), "disk full");
    }
}
