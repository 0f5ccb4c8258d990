//! Concurrent ingestion pipeline
//!
//! Turns a raw manifest stream into a completed [`ResourceIndex`], or fails.
//!
//! Topology: a bounded pool of decode workers feeds a bounded channel sized
//! to the worker count (back-pressure when decoding outruns aggregation);
//! exactly one aggregator task owns the index and drains that channel
//! sequentially, which lets the uniqueness invariant be checked without a
//! lock; a coordinator task drains an error channel fed by everything else,
//! records the most recent error, and cancels the shared token in fail-fast
//! mode. Cancellation is cooperative: it is observed at channel operations,
//! in-flight decodes run to completion and their results are discarded.
//!
//! Completion protocol: submission ends, the pool is drained, the resource
//! sender is dropped, the aggregator is awaited (returning the index by
//! value), the error sender is dropped, the coordinator is awaited. Only
//! after both drains is the index readable; the hand-off by value makes an
//! early read impossible by construction.

use tokio::io::AsyncBufRead;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::crd::Resource;
use crate::decode;
use crate::index::{ResourceIndex, ResourceKey};
use crate::yaml::DocumentSplitter;
use crate::{Error, Result};

/// Run the ingestion pipeline over a manifest stream
///
/// `workers` bounds decode parallelism (clamped to at least 1). With
/// `fail_fast`, the first error cancels remaining work; otherwise the whole
/// stream is decoded and indexed and only the last error is reported.
pub async fn run<R>(input: R, workers: usize, fail_fast: bool) -> Result<ResourceIndex>
where
    R: AsyncBufRead + Unpin,
{
    let workers = workers.max(1);
    let cancel = CancellationToken::new();

    let (resource_tx, resource_rx) = mpsc::channel::<(ResourceKey, Resource)>(workers);
    let (error_tx, error_rx) = mpsc::unbounded_channel::<Error>();

    let aggregator = tokio::spawn(aggregate(resource_rx, error_tx.clone(), cancel.clone()));
    let coordinator = tokio::spawn(coordinate(error_rx, cancel.clone(), fail_fast));

    let mut pool = JoinSet::new();
    let mut splitter = DocumentSplitter::new(input);

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let document = match splitter.next_document().await {
            Ok(Some(document)) => document,
            Ok(None) => break,
            Err(err) => {
                let _ = error_tx.send(err.into());
                break;
            }
        };

        // bound in-flight decodes to the worker count
        while pool.len() >= workers {
            if let Some(joined) = pool.join_next().await {
                report_fault(joined, &error_tx);
            }
        }

        let resource_tx = resource_tx.clone();
        let cancel = cancel.clone();
        pool.spawn(async move { decode_one(document, resource_tx, cancel).await });
    }

    // drain the pool, then close the resource channel so the aggregator
    // observes end of stream
    while let Some(joined) = pool.join_next().await {
        report_fault(joined, &error_tx);
    }
    drop(resource_tx);

    let index = aggregator
        .await
        .map_err(|err| Error::worker_fault(format!("aggregator: {err}")))?;

    // all error producers are gone once the aggregator returned
    drop(error_tx);
    let last_error = coordinator
        .await
        .map_err(|err| Error::worker_fault(format!("coordinator: {err}")))?;

    if let Some(err) = last_error {
        return Err(err);
    }

    tracing::info!(count = index.len(), "manifest stream indexed");
    Ok(index)
}

/// Decode one document and hand the result to the aggregator
///
/// Decode rejections are dropped: tolerant ingestion skips documents that do
/// not match a known schema.
async fn decode_one(
    document: String,
    resource_tx: mpsc::Sender<(ResourceKey, Resource)>,
    cancel: CancellationToken,
) {
    match decode::decode(&document) {
        Ok((key, resource)) => {
            tracing::debug!(key = %key, kind = resource.kind(), "decoded manifest");
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = resource_tx.send((key, resource)) => {}
            }
        }
        Err(rejection) => {
            tracing::debug!(reason = %rejection, "dropping undecodable document");
        }
    }
}

/// Drain decoded resources into the index; single writer by construction
///
/// A collision is reported but draining continues, so that in non-fail-fast
/// mode the rest of the stream is still decoded and indexed (the earlier
/// resource stays; the duplicate is discarded).
async fn aggregate(
    mut resource_rx: mpsc::Receiver<(ResourceKey, Resource)>,
    error_tx: mpsc::UnboundedSender<Error>,
    cancel: CancellationToken,
) -> ResourceIndex {
    let mut index = ResourceIndex::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            next = resource_rx.recv() => match next {
                Some((key, resource)) => {
                    if let Err(err) = index.insert(key, resource) {
                        let _ = error_tx.send(err);
                    }
                }
                None => break,
            }
        }
    }

    index
}

/// Record the most recent error; cancel everything in fail-fast mode
async fn coordinate(
    mut error_rx: mpsc::UnboundedReceiver<Error>,
    cancel: CancellationToken,
    fail_fast: bool,
) -> Option<Error> {
    let mut last = None;

    while let Some(err) = error_rx.recv().await {
        tracing::error!(error = %err, "ingestion error");
        if fail_fast {
            cancel.cancel();
        }
        last = Some(err);
    }

    last
}

/// Map an unexpected worker fault to a reported error at the pool boundary
///
/// A panic inside a decode task must never take the process down; it
/// surfaces as a `WorkerFault` like any other pipeline error.
fn report_fault(joined: std::result::Result<(), JoinError>, error_tx: &mpsc::UnboundedSender<Error>) {
    if let Err(join_err) = joined {
        if join_err.is_cancelled() {
            return;
        }
        let _ = error_tx.send(Error::worker_fault(join_err.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORKSPACE: &str = r#"
apiVersion: tf.upbound.io/v1beta1
kind: Workspace
metadata:
  name: ws1
  namespace: default
spec:
  providerConfigRef:
    name: pc1
  forProvider:
    source: Inline
    module: "resource \"x\" \"y\" {}"
"#;

    const PROVIDER_CONFIG: &str = r#"
apiVersion: tf.upbound.io/v1beta1
kind: ProviderConfig
metadata:
  name: pc1
spec: {}
"#;

    fn stream(docs: &[&str]) -> Vec<u8> {
        docs.join("\n---\n").into_bytes()
    }

    #[tokio::test]
    async fn test_stream_to_index() {
        let input = stream(&[WORKSPACE, PROVIDER_CONFIG]);
        let index = run(input.as_slice(), 4, false).await.unwrap();

        assert_eq!(index.len(), 2);
        assert!(index
            .lookup(&ResourceKey::terraform("ProviderConfig", "pc1"))
            .is_some());
        assert!(index
            .lookup(&ResourceKey::new(
                crate::crd::GROUP,
                "Workspace",
                Some("default".into()),
                "ws1"
            ))
            .is_some());
    }

    /// Story: undecodable documents are dropped, not fatal
    #[tokio::test]
    async fn story_tolerant_ingestion_skips_junk() {
        let input = stream(&["just some text", WORKSPACE, "{ \"no\": \"identity\" }"]);
        let index = run(input.as_slice(), 2, false).await.unwrap();
        assert_eq!(index.len(), 1);
    }

    /// Story: a duplicate key fails the run but the stream is still drained
    #[tokio::test]
    async fn story_collision_is_fatal_but_not_abortive() {
        let input = stream(&[PROVIDER_CONFIG, WORKSPACE, PROVIDER_CONFIG]);
        let err = run(input.as_slice(), 2, false).await.unwrap_err();
        match err {
            Error::Collision { key } => {
                assert_eq!(key, ResourceKey::terraform("ProviderConfig", "pc1"));
            }
            unexpected => panic!("expected Collision, got {unexpected}"),
        }
    }

    #[tokio::test]
    async fn test_collision_with_fail_fast() {
        let input = stream(&[PROVIDER_CONFIG, PROVIDER_CONFIG, WORKSPACE]);
        let err = run(input.as_slice(), 1, true).await.unwrap_err();
        assert!(matches!(err, Error::Collision { .. }));
    }

    #[tokio::test]
    async fn test_empty_stream_yields_empty_index() {
        let index = run(&b""[..], 4, false).await.unwrap();
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_single_worker_preserves_correctness() {
        let input = stream(&[WORKSPACE, PROVIDER_CONFIG]);
        let index = run(input.as_slice(), 1, false).await.unwrap();
        assert_eq!(index.len(), 2);
    }

    /// A panicking task surfaces as a WorkerFault through the pool boundary
    #[tokio::test]
    async fn test_worker_panic_maps_to_fault() {
        let (error_tx, mut error_rx) = mpsc::unbounded_channel();

        let mut pool = JoinSet::new();
        pool.spawn(async { panic!("decode exploded") });
        while let Some(joined) = pool.join_next().await {
            report_fault(joined, &error_tx);
        }
        drop(error_tx);

        let err = error_rx.recv().await.expect("fault reported");
        match err {
            Error::WorkerFault { message } => assert!(message.contains("panic")),
            unexpected => panic!("expected WorkerFault, got {unexpected}"),
        }
        assert!(error_rx.recv().await.is_none());
    }
}
