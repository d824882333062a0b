use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::concurrency::queue::{DrainableQueue, Envelope};
use crate::concurrency::shutdown::ShutdownRx;
use crate::error::IngestResult;
use crate::extraction::EntityExtractor;
use crate::types::{Post, ProcessedPost};
use crate::workers::base::{MemberId, MemberKind, PoolMember, WorkerStats};
use crate::workers::cache::AggregationCache;

/// Worker extracting entities from posts and forwarding per-publication aggregates.
///
/// Each worker owns its [`AggregationCache`]. Extraction runs on the blocking thread pool
/// since it is CPU bound. A post whose extraction fails is logged and skipped.
#[derive(Debug)]
pub struct IngestWorker<E> {
    id: MemberId,
    input: Arc<DrainableQueue<Post>>,
    output: Arc<DrainableQueue<ProcessedPost>>,
    extractor: Arc<E>,
    cache: AggregationCache,
}

impl<E> IngestWorker<E>
where
    E: EntityExtractor,
{
    pub fn new(
        id: MemberId,
        input: Arc<DrainableQueue<Post>>,
        output: Arc<DrainableQueue<ProcessedPost>>,
        extractor: Arc<E>,
        agg_cache_size: usize,
    ) -> Self {
        Self {
            id,
            input,
            output,
            extractor,
            cache: AggregationCache::new(agg_cache_size),
        }
    }

    /// Extracts the entities of `post`, returning [`None`] if extraction failed.
    async fn extract(&self, post: Post) -> Option<ProcessedPost> {
        let Post {
            content,
            publication,
        } = post;
        let extractor = self.extractor.clone();

        match tokio::task::spawn_blocking(move || extractor.extract(&content)).await {
            Ok(Ok(entities)) => Some(ProcessedPost::from_post(publication, entities)),
            Ok(Err(err)) => {
                warn!(
                    worker_id = self.id,
                    %publication,
                    error = %err,
                    "entity extraction failed, skipping post"
                );
                None
            }
            Err(err) => {
                warn!(
                    worker_id = self.id,
                    %publication,
                    error = %err,
                    "entity extractor panicked, skipping post"
                );
                None
            }
        }
    }

    async fn flush(&mut self, stats: &mut WorkerStats) -> IngestResult<()> {
        let aggregates = self.cache.flush();
        if aggregates.is_empty() {
            return Ok(());
        }

        let forwarded = self.output.put_many(aggregates).await?;
        stats.flushes += 1;
        stats.forwarded += forwarded as u64;

        debug!(worker_id = self.id, forwarded, "flushed aggregation cache");

        Ok(())
    }
}

impl<E> PoolMember for IngestWorker<E>
where
    E: EntityExtractor,
{
    type Stats = WorkerStats;

    fn kind() -> MemberKind {
        MemberKind::Worker
    }

    async fn run(mut self, mut shutdown_rx: ShutdownRx) -> IngestResult<WorkerStats> {
        let mut stats = WorkerStats::default();
        let mut termination_requested = false;

        debug!(worker_id = self.id, queue = %self.input.name(), "ingest worker started");

        loop {
            let envelope = if termination_requested {
                self.input.get().await
            } else {
                tokio::select! {
                    biased;

                    _ = shutdown_rx.wait() => {
                        info!(worker_id = self.id, "termination requested, draining input queue");
                        self.input.close();
                        termination_requested = true;
                        continue;
                    }
                    envelope = self.input.get() => envelope,
                }
            };

            let Envelope::Item(post) = envelope else {
                break;
            };
            stats.received += 1;

            let Some(processed) = self.extract(post).await else {
                stats.failed += 1;
                continue;
            };

            if self.cache.merge(processed) {
                self.flush(&mut stats).await?;
            }
        }

        self.flush(&mut stats).await?;

        info!(worker_id = self.id, ?stats, "ingest worker finished");

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concurrency::shutdown::create_shutdown_channel;
    use crate::extraction::RuleBasedExtractor;

    fn queues() -> (Arc<DrainableQueue<Post>>, Arc<DrainableQueue<ProcessedPost>>) {
        (
            Arc::new(DrainableQueue::new("iqueue")),
            Arc::new(DrainableQueue::new("oqueue")),
        )
    }

    fn drain(queue: &DrainableQueue<ProcessedPost>) -> Vec<ProcessedPost> {
        let mut drained = Vec::new();
        while let Some(Envelope::Item(post)) = queue.try_get() {
            drained.push(post);
        }
        drained
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_worker_aggregates_and_flushes_on_stop() {
        let (input, output) = queues();
        let worker = IngestWorker::new(
            0,
            input.clone(),
            output.clone(),
            Arc::new(RuleBasedExtractor::new()),
            10,
        );
        let (_shutdown_tx, shutdown_rx) = create_shutdown_channel();

        input
            .put(Post::new("Apple released a new iPhone in California", "tech"))
            .await
            .unwrap();
        input.put(Post::new("Apple opened in Paris", "tech")).await.unwrap();
        input.close();

        let stats = worker.run(shutdown_rx).await.unwrap();

        assert_eq!(stats.received, 2);
        assert_eq!(stats.forwarded, 1);
        let forwarded = drain(&output);
        assert_eq!(forwarded.len(), 1);
        assert_eq!(forwarded[0].articles, 2);
        assert_eq!(forwarded[0].entities.get("apple"), Some(&2));
        assert_eq!(forwarded[0].entities.get("paris"), Some(&1));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_worker_flushes_when_cache_is_full() {
        let (input, output) = queues();
        let worker = IngestWorker::new(
            0,
            input.clone(),
            output.clone(),
            Arc::new(RuleBasedExtractor::new()),
            2,
        );
        let (_shutdown_tx, shutdown_rx) = create_shutdown_channel();

        for publication in ["a", "b", "c"] {
            input.put(Post::new("Apple", publication)).await.unwrap();
        }
        input.close();

        let stats = worker.run(shutdown_rx).await.unwrap();

        assert_eq!(stats.flushes, 2);
        let publications: Vec<String> = drain(&output)
            .into_iter()
            .map(|post| post.publication)
            .collect();
        assert_eq!(publications.len(), 3);
        assert_eq!(publications[2], "c");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_extraction_failure_skips_post() {
        let (input, output) = queues();
        let worker = IngestWorker::new(
            0,
            input.clone(),
            output.clone(),
            Arc::new(RuleBasedExtractor::new()),
            10,
        );
        let (_shutdown_tx, shutdown_rx) = create_shutdown_channel();

        input.put(Post::new("   ", "tech")).await.unwrap();
        input.put(Post::new("Google", "tech")).await.unwrap();
        input.close();

        let stats = worker.run(shutdown_rx).await.unwrap();

        assert_eq!(stats.received, 2);
        assert_eq!(stats.failed, 1);
        let forwarded = drain(&output);
        assert_eq!(forwarded[0].articles, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_termination_request_closes_input_and_drains() {
        let (input, output) = queues();
        let worker = IngestWorker::new(
            0,
            input.clone(),
            output.clone(),
            Arc::new(RuleBasedExtractor::new()),
            10,
        );
        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();

        input.put(Post::new("Apple", "tech")).await.unwrap();
        shutdown_tx.shutdown();

        let stats = worker.run(shutdown_rx).await.unwrap();

        assert!(input.is_closed());
        assert_eq!(stats.received, 1);
        assert_eq!(drain(&output).len(), 1);
    }
}
