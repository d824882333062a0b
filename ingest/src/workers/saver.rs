use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::concurrency::queue::{DrainableQueue, Envelope};
use crate::concurrency::shutdown::ShutdownRx;
use crate::error::IngestResult;
use crate::persistence::Persister;
use crate::types::ProcessedPost;
use crate::workers::base::{MemberId, MemberKind, PoolMember, SaverStats};

/// Saver persisting aggregated results as increment records.
///
/// Every aggregate is transformed into one record per entity, limited to the `top_k` most
/// frequent entities. A record the persister rejects is logged and the remaining records are
/// still written.
#[derive(Debug)]
pub struct EntitySaver<P> {
    id: MemberId,
    queue: Arc<DrainableQueue<ProcessedPost>>,
    persister: P,
    top_k: usize,
}

impl<P> EntitySaver<P>
where
    P: Persister + Send + Sync + 'static,
{
    pub fn new(
        id: MemberId,
        queue: Arc<DrainableQueue<ProcessedPost>>,
        persister: P,
        top_k: usize,
    ) -> Self {
        Self {
            id,
            queue,
            persister,
            top_k,
        }
    }

    async fn save(&self, post: ProcessedPost, stats: &mut SaverStats) {
        for record in post.transform_for_database(self.top_k) {
            match self.persister.persist(&record).await {
                Ok(()) => stats.persisted += 1,
                Err(err) => {
                    stats.failed += 1;
                    warn!(
                        saver_id = self.id,
                        persister = P::name(),
                        publication = %record.publication,
                        record_id = %record.record_id,
                        error = %err,
                        "failed to persist record, continuing"
                    );
                }
            }
        }

        if let Err(err) = self
            .persister
            .increment_publication(&post.publication, post.articles)
            .await
        {
            warn!(
                saver_id = self.id,
                persister = P::name(),
                publication = %post.publication,
                error = %err,
                "failed to increment publication articles, continuing"
            );
        }
    }
}

impl<P> PoolMember for EntitySaver<P>
where
    P: Persister + Send + Sync + 'static,
{
    type Stats = SaverStats;

    fn kind() -> MemberKind {
        MemberKind::Saver
    }

    async fn run(self, mut shutdown_rx: ShutdownRx) -> IngestResult<SaverStats> {
        let mut stats = SaverStats::default();
        let mut termination_requested = false;

        debug!(saver_id = self.id, queue = %self.queue.name(), "saver started");

        loop {
            let envelope = if termination_requested {
                self.queue.get().await
            } else {
                tokio::select! {
                    biased;

                    _ = shutdown_rx.wait() => {
                        info!(saver_id = self.id, "termination requested, draining output queue");
                        self.queue.close();
                        termination_requested = true;
                        continue;
                    }
                    envelope = self.queue.get() => envelope,
                }
            };

            let Envelope::Item(post) = envelope else {
                break;
            };
            stats.received += 1;

            self.save(post, &mut stats).await;
        }

        info!(saver_id = self.id, ?stats, "saver finished");

        Ok(stats)
    }
}
