use std::sync::Arc;
use std::time::Duration;

use ingest_config::shared::PipelineConfig;
use tracing::info;

use crate::bail;
use crate::concurrency::queue::DrainableQueue;
use crate::coordinator::{ShutdownCoordinator, ShutdownReport};
use crate::error::{ErrorKind, IngestResult};
use crate::extraction::EntityExtractor;
use crate::persistence::Persister;
use crate::types::{Post, ProcessedPost};
use crate::workers::base::{SaverStats, WorkerStats};
use crate::workers::ingest::IngestWorker;
use crate::workers::pool::Pool;
use crate::workers::saver::EntitySaver;

#[derive(Debug)]
enum PipelineState {
    NotStarted,
    Started {
        input: Arc<DrainableQueue<Post>>,
        output: Arc<DrainableQueue<ProcessedPost>>,
        workers: Pool<WorkerStats>,
        savers: Pool<SaverStats>,
    },
}

/// Ingestion pipeline: input queue, worker pool, output queue and saver pool.
///
/// Posts put on [`Pipeline::input_queue`] are processed by the workers, aggregated per
/// publication and persisted by the savers through the injected [`Persister`].
#[derive(Debug)]
pub struct Pipeline<E, P> {
    config: Arc<PipelineConfig>,
    extractor: Arc<E>,
    persister: P,
    state: PipelineState,
}

impl<E, P> Pipeline<E, P>
where
    E: EntityExtractor,
    P: Persister + Clone + Send + Sync + 'static,
{
    pub fn new(config: PipelineConfig, extractor: E, persister: P) -> Self {
        Self {
            config: Arc::new(config),
            extractor: Arc::new(extractor),
            persister,
            state: PipelineState::NotStarted,
        }
    }

    /// Creates both queues and spawns both pools.
    pub async fn start(&mut self) -> IngestResult<()> {
        if !matches!(self.state, PipelineState::NotStarted) {
            bail!(ErrorKind::InvalidState, "The pipeline was already started");
        }

        info!(
            workers = self.config.workers,
            savers = self.config.savers,
            agg_cache_size = self.config.agg_cache_size,
            persister = P::name(),
            "starting pipeline"
        );

        let input = Arc::new(match self.config.input_queue_capacity {
            Some(capacity) => DrainableQueue::with_capacity(&self.config.input_queue_name, capacity),
            None => DrainableQueue::new(&self.config.input_queue_name),
        });
        let output = Arc::new(DrainableQueue::new(&self.config.output_queue_name));

        let workers = Pool::spawn("workers", self.config.workers, |id| {
            IngestWorker::new(
                id,
                input.clone(),
                output.clone(),
                self.extractor.clone(),
                self.config.agg_cache_size,
            )
        });

        let savers = Pool::spawn("savers", self.config.savers, |id| {
            EntitySaver::new(
                id,
                output.clone(),
                self.persister.clone(),
                self.config.top_k_entities,
            )
        });

        self.state = PipelineState::Started {
            input,
            output,
            workers,
            savers,
        };

        Ok(())
    }

    /// Returns the queue producers write to, once the pipeline is started.
    pub fn input_queue(&self) -> Option<Arc<DrainableQueue<Post>>> {
        match &self.state {
            PipelineState::Started { input, .. } => Some(input.clone()),
            PipelineState::NotStarted => None,
        }
    }

    /// Returns the queue workers forward aggregates to, once the pipeline is started.
    pub fn output_queue(&self) -> Option<Arc<DrainableQueue<ProcessedPost>>> {
        match &self.state {
            PipelineState::Started { output, .. } => Some(output.clone()),
            PipelineState::NotStarted => None,
        }
    }

    /// Shuts the pipeline down and returns the report of every stage.
    ///
    /// The input stage is drained and joined before the output queue is closed, so every
    /// aggregate produced by the workers reaches the savers.
    pub async fn shutdown(self) -> IngestResult<ShutdownReport> {
        let PipelineState::Started {
            input,
            output,
            workers,
            savers,
        } = self.state
        else {
            bail!(ErrorKind::InvalidState, "The pipeline was never started");
        };

        info!("shutting down pipeline");

        let mut coordinator =
            ShutdownCoordinator::new(Duration::from_millis(self.config.shutdown_timeout_ms));
        coordinator.add_stage(input, Box::new(workers));
        coordinator.add_stage(output, Box::new(savers));

        Ok(coordinator.shutdown().await)
    }

    /// Shuts the pipeline down, failing if any pool member failed or had to be terminated.
    pub async fn shutdown_and_wait(self) -> IngestResult<()> {
        self.shutdown().await?.into_result()
    }
}
