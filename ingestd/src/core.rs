use std::io;

use ingest::extraction::{EntityExtractor, RuleBasedExtractor};
use ingest::persistence::Persister;
use ingest::persistence::memory::MemoryPersister;
use ingest::persistence::noop::NoopPersister;
use ingest::persistence::postgres::PostgresPersister;
use ingest::pipeline::Pipeline;
use ingest::supervisor::Supervisor;
use ingest_config::shared::{
    ExtractionConfig, GatewayConfig, IngestConfig, PersistenceConfig, PgConnectionConfig,
    PipelineConfig, ValidationError,
};
use ingest_gateway::routes::QueueRegistry;
use ingest_gateway::startup::{GatewayHandle, GatewayServer, resolve_secret};
use sqlx::postgres::PgPoolOptions;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{IngestdError, IngestdResult};
use crate::migrations::apply_store_migrations;

/// Starts the daemon with the provided configuration and runs it until shutdown is requested.
///
/// Signal handlers are installed before migrations and pipeline startup, so SIGINT or SIGTERM
/// during startup triggers a regular shutdown once the pipeline is up.
///
/// The persister is chosen from the configuration. Each variant monomorphizes its own
/// pipeline, so the savers call the persister without dynamic dispatch.
pub async fn start_ingestd_with_config(config: IngestConfig) -> IngestdResult<()> {
    info!("starting ingestd");

    log_config(&config);

    let extractor = build_extractor(&config.extraction)?;
    let supervisor = Supervisor::new()?;

    match &config.persistence {
        PersistenceConfig::Noop => {
            run_pipeline(config, extractor, NoopPersister, supervisor).await?;
        }
        PersistenceConfig::Memory => {
            warn!("memory persistence is for local development, every count is lost on exit");
            run_pipeline(config, extractor, MemoryPersister::new(), supervisor).await?;
        }
        PersistenceConfig::Postgres {
            connection,
            max_connections,
        } => {
            let connection = connection_config(connection.as_ref())?;
            apply_store_migrations(connection).await?;

            let pool = PgPoolOptions::new()
                .max_connections(*max_connections)
                .connect_lazy_with(connection.connect_options());
            let persister = PostgresPersister::new(pool.clone());

            let result = run_pipeline(config, extractor, persister, supervisor).await;
            pool.close().await;
            result?;
        }
    }

    info!("ingestd completed");

    Ok(())
}

/// Returns the Postgres connection, failing when none is configured.
fn connection_config(
    connection: Option<&PgConnectionConfig>,
) -> IngestdResult<&PgConnectionConfig> {
    connection.ok_or_else(|| IngestdError::config(ValidationError::MissingConnection))
}

/// Builds the extractor, failing on unknown skip labels.
fn build_extractor(config: &ExtractionConfig) -> IngestdResult<RuleBasedExtractor> {
    let extractor = RuleBasedExtractor::with_skip_labels(&config.skip_labels)
        .map_err(IngestdError::config)?
        .with_max_text_len(config.max_text_len);

    Ok(extractor)
}

async fn run_pipeline<P>(
    config: IngestConfig,
    extractor: RuleBasedExtractor,
    persister: P,
    supervisor: Supervisor,
) -> IngestdResult<()>
where
    P: Persister + Clone + Send + Sync + 'static,
{
    let IngestConfig {
        pipeline: pipeline_config,
        gateway: gateway_config,
        ..
    } = config;

    let mut pipeline = Pipeline::new(pipeline_config, extractor, persister);
    pipeline.start().await?;

    let gateway = match start_gateway(&gateway_config, &pipeline) {
        Ok(gateway) => gateway,
        Err(err) => {
            warn!(error = %err, "gateway failed to start, shutting down the pipeline");
            pipeline.shutdown_and_wait().await?;
            return Err(err.into());
        }
    };

    let result = supervisor
        .supervise(|| pipeline.shutdown_and_wait())
        .await;

    // The gateway keeps answering until the input queue is drained, rejecting new posts.
    let gateway_result = match gateway {
        Some(gateway) => gateway.stop().await,
        None => Ok(()),
    };

    result?;
    gateway_result?;

    Ok(())
}

/// Gateway server running on its own task.
struct RunningGateway {
    handle: GatewayHandle,
    task: JoinHandle<io::Result<()>>,
}

impl RunningGateway {
    async fn stop(self) -> io::Result<()> {
        self.handle.stop().await;

        match self.task.await {
            Ok(result) => result,
            Err(err) => Err(io::Error::other(err)),
        }
    }
}

fn start_gateway<E, P>(
    config: &GatewayConfig,
    pipeline: &Pipeline<E, P>,
) -> io::Result<Option<RunningGateway>>
where
    E: EntityExtractor,
    P: Persister + Clone + Send + Sync + 'static,
{
    if !config.enabled {
        info!("gateway disabled, posts can only be submitted in process");
        return Ok(None);
    }

    let Some(input) = pipeline.input_queue() else {
        return Err(io::Error::other("the pipeline has no input queue"));
    };

    let secret = resolve_secret(config);
    let registry = QueueRegistry::new().with_queue(input);

    let server = GatewayServer::build(config, secret, registry)?;
    let handle = server.handle();
    let task = tokio::spawn(server.run_until_stopped());

    Ok(Some(RunningGateway { handle, task }))
}

fn log_config(config: &IngestConfig) {
    log_pipeline_config(&config.pipeline);
    log_gateway_config(&config.gateway);
    log_persistence_config(&config.persistence);
    log_extraction_config(&config.extraction);
}

fn log_pipeline_config(config: &PipelineConfig) {
    debug!(
        input_queue = config.input_queue_name,
        output_queue = config.output_queue_name,
        input_queue_capacity = config.input_queue_capacity,
        workers = config.workers,
        savers = config.savers,
        agg_cache_size = config.agg_cache_size,
        top_k_entities = config.top_k_entities,
        shutdown_timeout_ms = config.shutdown_timeout_ms,
        "pipeline config"
    );
}

fn log_gateway_config(config: &GatewayConfig) {
    debug!(
        enabled = config.enabled,
        host = config.host,
        port = config.port,
        secret_configured = config.secret.is_some(),
        "gateway config"
    );
}

fn log_persistence_config(config: &PersistenceConfig) {
    match config {
        PersistenceConfig::Noop => {
            debug!("using noop persistence config");
        }
        PersistenceConfig::Memory => {
            debug!("using memory persistence config");
        }
        PersistenceConfig::Postgres {
            connection,
            max_connections,
        } => {
            debug!(max_connections, "using postgres persistence config");
            if let Some(connection) = connection {
                log_pg_connection_config(connection);
            }
        }
    }
}

fn log_pg_connection_config(config: &PgConnectionConfig) {
    debug!(
        host = config.host,
        port = config.port,
        dbname = config.name,
        username = config.username,
        tls_enabled = config.tls.enabled,
        "document store connection config",
    );
}

fn log_extraction_config(config: &ExtractionConfig) {
    debug!(
        skip_labels = ?config.skip_labels,
        max_text_len = config.max_text_len,
        "extraction config"
    );
}
