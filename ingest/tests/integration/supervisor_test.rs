use ingest::persistence::memory::MemoryPersister;
use ingest::pipeline::Pipeline;
use ingest::supervisor::Supervisor;
use ingest::test_utils::extractor::ScriptedExtractor;
use ingest::test_utils::timed::within;
use ingest::types::{ENTITIES_COLLECTION, Post};
use ingest_config::shared::PipelineConfig;
use ingest_telemetry::tracing::init_test_tracing;

#[tokio::test(flavor = "multi_thread")]
async fn programmatic_shutdown_drains_the_pipeline() {
    init_test_tracing();

    let persister = MemoryPersister::new();
    let config = PipelineConfig {
        workers: 2,
        savers: 2,
        agg_cache_size: 100,
        ..PipelineConfig::default()
    };
    let mut pipeline = Pipeline::new(config, ScriptedExtractor::new(), persister.clone());
    pipeline.start().await.unwrap();

    let input = pipeline.input_queue().unwrap();
    input
        .put_many((0..50).map(|_| Post::new("Apple", "tech")))
        .await
        .unwrap();

    let supervisor = Supervisor::without_os_signals();
    let shutdown_tx = supervisor.shutdown_tx();

    let supervised = tokio::spawn(supervisor.supervise(|| pipeline.shutdown_and_wait()));
    assert!(shutdown_tx.shutdown());

    within(supervised).await.unwrap().unwrap();

    // Requests arriving after the shutdown ran are ignored.
    shutdown_tx.shutdown();

    let apple = persister
        .document("tech", ENTITIES_COLLECTION, "apple")
        .await
        .unwrap();
    assert_eq!(apple.count, 50);
    assert_eq!(apple.articles, 50);
}
