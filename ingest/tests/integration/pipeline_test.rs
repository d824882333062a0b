use ingest::error::ErrorKind;
use ingest::extraction::RuleBasedExtractor;
use ingest::persistence::memory::MemoryPersister;
use ingest::pipeline::Pipeline;
use ingest::test_utils::extractor::{FAILING_TEXT, PANICKING_TEXT, ScriptedExtractor};
use ingest::test_utils::persister::FailingPersister;
use ingest::test_utils::timed::within;
use ingest::types::{ENTITIES_COLLECTION, Post, RecordFields};
use ingest_config::shared::PipelineConfig;
use ingest_telemetry::tracing::init_test_tracing;

fn pipeline_config(workers: usize, savers: usize, agg_cache_size: usize) -> PipelineConfig {
    PipelineConfig {
        workers,
        savers,
        agg_cache_size,
        shutdown_timeout_ms: 10_000,
        ..PipelineConfig::default()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn posts_are_extracted_aggregated_and_persisted() {
    init_test_tracing();

    let persister = MemoryPersister::new();
    let mut pipeline = Pipeline::new(
        pipeline_config(2, 2, 10),
        RuleBasedExtractor::new(),
        persister.clone(),
    );
    pipeline.start().await.unwrap();

    let input = pipeline.input_queue().unwrap();
    input
        .put(Post::new("Apple released a new iPhone in California", "tech"))
        .await
        .unwrap();

    within(pipeline.shutdown_and_wait()).await.unwrap();

    let expected = RecordFields {
        articles: 1,
        count: 1,
    };
    assert_eq!(
        persister
            .document("tech", ENTITIES_COLLECTION, "apple")
            .await,
        Some(expected)
    );
    assert_eq!(
        persister
            .document("tech", ENTITIES_COLLECTION, "california")
            .await,
        Some(expected)
    );
    assert_eq!(persister.documents().await.len(), 2);
    assert_eq!(persister.publications().await.get("tech"), Some(&1));
}

#[tokio::test(flavor = "multi_thread")]
async fn every_post_is_counted_exactly_once() {
    init_test_tracing();

    let extractor = ScriptedExtractor::new()
        .with_script("apple launch", &[("apple", 2)])
        .with_script("google launch", &[("google", 1), ("apple", 1)]);
    let persister = MemoryPersister::new();
    // A cache of one publication forces many small flushes across the savers.
    let mut pipeline = Pipeline::new(pipeline_config(4, 3, 1), extractor, persister.clone());
    pipeline.start().await.unwrap();

    let input = pipeline.input_queue().unwrap();
    let mut posts = Vec::new();
    for i in 0..200 {
        let publication = if i % 2 == 0 { "tech" } else { "news" };
        let content = if i % 3 == 0 {
            "google launch"
        } else {
            "apple launch"
        };
        posts.push(Post::new(content, publication));
    }
    assert_eq!(input.put_many(posts).await.unwrap(), 200);

    within(pipeline.shutdown_and_wait()).await.unwrap();

    for publication in ["tech", "news"] {
        let google_posts = (0..200)
            .filter(|i| (i % 2 == 0) == (publication == "tech") && i % 3 == 0)
            .count() as u64;
        let apple_posts = 100 - google_posts;

        let apple = persister
            .document(publication, ENTITIES_COLLECTION, "apple")
            .await
            .unwrap();
        assert_eq!(apple.count, apple_posts * 2 + google_posts);

        let google = persister
            .document(publication, ENTITIES_COLLECTION, "google")
            .await
            .unwrap();
        assert_eq!(google.count, google_posts);

        assert_eq!(persister.publications().await.get(publication), Some(&100));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_and_panicking_extractions_do_not_stop_the_pipeline() {
    init_test_tracing();

    let persister = MemoryPersister::new();
    let mut pipeline = Pipeline::new(
        pipeline_config(2, 1, 10),
        ScriptedExtractor::new(),
        persister.clone(),
    );
    pipeline.start().await.unwrap();

    let input = pipeline.input_queue().unwrap();
    input
        .put_many([
            Post::new(FAILING_TEXT, "tech"),
            Post::new("Apple", "tech"),
            Post::new(PANICKING_TEXT, "tech"),
            Post::new("Apple", "tech"),
        ])
        .await
        .unwrap();

    let report = within(pipeline.shutdown()).await.unwrap();
    assert!(report.is_clean());

    let apple = persister
        .document("tech", ENTITIES_COLLECTION, "apple")
        .await
        .unwrap();
    assert_eq!(apple.count, 2);
    assert_eq!(persister.publications().await.get("tech"), Some(&2));
}

#[tokio::test(flavor = "multi_thread")]
async fn persistence_failures_only_lose_the_rejected_records() {
    init_test_tracing();

    let extractor =
        ScriptedExtractor::new().with_script("launch", &[("apple", 1), ("google", 1)]);
    let persister = FailingPersister::new(["google"]);
    let mut pipeline = Pipeline::new(pipeline_config(1, 2, 10), extractor, persister.clone());
    pipeline.start().await.unwrap();

    let input = pipeline.input_queue().unwrap();
    input
        .put_many((0..5).map(|_| Post::new("launch", "tech")))
        .await
        .unwrap();

    within(pipeline.shutdown_and_wait()).await.unwrap();

    let stored = persister.inner();
    assert_eq!(
        stored
            .document("tech", ENTITIES_COLLECTION, "apple")
            .await
            .map(|fields| fields.count),
        Some(5)
    );
    assert_eq!(
        stored.document("tech", ENTITIES_COLLECTION, "google").await,
        None
    );
    assert!(persister.rejected() >= 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn input_queue_rejects_posts_after_shutdown() {
    init_test_tracing();

    let mut pipeline = Pipeline::new(
        pipeline_config(1, 1, 10),
        ScriptedExtractor::new(),
        MemoryPersister::new(),
    );
    pipeline.start().await.unwrap();

    let input = pipeline.input_queue().unwrap();
    let output = pipeline.output_queue().unwrap();

    within(pipeline.shutdown_and_wait()).await.unwrap();

    assert!(input.is_closed());
    assert!(output.is_closed());

    let err = input.put(Post::new("late", "tech")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::QueueClosed);
}

#[tokio::test(flavor = "multi_thread")]
async fn pipeline_cannot_start_twice_or_stop_unstarted() {
    init_test_tracing();

    let mut pipeline = Pipeline::new(
        pipeline_config(1, 1, 10),
        ScriptedExtractor::new(),
        MemoryPersister::new(),
    );
    assert!(pipeline.input_queue().is_none());

    pipeline.start().await.unwrap();
    let err = pipeline.start().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    within(pipeline.shutdown_and_wait()).await.unwrap();

    let unstarted = Pipeline::new(
        pipeline_config(1, 1, 10),
        ScriptedExtractor::new(),
        MemoryPersister::new(),
    );
    let err = unstarted.shutdown().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}
