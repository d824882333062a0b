//! Ordered, one-shot shutdown of queue and pool pairs.
//!
//! For every registered stage the coordinator closes the queue, requests termination of the
//! pool consuming it, and joins the pool with a bounded timeout. Members still running after
//! the timeout are force terminated. Stages run one after the other in registration order, so
//! the input stage is fully drained before the output queue is closed.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::concurrency::queue::Closeable;
use crate::error::{IngestError, IngestResult};
use crate::workers::pool::{PoolControl, PoolReport};

struct ShutdownStage {
    queue: Arc<dyn Closeable>,
    pool: Box<dyn PoolControl>,
}

/// Drives the shutdown of every queue and pool of a pipeline.
///
/// [`ShutdownCoordinator::shutdown`] consumes the coordinator, so the sequence runs at most
/// once.
pub struct ShutdownCoordinator {
    stages: Vec<ShutdownStage>,
    timeout: Duration,
}

impl ShutdownCoordinator {
    /// Creates a coordinator joining every pool with `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            stages: Vec::new(),
            timeout,
        }
    }

    /// Registers a queue and the pool consuming it. Stages shut down in registration order.
    pub fn add_stage(&mut self, queue: Arc<dyn Closeable>, pool: Box<dyn PoolControl>) {
        self.stages.push(ShutdownStage { queue, pool });
    }

    pub fn stages(&self) -> usize {
        self.stages.len()
    }

    /// Runs the shutdown sequence.
    pub async fn shutdown(self) -> ShutdownReport {
        let mut reports = Vec::with_capacity(self.stages.len());

        for ShutdownStage { queue, mut pool } in self.stages {
            info!(queue = %queue.name(), pool = %pool.name(), "shutting down stage");

            // Workers must never see a termination request while the queue still accepts
            // writes.
            queue.close();
            pool.request_termination();

            let report = pool.join(self.timeout).await;
            if !report.is_clean() {
                error!(
                    pool = %report.pool,
                    failed = report.failed.len(),
                    forced = report.forced,
                    "stage did not shut down cleanly"
                );
            }
            reports.push(report);
        }

        ShutdownReport { stages: reports }
    }
}

/// Reports of every stage, in shutdown order.
#[derive(Debug)]
pub struct ShutdownReport {
    pub stages: Vec<PoolReport>,
}

impl ShutdownReport {
    /// Returns `true` if every member of every pool exited on its own without error.
    pub fn is_clean(&self) -> bool {
        self.stages.iter().all(PoolReport::is_clean)
    }

    /// Converts the report into a result, aggregating the errors of every stage.
    pub fn into_result(self) -> IngestResult<()> {
        let errors: Vec<IngestError> = self
            .stages
            .into_iter()
            .flat_map(|report| report.failed)
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::error::ErrorKind;
    use crate::ingest_error;

    type Calls = Arc<Mutex<Vec<String>>>;

    struct RecordingQueue {
        name: String,
        calls: Calls,
    }

    impl Closeable for RecordingQueue {
        fn name(&self) -> &str {
            &self.name
        }

        fn close(&self) {
            self.calls.lock().unwrap().push(format!("close {}", self.name));
        }
    }

    struct RecordingPool {
        name: String,
        calls: Calls,
        fail: bool,
    }

    #[async_trait]
    impl PoolControl for RecordingPool {
        fn name(&self) -> &str {
            &self.name
        }

        fn request_termination(&self) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("terminate {}", self.name));
        }

        async fn join(&mut self, _timeout: Duration) -> PoolReport {
            self.calls.lock().unwrap().push(format!("join {}", self.name));
            PoolReport {
                pool: self.name.clone(),
                completed: 1,
                failed: if self.fail {
                    vec![ingest_error!(
                        ErrorKind::ShutdownTimeout,
                        "Pool members did not exit in time"
                    )]
                } else {
                    Vec::new()
                },
                forced: usize::from(self.fail),
            }
        }
    }

    fn coordinator(calls: &Calls, fail_output: bool) -> ShutdownCoordinator {
        let mut coordinator = ShutdownCoordinator::new(Duration::from_secs(1));
        for (queue, pool, fail) in [("iqueue", "workers", false), ("oqueue", "savers", fail_output)] {
            coordinator.add_stage(
                Arc::new(RecordingQueue {
                    name: queue.to_string(),
                    calls: calls.clone(),
                }),
                Box::new(RecordingPool {
                    name: pool.to_string(),
                    calls: calls.clone(),
                    fail,
                }),
            );
        }
        coordinator
    }

    #[tokio::test]
    async fn test_queue_is_closed_before_pool_is_terminated() {
        let calls = Calls::default();

        let report = coordinator(&calls, false).shutdown().await;

        assert!(report.is_clean());
        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                "close iqueue",
                "terminate workers",
                "join workers",
                "close oqueue",
                "terminate savers",
                "join savers",
            ]
        );
        assert!(report.into_result().is_ok());
    }

    #[tokio::test]
    async fn test_unclean_stage_surfaces_as_error() {
        let calls = Calls::default();

        let report = coordinator(&calls, true).shutdown().await;

        assert!(!report.is_clean());
        assert_eq!(report.stages.len(), 2);
        let err = report.into_result().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShutdownTimeout);
    }
}
