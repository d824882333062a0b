use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::persistence::memory::MemoryPersister;
use crate::persistence::{PersistenceError, Persister};
use crate::types::PersistenceRecord;

/// Persister rejecting records with selected ids and storing the rest in memory.
#[derive(Debug, Clone)]
pub struct FailingPersister {
    failing_ids: Arc<HashSet<String>>,
    inner: MemoryPersister,
    rejected: Arc<AtomicU64>,
}

impl FailingPersister {
    pub fn new<I, S>(failing_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            failing_ids: Arc::new(failing_ids.into_iter().map(Into::into).collect()),
            inner: MemoryPersister::new(),
            rejected: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns the store holding the accepted records.
    pub fn inner(&self) -> &MemoryPersister {
        &self.inner
    }

    /// Number of records rejected so far.
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::SeqCst)
    }
}

impl Persister for FailingPersister {
    fn name() -> &'static str {
        "failing"
    }

    async fn persist(&self, record: &PersistenceRecord) -> Result<(), PersistenceError> {
        if self.failing_ids.contains(&record.record_id) {
            self.rejected.fetch_add(1, Ordering::SeqCst);
            return Err(PersistenceError::Unavailable(format!(
                "record `{}` is scripted to fail",
                record.record_id
            )));
        }

        self.inner.persist(record).await
    }

    async fn increment_publication(
        &self,
        publication: &str,
        articles: u64,
    ) -> Result<(), PersistenceError> {
        self.inner.increment_publication(publication, articles).await
    }
}
