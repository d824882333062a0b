use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::persistence::{PersistenceError, Persister};
use crate::types::{PersistenceRecord, RecordFields};

/// Identifies a stored document: publication, collection and record id.
pub type DocumentKey = (String, String, String);

#[derive(Debug, Default)]
struct Inner {
    documents: HashMap<DocumentKey, RecordFields>,
    publications: HashMap<String, u64>,
}

/// In-memory document store with increment-on-conflict semantics.
///
/// [`MemoryPersister`] is meant for development and tests. Clones share the same store, so a
/// test can keep a handle and inspect what the savers wrote. Everything is lost when the
/// process terminates.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersister {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryPersister {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every stored document.
    pub async fn documents(&self) -> HashMap<DocumentKey, RecordFields> {
        let inner = self.inner.lock().await;
        inner.documents.clone()
    }

    /// Returns the stored fields of one document.
    pub async fn document(
        &self,
        publication: &str,
        collection: &str,
        record_id: &str,
    ) -> Option<RecordFields> {
        let inner = self.inner.lock().await;
        inner
            .documents
            .get(&(
                publication.to_string(),
                collection.to_string(),
                record_id.to_string(),
            ))
            .copied()
    }

    /// Returns the article counter of every publication.
    pub async fn publications(&self) -> HashMap<String, u64> {
        let inner = self.inner.lock().await;
        inner.publications.clone()
    }

    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.documents.clear();
        inner.publications.clear();
    }
}

impl Persister for MemoryPersister {
    fn name() -> &'static str {
        "memory"
    }

    async fn persist(&self, record: &PersistenceRecord) -> Result<(), PersistenceError> {
        let mut inner = self.inner.lock().await;

        let key = (
            record.publication.clone(),
            record.collection.clone(),
            record.record_id.clone(),
        );
        let stored = inner.documents.entry(key).or_default();
        stored.articles += record.fields.articles;
        stored.count += record.fields.count;

        debug!(
            publication = %record.publication,
            record_id = %record.record_id,
            count = stored.count,
            "incremented document"
        );

        Ok(())
    }

    async fn increment_publication(
        &self,
        publication: &str,
        articles: u64,
    ) -> Result<(), PersistenceError> {
        let mut inner = self.inner.lock().await;
        *inner
            .publications
            .entry(publication.to_string())
            .or_default() += articles;

        Ok(())
    }
}
