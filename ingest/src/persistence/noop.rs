use tracing::debug;

use crate::persistence::{PersistenceError, Persister};
use crate::types::PersistenceRecord;

/// Persister that discards every record, used for dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPersister;

impl Persister for NoopPersister {
    fn name() -> &'static str {
        "noop"
    }

    async fn persist(&self, record: &PersistenceRecord) -> Result<(), PersistenceError> {
        debug!(
            publication = %record.publication,
            record_id = %record.record_id,
            "discarding record"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ENTITIES_COLLECTION, RecordFields};

    #[tokio::test]
    async fn test_noop_accepts_everything() {
        let record = PersistenceRecord {
            publication: "tech".to_string(),
            collection: ENTITIES_COLLECTION.to_string(),
            record_id: "apple".to_string(),
            fields: RecordFields {
                articles: 1,
                count: 1,
            },
        };

        assert!(NoopPersister.persist(&record).await.is_ok());
        assert!(NoopPersister.increment_publication("tech", 1).await.is_ok());
    }
}
