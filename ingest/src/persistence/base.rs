use std::future::Future;

use thiserror::Error;

use crate::types::PersistenceRecord;

/// Errors returned by a [`Persister`].
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database operation failed: {0}")]
    Database(#[from] sqlx::Error),

    /// The record can't be stored, for example because a counter doesn't fit the store.
    #[error("invalid record `{record_id}` of publication `{publication}`: {reason}")]
    InvalidRecord {
        publication: String,
        record_id: String,
        reason: String,
    },

    /// The store can't be reached right now.
    #[error("persistence store is unavailable: {0}")]
    Unavailable(String),
}

/// Trait for document stores receiving aggregated entity counts.
///
/// [`Persister`] implementations are shared by every saver, so they must handle concurrent
/// calls safely. Both operations are increments: storing the same record twice adds its
/// counters twice, and a record for an unknown key creates it.
///
/// A failure only affects the record being written. Savers log it and continue with the next
/// record.
pub trait Persister {
    /// Returns the name of the persister.
    fn name() -> &'static str;

    /// Adds the counters of `record` to the stored document identified by its publication,
    /// collection and record id, creating the document if absent.
    fn persist(
        &self,
        record: &PersistenceRecord,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    /// Adds `articles` to the article counter of `publication`.
    ///
    /// The default implementation is a no-op, for stores that only keep entity documents.
    fn increment_publication(
        &self,
        _publication: &str,
        _articles: u64,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send {
        async { Ok(()) }
    }
}
