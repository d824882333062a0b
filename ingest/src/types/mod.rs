//! Core data types flowing through the ingestion pipeline.

mod post;
mod processed;

pub use post::Post;
pub use processed::{
    DEFAULT_TOP_K_ENTITIES, ENTITIES_COLLECTION, EntityCounts, PersistenceRecord, ProcessedPost,
    RecordFields,
};
