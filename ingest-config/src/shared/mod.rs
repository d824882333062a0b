//! Configuration sections of the ingestion daemon.

mod base;
mod connection;
mod extraction;
mod gateway;
mod ingest;
mod persistence;
mod pipeline;

pub use base::ValidationError;
pub use connection::{PgConnectionConfig, TlsConfig};
pub use extraction::ExtractionConfig;
pub use gateway::GatewayConfig;
pub use ingest::IngestConfig;
pub use persistence::PersistenceConfig;
pub use pipeline::PipelineConfig;
