//! Pool members and the pools that run them.
//!
//! Ingest workers turn posts into aggregated [`crate::types::ProcessedPost`] values and forward
//! them to the output queue. Savers turn those aggregates into increment records for a
//! [`crate::persistence::Persister`]. Both run inside a [`pool::Pool`] that the shutdown
//! coordinator drives through [`pool::PoolControl`].

pub mod base;
pub mod cache;
pub mod ingest;
pub mod pool;
pub mod saver;
