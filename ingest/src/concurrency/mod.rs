//! Concurrency primitives shared by the ingestion pools.
//!
//! - [`queue`] provides the drainable queue that connects producers, workers and savers. It is
//!   the only shared mutable resource of the pipeline.
//! - [`shutdown`] provides the broadcast channel used to deliver termination requests to every
//!   member of a pool at once.

pub mod queue;
pub mod shutdown;
