//! Fan-out/fan-in pipeline counting the named entities of posts per publication.
//!
//! Producers put [`types::Post`]s on a [`concurrency::queue::DrainableQueue`]. A pool of
//! ingest workers extracts entities from each post and aggregates them per publication, then
//! forwards the aggregates to a second queue consumed by a pool of savers, which persist them
//! as increment records. The [`coordinator::ShutdownCoordinator`] drains both stages in order
//! when the [`supervisor::Supervisor`] observes a termination request.

pub mod concurrency;
pub mod coordinator;
pub mod error;
pub mod extraction;
mod macros;
pub mod persistence;
pub mod pipeline;
pub mod supervisor;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
pub mod workers;
