//! Persistence collaborator used by the saver pool.
//!
//! A [`Persister`] receives increment records produced from aggregated results. Every
//! implementation must add the carried counters to the stored values instead of overwriting
//! them, so overlapping aggregates delivered more than once never corrupt totals.

mod base;
pub mod memory;
pub mod noop;
pub mod postgres;

pub use base::{PersistenceError, Persister};
