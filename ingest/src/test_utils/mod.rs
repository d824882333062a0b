//! Utilities for testing the ingestion pipeline.
//!
//! - [`extractor`] provides extractors with scripted results and failures.
//! - [`persister`] provides persisters that reject selected records.
//! - [`timed`] provides bounded waits so that a broken test fails instead of hanging.

pub mod extractor;
pub mod persister;
pub mod timed;
