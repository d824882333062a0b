//! Logging setup shared by the ingestion binaries and tests.

pub mod tracing;
