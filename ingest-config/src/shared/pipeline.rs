use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Sizing and flushing parameters of the worker and saver pools.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Name of the queue producers write posts to.
    pub input_queue_name: String,
    /// Name of the queue workers forward aggregates to.
    pub output_queue_name: String,
    /// Maximum number of posts buffered in the input queue. Unbounded when absent.
    pub input_queue_capacity: Option<usize>,
    /// Number of ingest workers.
    pub workers: usize,
    /// Number of savers.
    pub savers: usize,
    /// Number of distinct publications a worker caches before flushing.
    pub agg_cache_size: usize,
    /// Number of most frequent entities persisted per aggregate.
    pub top_k_entities: usize,
    /// Time a pool is given to exit after termination was requested.
    pub shutdown_timeout_ms: u64,
}

impl PipelineConfig {
    pub const DEFAULT_INPUT_QUEUE_NAME: &'static str = "iqueue";

    pub const DEFAULT_OUTPUT_QUEUE_NAME: &'static str = "oqueue";

    pub const DEFAULT_AGG_CACHE_SIZE: usize = 25_000;

    pub const DEFAULT_TOP_K_ENTITIES: usize = 2_000;

    pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 30_000;

    /// Default size of both pools: one less than the number of CPUs, at least one.
    pub fn default_pool_size() -> usize {
        std::thread::available_parallelism()
            .map(|cpus| cpus.get().saturating_sub(1))
            .unwrap_or(1)
            .max(1)
    }

    /// Validates pool sizes, flushing parameters and queue names.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("pipeline.workers", self.workers),
            ("pipeline.savers", self.savers),
            ("pipeline.agg_cache_size", self.agg_cache_size),
            ("pipeline.top_k_entities", self.top_k_entities),
        ] {
            if value == 0 {
                return Err(ValidationError::Zero(field));
            }
        }

        if self.input_queue_capacity == Some(0) {
            return Err(ValidationError::Zero("pipeline.input_queue_capacity"));
        }

        if self.input_queue_name.is_empty() || self.output_queue_name.is_empty() {
            return Err(ValidationError::QueueNames(
                "queue names cannot be empty".to_string(),
            ));
        }

        if self.input_queue_name == self.output_queue_name {
            return Err(ValidationError::QueueNames(format!(
                "input and output queues are both named `{}`",
                self.input_queue_name
            )));
        }

        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_queue_name: Self::DEFAULT_INPUT_QUEUE_NAME.to_string(),
            output_queue_name: Self::DEFAULT_OUTPUT_QUEUE_NAME.to_string(),
            input_queue_capacity: None,
            workers: Self::default_pool_size(),
            savers: Self::default_pool_size(),
            agg_cache_size: Self::DEFAULT_AGG_CACHE_SIZE,
            top_k_entities: Self::DEFAULT_TOP_K_ENTITIES,
            shutdown_timeout_ms: Self::DEFAULT_SHUTDOWN_TIMEOUT_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();

        assert!(config.workers >= 1);
        assert_eq!(config.workers, config.savers);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_zero_sizes_are_rejected() {
        let config = PipelineConfig {
            agg_cache_size: 0,
            ..Default::default()
        };

        assert_eq!(
            config.validate(),
            Err(ValidationError::Zero("pipeline.agg_cache_size"))
        );
    }

    #[test]
    fn test_queue_names_must_differ() {
        let config = PipelineConfig {
            output_queue_name: "iqueue".to_string(),
            ..Default::default()
        };

        assert!(matches!(
            config.validate(),
            Err(ValidationError::QueueNames(_))
        ));
    }
}
