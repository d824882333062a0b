use ingest_config::load_config;
use ingest_config::shared::IngestConfig;

use crate::cli::Args;
use crate::error::{IngestdError, IngestdResult};

/// Loads the daemon configuration, applies command line overrides and validates the result.
pub fn load_ingestd_config(args: &Args) -> IngestdResult<IngestConfig> {
    let mut config = load_config::<IngestConfig>().map_err(IngestdError::config)?;
    args.apply(&mut config);
    config.validate().map_err(IngestdError::config)?;

    Ok(config)
}
