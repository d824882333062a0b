//! Ingestion daemon binary.
//!
//! Loads configuration, starts the worker and saver pools behind the queue gateway, and runs
//! until SIGINT or SIGTERM. The process exits with status 0 only when every pool member
//! drained and exited on its own.

use std::process::ExitCode;

use clap::Parser;
use ingest_config::shared::IngestConfig;
use ingest_telemetry::tracing::init_tracing;
use tracing::error;

use crate::cli::Args;
use crate::config::load_ingestd_config;
use crate::core::start_ingestd_with_config;
use crate::error::{IngestdError, IngestdResult};

mod cli;
mod config;
mod core;
mod error;
mod migrations;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprint!("{}", err.render_report());
            ExitCode::FAILURE
        }
    }
}

fn run() -> IngestdResult<()> {
    let args = Args::parse();

    let config = load_ingestd_config(&args)?;

    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME")).map_err(IngestdError::config)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(config))
}

async fn async_main(config: IngestConfig) -> IngestdResult<()> {
    if let Err(err) = start_ingestd_with_config(config).await {
        error!("{err}");
        return Err(err);
    }

    Ok(())
}
