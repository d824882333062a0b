use clap::Parser;
use ingest_config::shared::{IngestConfig, PersistenceConfig};

/// Entity-count ingestion daemon.
///
/// Options given on the command line override the loaded configuration.
#[derive(Parser, Debug, Default, PartialEq, Eq)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Number of ingest workers.
    #[arg(long = "iproc_num", value_parser = clap::value_parser!(u16).range(1..))]
    pub iproc_num: Option<u16>,

    /// Number of savers.
    #[arg(long = "oproc_num", value_parser = clap::value_parser!(u16).range(1..))]
    pub oproc_num: Option<u16>,

    /// Port the queue gateway listens on.
    #[arg(long = "iport")]
    pub iport: Option<u16>,

    /// Discard extracted entities instead of persisting them.
    #[arg(long = "no_persistence")]
    pub no_persistence: bool,

    /// Number of distinct publications a worker aggregates before flushing.
    #[arg(long = "agg_cache_size", value_parser = clap::value_parser!(u64).range(1..))]
    pub agg_cache_size: Option<u64>,
}

impl Args {
    /// Applies the options that were given to `config`.
    pub fn apply(&self, config: &mut IngestConfig) {
        if let Some(workers) = self.iproc_num {
            config.pipeline.workers = workers.into();
        }
        if let Some(savers) = self.oproc_num {
            config.pipeline.savers = savers.into();
        }
        if let Some(port) = self.iport {
            config.gateway.port = port;
        }
        if self.no_persistence {
            config.persistence = PersistenceConfig::Noop;
        }
        if let Some(agg_cache_size) = self.agg_cache_size {
            config.pipeline.agg_cache_size =
                usize::try_from(agg_cache_size).unwrap_or(usize::MAX);
        }
    }
}
