use serde::Deserialize;

use crate::shared::{PgConnectionConfig, ValidationError};

/// Document store the savers write to.
///
/// Defaults to Postgres, which must then be given a `connection`. The in-memory store loses
/// every count on exit and is meant for local development only.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PersistenceConfig {
    /// Discards every record.
    Noop,
    /// Keeps counts in process memory.
    Memory,
    /// Upserts counts into Postgres.
    Postgres {
        #[serde(default)]
        connection: Option<PgConnectionConfig>,
        #[serde(default = "default_max_connections")]
        max_connections: u32,
    },
}

impl PersistenceConfig {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 8;

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            PersistenceConfig::Noop | PersistenceConfig::Memory => Ok(()),
            PersistenceConfig::Postgres {
                connection,
                max_connections,
            } => {
                if *max_connections == 0 {
                    return Err(ValidationError::Zero("persistence.max_connections"));
                }
                match connection {
                    Some(connection) => connection.validate(),
                    None => Err(ValidationError::MissingConnection),
                }
            }
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        PersistenceConfig::Postgres {
            connection: None,
            max_connections: PersistenceConfig::DEFAULT_MAX_CONNECTIONS,
        }
    }
}

fn default_max_connections() -> u32 {
    PersistenceConfig::DEFAULT_MAX_CONNECTIONS
}
