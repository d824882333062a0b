use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A numeric field must be greater than zero.
    #[error("`{0}` cannot be zero")]
    Zero(&'static str),
    /// Both queues must have distinct, non-empty names.
    #[error("invalid queue names: {0}")]
    QueueNames(String),
    /// TLS is enabled but no trusted root certificates are provided.
    #[error("Invalid TLS config: `trusted_root_certs` must be set when `enabled` is true")]
    MissingTrustedRootCerts,
    /// Postgres persistence is selected but no connection is configured.
    #[error(
        "`persistence.connection` must be set for postgres persistence, select `kind: memory` or pass `--no_persistence` for local runs"
    )]
    MissingConnection,
}
