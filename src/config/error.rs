//! Configuration errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// A loaded value that the worker cannot run with.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must be set")]
    MissingRequired(&'static str),

    #[error("database url must use the postgres:// or postgresql:// scheme")]
    InvalidDatabaseUrl,

    #[error("min_connections is larger than max_connections")]
    InvalidPoolSize,

    #[error("max_connections may not exceed 100")]
    PoolSizeTooLarge,

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("outbox batch_size must be within 1..=1000")]
    InvalidBatchSize,
}
