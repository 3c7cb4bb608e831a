use bufstore_config::ConfigError;
use bufstore_core::PoolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Buffer pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Report serialization error: {0}")]
    Report(#[from] serde_yaml::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),
}
