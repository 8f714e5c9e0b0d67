use thiserror::Error;

use lei_ingest::LoadError;
use lei_model::ConfigError;

/// Errors raised by session setup and batch runs.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
