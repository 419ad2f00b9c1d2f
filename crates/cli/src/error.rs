use connectors::auth::error::AuthError;
use engine_config::error::ConfigError;
use engine_core::error::{BootstrapError, PipelineError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Streaming failed: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Failed to bootstrap the session: {0}")]
    Bootstrap(#[from] BootstrapError),

    #[error("Key error: {0}")]
    Auth(#[from] AuthError),

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("{failed} of {total} instances failed")]
    InstancesFailed { failed: usize, total: usize },

    #[error("Shutdown requested")]
    ShutdownRequested,
}
