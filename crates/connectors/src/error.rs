use crate::{auth::error::AuthError, streaming::error::ChannelError};
use thiserror::Error;

/// Errors happening while building clients or connections.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The configured endpoint could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Key loading or token signing failed.
    #[error("Authentication setup failed: {0}")]
    Auth(#[from] AuthError),

    /// HTTP transport failure during setup.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered setup calls with an error status.
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Postgres driver error.
    #[error("Postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// TLS connector could not be built.
    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}
