use crate::{auth::error::AuthError, error::ConnectorError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    /// Table or column name is not a plain identifier.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Connection failed: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// The statement endpoint answered with an error status.
    #[error("Statement failed with {status}: {body}")]
    Status { status: u16, body: String },

    /// The result could not be read as an integer.
    #[error("Unexpected result: {0}")]
    UnexpectedResult(String),
}
