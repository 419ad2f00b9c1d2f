use connectors::{
    error::ConnectorError, lookup::error::LookupError, streaming::error::ChannelError,
};
use engine_config::error::ConfigError;
use model::records::row::SchemaError;
use thiserror::Error;

/// A failed call on an open ingestion session. Never retried here; the
/// caller resumes from the last committed offset.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Append to {table} failed: {source}")]
    Append {
        table: &'static str,
        #[source]
        source: ChannelError,
    },

    #[error("Offset lookup on {table} failed: {source}")]
    Offset {
        table: &'static str,
        #[source]
        source: ChannelError,
    },

    #[error("Projected row does not match its table: {0}")]
    Schema(#[from] SchemaError),

    #[error("Session is closed")]
    Closed,
}

/// Failures while creating clients and opening channels. Always fatal.
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Failed to create client {client}: {source}")]
    Client {
        client: String,
        #[source]
        source: ConnectorError,
    },

    #[error("Failed to open channel {channel}: {source}")]
    OpenChannel {
        channel: String,
        #[source]
        source: ChannelError,
    },

    #[error("Failed to read committed offset of {channel}: {source}")]
    ReadOffset {
        channel: String,
        #[source]
        source: ChannelError,
    },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Customer id lookup failed: {0}")]
    Lookup(#[from] LookupError),

    /// The customer table is empty, so orders cannot reference anyone.
    #[error("No customers available for order generation")]
    NoCustomers,

    #[error("Invalid partitioning: {0}")]
    Partition(String),
}
