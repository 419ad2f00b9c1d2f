use crate::{
    error::ConnectorError,
    streaming::{error::ChannelError, state::ChannelState},
};
use async_trait::async_trait;
use model::{core::identifiers::OffsetToken, records::row::RowData};

/// Where a client writes: one pre-provisioned pipe in one schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSpec {
    pub client_name: String,
    pub database: String,
    pub schema: String,
    pub pipe: String,
}

impl ClientSpec {
    pub fn new(client_name: &str, database: &str, schema: &str, pipe: &str) -> Self {
        Self {
            client_name: client_name.to_string(),
            database: database.to_string(),
            schema: schema.to_string(),
            pipe: pipe.to_string(),
        }
    }
}

/// Resume state reported by the destination when a channel is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelStatus {
    pub channel: String,
    pub latest_committed_offset_token: Option<OffsetToken>,
    pub status_code: Option<String>,
}

pub struct OpenChannelResult {
    pub channel: Box<dyn IngestChannel>,
    pub status: ChannelStatus,
}

/// Builds one client per destination pipe.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn create_client(
        &self,
        spec: ClientSpec,
    ) -> Result<Box<dyn IngestClient>, ConnectorError>;
}

/// A connection to one destination pipe that hands out channels.
#[async_trait]
pub trait IngestClient: Send + Sync {
    fn name(&self) -> &str;

    fn is_closed(&self) -> bool;

    /// Idempotent by name: opening an existing channel returns its resume
    /// state. `initial_offset_token` only applies to channels that do not
    /// exist yet.
    async fn open_channel(
        &self,
        channel_name: &str,
        initial_offset_token: Option<&OffsetToken>,
    ) -> Result<OpenChannelResult, ChannelError>;

    /// Releases the client. Closing twice is a no-op.
    async fn close(&mut self) -> Result<(), ChannelError>;
}

/// Ordered, resumable append target bound to one destination table.
///
/// Durability, ordering and deduplication live on the destination side; the
/// only observable state is the last committed offset token.
#[async_trait]
pub trait IngestChannel: Send + Sync {
    fn name(&self) -> &str;

    fn state(&self) -> ChannelState;

    async fn append_row(
        &mut self,
        row: RowData,
        offset_token: &OffsetToken,
    ) -> Result<(), ChannelError>;

    /// All-or-nothing: on success every row is committed under
    /// `start..=end`; on failure none of them is guaranteed to be.
    async fn append_rows(
        &mut self,
        rows: Vec<RowData>,
        start: &OffsetToken,
        end: &OffsetToken,
    ) -> Result<(), ChannelError>;

    /// `None` for a channel with no commits yet.
    async fn latest_committed_offset_token(&self) -> Result<Option<OffsetToken>, ChannelError>;

    /// Releases the channel. Closing twice is a no-op.
    async fn close(&mut self) -> Result<(), ChannelError>;
}
