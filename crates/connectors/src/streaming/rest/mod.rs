//! Streaming ingest over the warehouse's REST endpoints.
//!
//! One `reqwest::Client` and one signer are shared by every client and
//! channel built from the same factory. Channels carry the continuation
//! token the endpoint hands back and send it with the next append.

use crate::{
    auth::jwt::{KeyPairAuth, TOKEN_TYPE_HEADER, TOKEN_TYPE_KEYPAIR_JWT},
    error::ConnectorError,
    streaming::{
        channel::{
            ChannelStatus, ClientFactory, ClientSpec, IngestChannel, IngestClient,
            OpenChannelResult,
        },
        error::ChannelError,
        state::ChannelState,
    },
};
use api::{
    AppendRowsResponse, BulkStatusRequest, BulkStatusResponse, OpenChannelRequest,
    OpenChannelResponse, encode_ndjson,
};
use async_trait::async_trait;
use model::{core::identifiers::OffsetToken, records::row::RowData};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info};

pub(crate) mod api;

const NDJSON: &str = "application/x-ndjson";

#[derive(Debug, Clone)]
pub struct RestSettings {
    /// Account endpoint used for hostname discovery.
    pub account_url: String,
    /// Skips discovery when set.
    pub ingest_url: Option<String>,
}

struct Shared {
    http: reqwest::Client,
    auth: Arc<KeyPairAuth>,
}

impl Shared {
    fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, ChannelError> {
        Ok(request
            .bearer_auth(self.auth.token()?)
            .header(TOKEN_TYPE_HEADER, TOKEN_TYPE_KEYPAIR_JWT))
    }
}

pub struct RestClientFactory {
    shared: Arc<Shared>,
    settings: RestSettings,
}

impl RestClientFactory {
    pub fn new(settings: RestSettings, auth: Arc<KeyPairAuth>) -> Self {
        Self {
            shared: Arc::new(Shared {
                http: reqwest::Client::new(),
                auth,
            }),
            settings,
        }
    }

    async fn resolve_ingest_url(&self) -> Result<String, ConnectorError> {
        if let Some(url) = &self.settings.ingest_url {
            return Ok(url.trim_end_matches('/').to_string());
        }

        let endpoint = format!(
            "{}/v2/streaming/hostname",
            self.settings.account_url.trim_end_matches('/')
        );
        let request = self.shared.authorize(self.shared.http.get(&endpoint))?;
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConnectorError::Status {
                endpoint,
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let host = response.text().await?.trim().to_string();
        if host.is_empty() {
            return Err(ConnectorError::InvalidUrl(format!(
                "{endpoint} returned an empty hostname"
            )));
        }
        info!(%host, "Resolved ingest host");

        Ok(if host.starts_with("http://") || host.starts_with("https://") {
            host
        } else {
            format!("https://{host}")
        })
    }
}

#[async_trait]
impl ClientFactory for RestClientFactory {
    async fn create_client(
        &self,
        spec: ClientSpec,
    ) -> Result<Box<dyn IngestClient>, ConnectorError> {
        let ingest_url = self.resolve_ingest_url().await?;
        Ok(Box::new(RestClient {
            target: Arc::new(PipeTarget { spec, ingest_url }),
            shared: self.shared.clone(),
            closed: false,
        }))
    }
}

struct PipeTarget {
    spec: ClientSpec,
    ingest_url: String,
}

impl PipeTarget {
    fn pipe_path(&self) -> String {
        format!(
            "databases/{}/schemas/{}/pipes/{}",
            self.spec.database, self.spec.schema, self.spec.pipe
        )
    }

    fn channel_url(&self, channel: &str) -> String {
        format!(
            "{}/v2/streaming/{}/channels/{channel}",
            self.ingest_url,
            self.pipe_path()
        )
    }

    fn rows_url(&self, channel: &str) -> String {
        format!(
            "{}/v2/streaming/data/{}/channels/{channel}/rows",
            self.ingest_url,
            self.pipe_path()
        )
    }

    fn bulk_status_url(&self) -> String {
        format!(
            "{}/v2/streaming/{}:bulk-channel-status",
            self.ingest_url,
            self.pipe_path()
        )
    }
}

/// Reads a success body or turns the response into `ChannelError::Status`.
async fn read_json<T: DeserializeOwned>(
    channel: &str,
    response: Response,
) -> Result<T, ChannelError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ChannelError::Status {
            channel: channel.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| ChannelError::MalformedResponse {
        channel: channel.to_string(),
        reason: e.to_string(),
    })
}

pub struct RestClient {
    target: Arc<PipeTarget>,
    shared: Arc<Shared>,
    closed: bool,
}

#[async_trait]
impl IngestClient for RestClient {
    fn name(&self) -> &str {
        &self.target.spec.client_name
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn open_channel(
        &self,
        channel_name: &str,
        initial_offset_token: Option<&OffsetToken>,
    ) -> Result<OpenChannelResult, ChannelError> {
        if self.closed {
            return Err(ChannelError::ClientClosed(self.name().to_string()));
        }

        let body = OpenChannelRequest {
            offset_token: initial_offset_token.map(OffsetToken::as_str),
        };
        let request = self
            .shared
            .authorize(self.shared.http.put(self.target.channel_url(channel_name)))?
            .json(&body);
        let opened: OpenChannelResponse = read_json(channel_name, request.send().await?).await?;

        let latest = opened
            .channel_status
            .last_committed_offset_token
            .map(OffsetToken::from);
        debug!(channel = channel_name, latest = ?latest, "Channel opened");

        let mut channel = RestChannel {
            name: channel_name.to_string(),
            target: self.target.clone(),
            shared: self.shared.clone(),
            continuation_token: opened.next_continuation_token,
            state: ChannelState::Unopened,
        };
        channel.state.advance(ChannelState::Open);

        Ok(OpenChannelResult {
            channel: Box::new(channel),
            status: ChannelStatus {
                channel: channel_name.to_string(),
                latest_committed_offset_token: latest,
                status_code: opened.channel_status.channel_status_code,
            },
        })
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        self.closed = true;
        Ok(())
    }
}

pub struct RestChannel {
    name: String,
    target: Arc<PipeTarget>,
    shared: Arc<Shared>,
    continuation_token: String,
    state: ChannelState,
}

#[async_trait]
impl IngestChannel for RestChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> ChannelState {
        self.state
    }

    async fn append_row(
        &mut self,
        row: RowData,
        offset_token: &OffsetToken,
    ) -> Result<(), ChannelError> {
        self.append_rows(vec![row], offset_token, offset_token).await
    }

    async fn append_rows(
        &mut self,
        rows: Vec<RowData>,
        start: &OffsetToken,
        end: &OffsetToken,
    ) -> Result<(), ChannelError> {
        self.state.ensure_open(&self.name)?;

        let body = encode_ndjson(&rows)?;
        let request = self
            .shared
            .authorize(self.shared.http.post(self.target.rows_url(&self.name)))?
            .query(&[
                ("continuationToken", self.continuation_token.as_str()),
                ("offsetToken", end.as_str()),
            ])
            .header(reqwest::header::CONTENT_TYPE, NDJSON)
            .body(body);

        let appended: AppendRowsResponse = read_json(&self.name, request.send().await?).await?;
        self.continuation_token = appended.next_continuation_token;
        debug!(channel = %self.name, %start, %end, rows = rows.len(), "Rows appended");
        Ok(())
    }

    async fn latest_committed_offset_token(&self) -> Result<Option<OffsetToken>, ChannelError> {
        let body = BulkStatusRequest {
            channel_names: vec![self.name.as_str()],
        };
        let request = self
            .shared
            .authorize(self.shared.http.post(self.target.bulk_status_url()))?
            .json(&body);
        let mut statuses: BulkStatusResponse = read_json(&self.name, request.send().await?).await?;

        let status = statuses.channel_statuses.remove(&self.name).ok_or_else(|| {
            ChannelError::MalformedResponse {
                channel: self.name.clone(),
                reason: "channel missing from status response".to_string(),
            }
        })?;
        Ok(status.last_committed_offset_token.map(OffsetToken::from))
    }

    /// Channels have no server-side session to release; closing only stops
    /// further appends.
    async fn close(&mut self) -> Result<(), ChannelError> {
        self.state.advance(ChannelState::Closed);
        Ok(())
    }
}
