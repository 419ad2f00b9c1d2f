//! In-process destination that honours the channel contract.
//!
//! Channels are keyed by `(pipe, channel)` and survive client and channel
//! closes, so reopening a channel by name reports the offset it reached.
//! A replayed range is ignored when its start or end token already bounds a
//! committed range.
//! Failures can be queued up front to exercise error paths.

use crate::{
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
use async_trait::async_trait;
use model::{core::identifiers::OffsetToken, records::row::RowData};
use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::debug;

/// One append call as the destination saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct AppendCall {
    pub pipe: String,
    pub channel: String,
    pub start: OffsetToken,
    pub end: OffsetToken,
    pub rows: Vec<RowData>,
}

#[derive(Debug, Default)]
struct ChannelLog {
    latest: Option<OffsetToken>,
    rows: Vec<RowData>,
    boundaries: HashSet<OffsetToken>,
}

impl ChannelLog {
    fn commit(&mut self, rows: Vec<RowData>, start: &OffsetToken, end: &OffsetToken) {
        self.rows.extend(rows);
        self.boundaries.insert(start.clone());
        self.boundaries.insert(end.clone());
        self.latest = Some(end.clone());
    }

    fn is_replay(&self, start: &OffsetToken, end: &OffsetToken) -> bool {
        self.boundaries.contains(start) || self.boundaries.contains(end)
    }
}

#[derive(Debug, Default)]
struct Inner {
    channels: HashMap<(String, String), ChannelLog>,
    appends: Vec<AppendCall>,
    append_failures: VecDeque<String>,
    close_failures: VecDeque<String>,
    channel_closes: usize,
    client_closes: usize,
    clients: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDestination {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes the next append call fail without committing anything.
    pub fn fail_next_append(&self, reason: impl Into<String>) {
        self.lock().append_failures.push_back(reason.into());
    }

    /// Makes the next channel or client close report an error.
    pub fn fail_next_close(&self, reason: impl Into<String>) {
        self.lock().close_failures.push_back(reason.into());
    }

    /// Pretends a channel already committed up to `token` before this run.
    pub fn seed_channel(&self, pipe: &str, channel: &str, token: OffsetToken) {
        self.lock()
            .channels
            .entry((pipe.to_string(), channel.to_string()))
            .or_default()
            .commit(Vec::new(), &token, &token);
    }

    pub fn append_calls(&self) -> Vec<AppendCall> {
        self.lock().appends.clone()
    }

    pub fn committed_rows(&self, pipe: &str, channel: &str) -> Vec<RowData> {
        self.lock()
            .channels
            .get(&(pipe.to_string(), channel.to_string()))
            .map(|log| log.rows.clone())
            .unwrap_or_default()
    }

    pub fn latest_committed(&self, pipe: &str, channel: &str) -> Option<OffsetToken> {
        self.lock()
            .channels
            .get(&(pipe.to_string(), channel.to_string()))
            .and_then(|log| log.latest.clone())
    }

    pub fn channel_names(&self, pipe: &str) -> Vec<String> {
        let mut names = self
            .lock()
            .channels
            .keys()
            .filter(|(p, _)| p == pipe)
            .map(|(_, c)| c.clone())
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    pub fn client_names(&self) -> Vec<String> {
        self.lock().clients.clone()
    }

    pub fn channel_close_count(&self) -> usize {
        self.lock().channel_closes
    }

    pub fn client_close_count(&self) -> usize {
        self.lock().client_closes
    }
}

#[async_trait]
impl ClientFactory for MemoryDestination {
    async fn create_client(
        &self,
        spec: ClientSpec,
    ) -> Result<Box<dyn IngestClient>, ConnectorError> {
        self.lock().clients.push(spec.client_name.clone());
        Ok(Box::new(MemoryClient {
            spec,
            destination: self.clone(),
            closed: false,
        }))
    }
}

pub struct MemoryClient {
    spec: ClientSpec,
    destination: MemoryDestination,
    closed: bool,
}

#[async_trait]
impl IngestClient for MemoryClient {
    fn name(&self) -> &str {
        &self.spec.client_name
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
            return Err(ChannelError::ClientClosed(self.spec.client_name.clone()));
        }

        let latest = {
            let mut inner = self.destination.lock();
            let log = inner
                .channels
                .entry((self.spec.pipe.clone(), channel_name.to_string()))
                .or_insert_with(|| ChannelLog {
                    latest: initial_offset_token.cloned(),
                    rows: Vec::new(),
                    boundaries: HashSet::new(),
                });
            log.latest.clone()
        };

        let mut channel = MemoryChannel {
            name: channel_name.to_string(),
            pipe: self.spec.pipe.clone(),
            destination: self.destination.clone(),
            state: ChannelState::Unopened,
        };
        channel.state.advance(ChannelState::Open);

        Ok(OpenChannelResult {
            channel: Box::new(channel),
            status: ChannelStatus {
                channel: channel_name.to_string(),
                latest_committed_offset_token: latest,
                status_code: Some("SUCCESS".to_string()),
            },
        })
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut inner = self.destination.lock();
        inner.client_closes += 1;
        match inner.close_failures.pop_front() {
            Some(reason) => Err(ChannelError::Rejected {
                channel: self.spec.client_name.clone(),
                reason,
            }),
            None => Ok(()),
        }
    }
}

pub struct MemoryChannel {
    name: String,
    pipe: String,
    destination: MemoryDestination,
    state: ChannelState,
}

#[async_trait]
impl IngestChannel for MemoryChannel {
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

        let mut inner = self.destination.lock();
        inner.appends.push(AppendCall {
            pipe: self.pipe.clone(),
            channel: self.name.clone(),
            start: start.clone(),
            end: end.clone(),
            rows: rows.clone(),
        });

        if let Some(reason) = inner.append_failures.pop_front() {
            return Err(ChannelError::Rejected {
                channel: self.name.clone(),
                reason,
            });
        }

        let log = inner
            .channels
            .entry((self.pipe.clone(), self.name.clone()))
            .or_default();

        if log.is_replay(start, end) {
            debug!(channel = %self.name, %start, %end, "Duplicate range ignored");
            return Ok(());
        }

        log.commit(rows, start, end);
        Ok(())
    }

    async fn latest_committed_offset_token(&self) -> Result<Option<OffsetToken>, ChannelError> {
        Ok(self.destination.latest_committed(&self.pipe, &self.name))
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        if !self.state.advance(ChannelState::Closed) {
            return Ok(());
        }

        let mut inner = self.destination.lock();
        inner.channel_closes += 1;
        match inner.close_failures.pop_front() {
            Some(reason) => Err(ChannelError::Rejected {
                channel: self.name.clone(),
                reason,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::core::value::{FieldValue, Value};

    fn row(id: &str) -> RowData {
        RowData::new("T", vec![FieldValue::new("ID", Value::from(id))])
    }

    async fn open(dest: &MemoryDestination, channel: &str) -> OpenChannelResult {
        let client = dest
            .create_client(ClientSpec::new("C", "DB", "S", "PIPE"))
            .await
            .unwrap();
        client.open_channel(channel, None).await.unwrap()
    }

    #[tokio::test]
    async fn new_channel_reports_no_commits() {
        let dest = MemoryDestination::new();
        let opened = open(&dest, "ch").await;
        assert_eq!(opened.status.latest_committed_offset_token, None);
        assert_eq!(opened.channel.state(), ChannelState::Open);
    }

    #[tokio::test]
    async fn reopening_returns_existing_resume_state() {
        let dest = MemoryDestination::new();
        let mut opened = open(&dest, "ch").await;
        opened
            .channel
            .append_rows(vec![row("a"), row("b")], &"t1".into(), &"t2".into())
            .await
            .unwrap();
        opened.channel.close().await.unwrap();

        let reopened = open(&dest, "ch").await;
        assert_eq!(
            reopened.status.latest_committed_offset_token,
            Some(OffsetToken::from("t2"))
        );
        assert_eq!(dest.committed_rows("PIPE", "ch").len(), 2);
    }

    #[tokio::test]
    async fn failed_append_commits_nothing() {
        let dest = MemoryDestination::new();
        let mut opened = open(&dest, "ch").await;
        dest.fail_next_append("boom");

        let err = opened
            .channel
            .append_rows(vec![row("a")], &"t1".into(), &"t1".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Rejected { .. }));
        assert!(dest.committed_rows("PIPE", "ch").is_empty());
        assert_eq!(dest.latest_committed("PIPE", "ch"), None);
    }

    #[tokio::test]
    async fn replayed_range_is_deduplicated() {
        let dest = MemoryDestination::new();
        let mut opened = open(&dest, "ch").await;
        for _ in 0..2 {
            opened
                .channel
                .append_rows(vec![row("a")], &"t1".into(), &"t1".into())
                .await
                .unwrap();
        }
        assert_eq!(dest.append_calls().len(), 2);
        assert_eq!(dest.committed_rows("PIPE", "ch").len(), 1);
    }

    #[tokio::test]
    async fn replaying_an_older_range_commits_nothing() {
        let dest = MemoryDestination::new();
        let mut opened = open(&dest, "ch").await;
        opened
            .channel
            .append_rows(vec![row("1"), row("2")], &"order_1".into(), &"order_2".into())
            .await
            .unwrap();
        opened
            .channel
            .append_rows(vec![row("3")], &"order_3".into(), &"order_3".into())
            .await
            .unwrap();

        opened
            .channel
            .append_rows(vec![row("1"), row("2")], &"order_1".into(), &"order_2".into())
            .await
            .unwrap();

        assert_eq!(dest.committed_rows("PIPE", "ch").len(), 3);
        assert_eq!(
            dest.latest_committed("PIPE", "ch"),
            Some(OffsetToken::from("order_3"))
        );
    }

    #[tokio::test]
    async fn closed_channel_rejects_appends_and_closes_once() {
        let dest = MemoryDestination::new();
        let mut opened = open(&dest, "ch").await;
        opened.channel.close().await.unwrap();
        opened.channel.close().await.unwrap();
        assert_eq!(dest.channel_close_count(), 1);

        let err = opened
            .channel
            .append_row(row("a"), &"t1".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::InvalidState { .. }));
        assert!(dest.append_calls().is_empty());
    }

    #[tokio::test]
    async fn closed_client_cannot_open_channels() {
        let dest = MemoryDestination::new();
        let mut client = dest
            .create_client(ClientSpec::new("C", "DB", "S", "PIPE"))
            .await
            .unwrap();
        client.close().await.unwrap();
        client.close().await.unwrap();
        assert_eq!(dest.client_close_count(), 1);
        assert!(matches!(
            client.open_channel("ch", None).await,
            Err(ChannelError::ClientClosed(_))
        ));
    }
}
