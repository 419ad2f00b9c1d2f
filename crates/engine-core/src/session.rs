use crate::error::SessionError;
use connectors::streaming::{
    channel::{IngestChannel, IngestClient},
    error::ChannelError,
};
use model::{
    core::identifiers::OffsetToken,
    records::{batch::Batch, order::Order, order_item::OrderItem, projection::Projection},
};
use std::marker::PhantomData;
use tracing::{debug, error, info};

/// One destination table: the client and the single channel opened on it.
pub struct TableStream<R> {
    client: Box<dyn IngestClient>,
    channel: Box<dyn IngestChannel>,
    _record: PhantomData<fn(&R)>,
}

impl<R: Projection> TableStream<R> {
    pub fn new(client: Box<dyn IngestClient>, channel: Box<dyn IngestChannel>) -> Self {
        Self {
            client,
            channel,
            _record: PhantomData,
        }
    }

    pub fn channel_name(&self) -> &str {
        self.channel.name()
    }

    pub fn client_name(&self) -> &str {
        self.client.name()
    }

    /// Appends one record under its own token.
    pub async fn insert_one(&mut self, record: &R) -> Result<(), SessionError> {
        let row = record.project();
        row.conforms_to(R::columns())?;
        let token = record.offset_token();

        self.channel
            .append_row(row, &token)
            .await
            .map_err(|source| self.append_error(source))?;
        debug!(table = R::ENTITY, %token, "Row appended");
        Ok(())
    }

    /// One append call covering every record, committed under the tokens of
    /// the first and last record. An empty slice never reaches the
    /// destination. Returns the batch that was sent.
    pub async fn insert_batch(&mut self, records: &[R]) -> Result<Option<Batch>, SessionError> {
        let Some(batch) = Batch::from_records(records) else {
            return Ok(None);
        };
        for row in &batch.rows {
            row.conforms_to(R::columns())?;
        }

        self.channel
            .append_rows(batch.rows.clone(), batch.start(), batch.end())
            .await
            .map_err(|source| self.append_error(source))?;

        debug!(
            table = R::ENTITY,
            rows = batch.len(),
            range = %batch.range,
            "Batch appended"
        );
        Ok(Some(batch))
    }

    /// `None` when the channel has no commits yet.
    pub async fn latest_committed_offset(&self) -> Result<Option<OffsetToken>, SessionError> {
        self.channel
            .latest_committed_offset_token()
            .await
            .map_err(|source| SessionError::Offset {
                table: R::ENTITY,
                source,
            })
    }

    pub async fn close_channel(&mut self) {
        if let Err(err) = self.channel.close().await {
            error!(table = R::ENTITY, channel = self.channel.name(), %err, "Error closing channel");
        }
    }

    pub async fn close_client(&mut self) {
        if let Err(err) = self.client.close().await {
            error!(table = R::ENTITY, client = self.client.name(), %err, "Error closing client");
        }
    }

    fn append_error(&self, source: ChannelError) -> SessionError {
        error!(table = R::ENTITY, channel = self.channel.name(), %source, "Append failed");
        SessionError::Append {
            table: R::ENTITY,
            source,
        }
    }
}

/// Owns the orders and order-items streams of one logical producer.
pub struct IngestionSession {
    orders: TableStream<Order>,
    order_items: TableStream<OrderItem>,
    closed: bool,
}

impl IngestionSession {
    pub fn new(orders: TableStream<Order>, order_items: TableStream<OrderItem>) -> Self {
        Self {
            orders,
            order_items,
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub async fn insert_order(&mut self, order: &Order) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.orders.insert_one(order).await
    }

    pub async fn insert_order_item(&mut self, item: &OrderItem) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.order_items.insert_one(item).await
    }

    pub async fn insert_orders(&mut self, orders: &[Order]) -> Result<Option<Batch>, SessionError> {
        self.ensure_open()?;
        self.orders.insert_batch(orders).await
    }

    pub async fn insert_order_items(
        &mut self,
        items: &[OrderItem],
    ) -> Result<Option<Batch>, SessionError> {
        self.ensure_open()?;
        self.order_items.insert_batch(items).await
    }

    pub async fn latest_order_offset(&self) -> Result<Option<OffsetToken>, SessionError> {
        self.orders.latest_committed_offset().await
    }

    pub async fn latest_order_item_offset(&self) -> Result<Option<OffsetToken>, SessionError> {
        self.order_items.latest_committed_offset().await
    }

    /// Channels first, then clients. Failures are logged and swallowed;
    /// calling this again does nothing.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        self.orders.close_channel().await;
        self.order_items.close_channel().await;
        self.orders.close_client().await;
        self.order_items.close_client().await;
        info!(
            orders = self.orders.channel_name(),
            order_items = self.order_items.channel_name(),
            "Ingestion session closed"
        );
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.closed {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }
}
