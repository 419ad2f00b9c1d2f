use crate::{
    bootstrap::bootstrap,
    error::PipelineError,
    generator::OrderGenerator,
    id_tracker::IdTracker,
    metrics::Metrics,
    session::IngestionSession,
};
use connectors::streaming::channel::ClientFactory;
use engine_config::settings::Settings;
use model::records::{order::Order, order_item::OrderItem};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::Serialize;
use std::{ops::RangeInclusive, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// What one producer streams: how many orders, for which customers, and
/// under which instance number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamJob {
    pub instance: Option<usize>,
    pub num_orders: usize,
    pub customers: RangeInclusive<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub orders: usize,
    pub items: usize,
    pub batches: usize,
    pub cancelled: bool,
    pub last_order_offset: Option<String>,
    pub last_item_offset: Option<String>,
}

/// Customer ids `1..=max_id`. An empty table cannot be streamed against.
pub fn customer_range(max_id: Option<i64>) -> Result<RangeInclusive<i32>, PipelineError> {
    match max_id {
        Some(max) if max >= 1 => {
            let max = i32::try_from(max).map_err(|_| {
                PipelineError::Partition(format!("max customer id {max} exceeds INT range"))
            })?;
            Ok(1..=max)
        }
        _ => Err(PipelineError::NoCustomers),
    }
}

/// Generates orders batch by batch and hands each batch to the session:
/// orders first, then all of their items.
pub struct StreamingApp<'a, R> {
    session: &'a mut IngestionSession,
    generator: OrderGenerator<R>,
    batch_size: usize,
    metrics: Metrics,
    cancel: CancellationToken,
}

impl<'a, R: Rng> StreamingApp<'a, R> {
    pub fn new(
        session: &'a mut IngestionSession,
        generator: OrderGenerator<R>,
        batch_size: usize,
        metrics: Metrics,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session,
            generator,
            batch_size: batch_size.max(1),
            metrics,
            cancel,
        }
    }

    /// Stops between batches once cancelled; a batch already handed to the
    /// session always completes or fails as a whole.
    pub async fn run(&mut self, num_orders: usize) -> Result<RunSummary, PipelineError> {
        let customers = self.generator.customers().clone();
        info!(
            num_orders,
            batch_size = self.batch_size,
            customers = ?customers,
            "Starting to generate and stream orders"
        );

        let mut summary = RunSummary::default();
        while summary.orders < num_orders {
            if self.cancel.is_cancelled() {
                warn!(streamed = summary.orders, num_orders, "Streaming cancelled");
                summary.cancelled = true;
                break;
            }

            let current = self.batch_size.min(num_orders - summary.orders);
            let (orders, items) = self.generator.generate_batch(current);

            if let Err(err) = self.append(&orders, &items).await {
                self.metrics.increment_failures(1);
                error!(position = summary.orders, %err, "Error streaming order batch");
                return Err(err);
            }

            summary.orders += orders.len();
            summary.items += items.len();
            summary.batches += 1;
            info!(
                "Progress: {}/{} orders streamed ({} order items)",
                summary.orders,
                num_orders,
                items.len()
            );
        }

        summary.last_order_offset = self
            .session
            .latest_order_offset()
            .await?
            .map(|t| t.to_string());
        summary.last_item_offset = self
            .session
            .latest_order_item_offset()
            .await?
            .map(|t| t.to_string());
        info!(
            orders = summary.last_order_offset.as_deref().unwrap_or("NULL"),
            order_items = summary.last_item_offset.as_deref().unwrap_or("NULL"),
            "Offset token status"
        );

        Ok(summary)
    }

    async fn append(
        &mut self,
        orders: &[Order],
        items: &[OrderItem],
    ) -> Result<(), PipelineError> {
        if let Some(batch) = self.session.insert_orders(orders).await? {
            self.metrics.increment_orders(batch.len() as u64);
            self.metrics.increment_bytes(batch.size_bytes() as u64);
            self.metrics.increment_batches(1);
        }
        if let Some(batch) = self.session.insert_order_items(items).await? {
            self.metrics.increment_items(batch.len() as u64);
            self.metrics.increment_bytes(batch.size_bytes() as u64);
            self.metrics.increment_batches(1);
        }
        Ok(())
    }
}

/// Bootstraps a session, resumes ids from its channels, streams the job
/// and always closes the session afterwards.
pub async fn run_job(
    factory: &dyn ClientFactory,
    settings: &Settings,
    job: StreamJob,
    metrics: Metrics,
    cancel: CancellationToken,
) -> Result<RunSummary, PipelineError> {
    let boot = bootstrap(factory, settings, job.instance).await?;
    let ids = Arc::new(IdTracker::resume(
        boot.resume.orders.as_ref(),
        boot.resume.order_items.as_ref(),
        job.instance,
    ));
    let generator = OrderGenerator::new(StdRng::from_entropy(), ids, job.customers);

    let mut session = boot.session;
    let result = StreamingApp::new(&mut session, generator, settings.batch_size, metrics, cancel)
        .run(job.num_orders)
        .await;
    session.close().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::streaming::memory::MemoryDestination;
    use engine_config::properties::Properties;
    use std::path::Path;

    fn settings(batch_size: usize) -> Settings {
        let props: Properties = format!(
            "pipe.orders.name=ORDERS-STREAMING
pipe.order_items.name=ORDER_ITEMS-STREAMING
channel.orders.name=ORDERS_CHANNEL
channel.order_items.name=ORDER_ITEMS_CHANNEL
ingest.transport=memory
customers.lookup=static
orders.batch.size={batch_size}
"
        )
        .parse()
        .unwrap();
        Settings::from_sources(props, None, Path::new("profile.json")).unwrap()
    }

    fn job(num_orders: usize) -> StreamJob {
        StreamJob {
            instance: None,
            num_orders,
            customers: 1..=10,
        }
    }

    #[test]
    fn customer_range_requires_customers() {
        assert_eq!(customer_range(Some(40)).unwrap(), 1..=40);
        assert!(matches!(customer_range(None), Err(PipelineError::NoCustomers)));
        assert!(matches!(customer_range(Some(0)), Err(PipelineError::NoCustomers)));
    }

    #[tokio::test]
    async fn streams_in_batches_orders_before_items() {
        let dest = MemoryDestination::new();
        let metrics = Metrics::new();

        let summary = run_job(&dest, &settings(4), job(10), metrics.clone(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.orders, 10);
        assert_eq!(summary.batches, 3);
        assert!(!summary.cancelled);
        assert_eq!(summary.last_order_offset.as_deref(), Some("order_10"));

        let calls = dest.append_calls();
        let pipes = calls.iter().map(|c| c.pipe.as_str()).collect::<Vec<_>>();
        assert_eq!(
            pipes,
            [
                "ORDERS-STREAMING",
                "ORDER_ITEMS-STREAMING",
                "ORDERS-STREAMING",
                "ORDER_ITEMS-STREAMING",
                "ORDERS-STREAMING",
                "ORDER_ITEMS-STREAMING",
            ]
        );
        assert_eq!(calls[0].rows.len(), 4);
        assert_eq!(calls[4].rows.len(), 2);

        let snap = metrics.snapshot();
        assert_eq!(snap.orders_streamed, 10);
        assert_eq!(snap.items_streamed as usize, summary.items);
        assert_eq!(dest.channel_close_count(), 2);
    }

    #[tokio::test]
    async fn second_run_resumes_ids_from_committed_offsets() {
        let dest = MemoryDestination::new();
        let settings = settings(100);

        run_job(&dest, &settings, job(3), Metrics::new(), CancellationToken::new())
            .await
            .unwrap();
        let summary = run_job(&dest, &settings, job(2), Metrics::new(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.last_order_offset.as_deref(), Some("order_5"));
        let committed = dest.committed_rows("ORDERS-STREAMING", "ORDERS_CHANNEL");
        let ids = committed
            .iter()
            .map(|r| r.get_value("ORDER_ID").as_string().unwrap_or_default())
            .collect::<Vec<_>>();
        assert_eq!(ids, ["1", "2", "3", "4", "5"]);
    }

    #[tokio::test]
    async fn cancelled_run_stops_before_next_batch_and_closes() {
        let dest = MemoryDestination::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = run_job(&dest, &settings(5), job(20), Metrics::new(), cancel)
            .await
            .unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.orders, 0);
        assert!(dest.append_calls().is_empty());
        assert_eq!(dest.client_close_count(), 2);
    }

    #[tokio::test]
    async fn failed_batch_stops_the_run() {
        let dest = MemoryDestination::new();
        let settings = settings(5);
        let mut boot = bootstrap(&dest, &settings, None).await.unwrap();
        let ids = Arc::new(IdTracker::resume(None, None, None));
        let generator = OrderGenerator::new(StdRng::seed_from_u64(1), ids, 1..=10);
        let metrics = Metrics::new();

        dest.fail_next_append("rejected");
        let result = StreamingApp::new(
            &mut boot.session,
            generator,
            5,
            metrics.clone(),
            CancellationToken::new(),
        )
        .run(20)
        .await;

        assert!(matches!(result, Err(PipelineError::Session(_))));
        assert_eq!(dest.append_calls().len(), 1);
        assert_eq!(metrics.snapshot().failure_count, 1);
        boot.session.close().await;
    }
}
