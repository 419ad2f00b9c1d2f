use crate::{
    error::PipelineError,
    metrics::{Metrics, MetricsSnapshot},
    pipeline::{RunSummary, StreamJob, run_job},
};
use connectors::streaming::channel::ClientFactory;
use engine_config::settings::Settings;
use serde::Serialize;
use std::{collections::HashMap, sync::Arc, time::Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Splits `total_orders` and the customer range `1..=max_customer_id`
/// across `instances` workers. The last worker takes the remainders.
pub fn partition(
    total_orders: usize,
    instances: usize,
    max_customer_id: i32,
) -> Result<Vec<StreamJob>, PipelineError> {
    if instances == 0 {
        return Err(PipelineError::Partition(
            "at least one instance is required".to_string(),
        ));
    }
    let customers_per_instance = max_customer_id / instances as i32;
    if customers_per_instance < 1 {
        return Err(PipelineError::Partition(format!(
            "{instances} instances cannot share {max_customer_id} customers"
        )));
    }
    let orders_per_instance = total_orders / instances;

    Ok((0..instances)
        .map(|i| {
            let last = i == instances - 1;
            let start = i as i32 * customers_per_instance + 1;
            let end = if last {
                max_customer_id
            } else {
                (i as i32 + 1) * customers_per_instance
            };
            StreamJob {
                instance: Some(i),
                num_orders: if last {
                    total_orders - orders_per_instance * i
                } else {
                    orders_per_instance
                },
                customers: start..=end,
            }
        })
        .collect())
}

#[derive(Debug, Clone, Serialize)]
pub struct InstanceReport {
    pub instance: usize,
    pub orders_generated: usize,
    pub items_generated: usize,
    pub duration_ms: u128,
    pub summary: Option<RunSummary>,
    pub error: Option<String>,
}

impl InstanceReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorReport {
    pub instances: Vec<InstanceReport>,
    pub metrics: MetricsSnapshot,
}

impl OrchestratorReport {
    pub fn failed(&self) -> usize {
        self.instances.iter().filter(|r| !r.succeeded()).count()
    }

    pub fn total_orders(&self) -> usize {
        self.instances.iter().map(|r| r.orders_generated).sum()
    }
}

/// Runs every job as its own task with its own session. A failing or
/// panicking instance does not stop the others; it shows up as a failed
/// entry in the report.
pub async fn run_parallel(
    factory: Arc<dyn ClientFactory>,
    settings: Arc<Settings>,
    jobs: Vec<StreamJob>,
    cancel: CancellationToken,
) -> Result<OrchestratorReport, PipelineError> {
    let metrics = Metrics::new();
    let mut tasks = JoinSet::new();
    let mut instances = HashMap::new();

    for job in jobs {
        let Some(instance) = job.instance else {
            return Err(PipelineError::Partition(
                "parallel jobs need an instance number".to_string(),
            ));
        };
        info!(
            instance,
            orders = job.num_orders,
            customers = ?job.customers,
            "Instance submitted"
        );

        let factory = factory.clone();
        let settings = settings.clone();
        let metrics = metrics.clone();
        let cancel = cancel.child_token();
        let started = Instant::now();
        let handle = tasks.spawn(async move {
            let result = run_job(factory.as_ref(), &settings, job, metrics, cancel).await;
            (instance, started.elapsed().as_millis(), result)
        });
        instances.insert(handle.id(), (instance, started));
    }

    let mut reports = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (instance, duration_ms, result) = match joined {
            Ok((instance, duration_ms, result)) => {
                (instance, duration_ms, result.map_err(|err| err.to_string()))
            }
            Err(join_err) => {
                let Some(&(instance, started)) = instances.get(&join_err.id()) else {
                    error!(%join_err, "Unknown instance task failed");
                    continue;
                };
                metrics.increment_failures(1);
                let reason = format!("Instance task failed: {join_err}");
                (instance, started.elapsed().as_millis(), Err(reason))
            }
        };
        let report = match result {
            Ok(summary) => {
                info!(instance, orders = summary.orders, duration_ms, "Instance completed");
                InstanceReport {
                    instance,
                    orders_generated: summary.orders,
                    items_generated: summary.items,
                    duration_ms,
                    summary: Some(summary),
                    error: None,
                }
            }
            Err(err) => {
                error!(instance, %err, "Instance failed");
                InstanceReport {
                    instance,
                    orders_generated: 0,
                    items_generated: 0,
                    duration_ms,
                    summary: None,
                    error: Some(err),
                }
            }
        };
        reports.push(report);
    }
    reports.sort_by_key(|r| r.instance);

    let report = OrchestratorReport {
        instances: reports,
        metrics: metrics.snapshot(),
    };
    info!(
        successful = report.instances.len() - report.failed(),
        failed = report.failed(),
        total_orders = report.total_orders(),
        "Parallel streaming completed"
    );
    Ok(report)
}
