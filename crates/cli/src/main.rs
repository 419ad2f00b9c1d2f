use crate::{
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use commands::Commands;
use connectors::auth::jwt::KeyPairAuth;
use engine_config::settings::Settings;
use engine_core::{
    bootstrap::{bootstrap, client_factory, max_customer_id},
    metrics::Metrics,
    orchestrator::{partition, run_parallel},
    pipeline::{StreamJob, customer_range, run_job},
};
use std::{collections::BTreeMap, path::PathBuf, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(
    name = "tributary",
    version = "0.1.0",
    about = "Batched order ingestion into warehouse streaming channels"
)]
struct Cli {
    #[arg(long, global = true, default_value = "config.properties")]
    config: PathBuf,

    #[arg(long, global = true, default_value = "profile.json")]
    profile: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let shutdown = ShutdownCoordinator::new(CancellationToken::new());
    shutdown.register_handlers();

    let code = match run(cli, &shutdown).await {
        Ok(()) if shutdown.is_shutdown_requested() => ExitCode::ShutdownRequested,
        Ok(()) => ExitCode::Success,
        Err(CliError::ShutdownRequested) => ExitCode::ShutdownRequested,
        Err(err) => {
            error!(%err, "Application error");
            ExitCode::GeneralError
        }
    };
    std::process::exit(code.as_i32());
}

async fn run(cli: Cli, shutdown: &ShutdownCoordinator) -> Result<(), CliError> {
    let settings = Settings::load(&cli.config, &cli.profile)?;

    match cli.command {
        Commands::Stream { num_orders } => {
            let customers = customer_range(max_customer_id(&settings).await?)?;
            let factory = client_factory(&settings)?;
            let job = StreamJob {
                instance: None,
                num_orders: num_orders.unwrap_or(settings.num_orders),
                customers,
            };

            let summary = run_job(
                factory.as_ref(),
                &settings,
                job,
                Metrics::new(),
                shutdown.cancel_token(),
            )
            .await?;

            if summary.cancelled {
                return Err(CliError::ShutdownRequested);
            }
            info!(
                orders = summary.orders,
                items = summary.items,
                "Application completed successfully"
            );
        }
        Commands::Parallel {
            total_orders,
            instances,
            output,
        } => {
            info!(total_orders, instances, "Parallel streaming orchestrator");
            let customers = customer_range(max_customer_id(&settings).await?)?;
            let jobs = partition(total_orders, instances, *customers.end())?;
            let factory = client_factory(&settings)?;

            let report =
                run_parallel(factory, Arc::new(settings), jobs, shutdown.cancel_token()).await?;

            match output {
                Some(path) => output::write_report(&report, &path).await?,
                None => output::print_report(&report)?,
            }

            let failed = report.failed();
            if failed > 0 {
                return Err(CliError::InstancesFailed {
                    failed,
                    total: report.instances.len(),
                });
            }
        }
        Commands::Offsets { instance, json } => {
            let factory = client_factory(&settings)?;
            let mut boot = bootstrap(factory.as_ref(), &settings, instance).await?;
            boot.session.close().await;

            let mut rows = BTreeMap::new();
            rows.insert(
                "orders".to_string(),
                token_or_null(boot.resume.orders.as_ref()),
            );
            rows.insert(
                "order_items".to_string(),
                token_or_null(boot.resume.order_items.as_ref()),
            );

            if json {
                output::print_report(&rows)?;
            } else {
                output::print_table("Latest committed offsets:", &rows);
            }
        }
        Commands::MaxId => match max_customer_id(&settings).await? {
            Some(max_id) => println!("{max_id}"),
            None => println!("NULL"),
        },
        Commands::Fingerprint => {
            let auth = KeyPairAuth::from_profile(settings.require_profile()?)?;
            println!("{}", auth.fingerprint());
            println!("{}", auth.issuer());
        }
        Commands::Config { json } => {
            let summary = settings.summary();
            if json {
                output::print_report(&summary)?;
            } else {
                output::print_table("Effective configuration:", &summary);
            }
        }
    }

    Ok(())
}

fn token_or_null(token: Option<&model::core::identifiers::OffsetToken>) -> String {
    token
        .map(ToString::to_string)
        .unwrap_or_else(|| "NULL (new channel)".to_string())
}
