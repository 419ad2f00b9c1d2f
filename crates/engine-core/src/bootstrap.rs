use crate::{
    error::{BootstrapError, PipelineError},
    session::{IngestionSession, TableStream},
};
use connectors::{
    auth::jwt::KeyPairAuth,
    error::ConnectorError,
    lookup::{
        IdColumn, MaxIdLookup, StaticLookup, error::LookupError, postgres::PgLookup,
        sql_api::SqlApiLookup,
    },
    streaming::{
        channel::{ClientFactory, ClientSpec, IngestClient},
        memory::MemoryDestination,
        rest::{RestClientFactory, RestSettings},
    },
};
use engine_config::settings::{CustomerLookup, Settings, StreamTarget, TransportKind};
use model::{
    core::identifiers::OffsetToken,
    records::{order::Order, order_item::OrderItem, projection::Projection},
};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Committed offsets read back right after the channels were opened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumeOffsets {
    pub orders: Option<OffsetToken>,
    pub order_items: Option<OffsetToken>,
}

pub struct Bootstrapped {
    pub session: IngestionSession,
    pub resume: ResumeOffsets,
}

/// `_instance_<n>` for worker `n`, empty for a standalone run.
pub fn channel_suffix(instance: Option<usize>) -> String {
    instance
        .map(|n| format!("_instance_{n}"))
        .unwrap_or_default()
}

/// Creates one client per table, opens one channel on each and reads back
/// where each channel left off.
pub async fn bootstrap(
    factory: &dyn ClientFactory,
    settings: &Settings,
    instance: Option<usize>,
) -> Result<Bootstrapped, BootstrapError> {
    let run_id = Uuid::new_v4().simple().to_string();
    let suffix = channel_suffix(instance);
    info!(?instance, "Creating streaming clients and opening channels");

    let (orders, orders_offset) =
        open_stream::<Order>(factory, settings, &settings.orders, "ORDERS_CLIENT", &run_id, &suffix)
            .await?;

    let (order_items, items_offset) = match open_stream::<OrderItem>(
        factory,
        settings,
        &settings.order_items,
        "ORDER_ITEMS_CLIENT",
        &run_id,
        &suffix,
    )
    .await
    {
        Ok(opened) => opened,
        Err(err) => {
            let mut orders = orders;
            orders.close_channel().await;
            orders.close_client().await;
            return Err(err);
        }
    };

    info!("All clients and channels initialized");
    Ok(Bootstrapped {
        session: IngestionSession::new(orders, order_items),
        resume: ResumeOffsets {
            orders: orders_offset,
            order_items: items_offset,
        },
    })
}

async fn open_stream<R: Projection>(
    factory: &dyn ClientFactory,
    settings: &Settings,
    target: &StreamTarget,
    client_prefix: &str,
    run_id: &str,
    suffix: &str,
) -> Result<(TableStream<R>, Option<OffsetToken>), BootstrapError> {
    let client_name = format!("{client_prefix}_{run_id}");
    let spec = ClientSpec::new(&client_name, &settings.database, &settings.schema, &target.pipe);
    let mut client = factory
        .create_client(spec)
        .await
        .map_err(|source| BootstrapError::Client {
            client: client_name.clone(),
            source,
        })?;

    let channel_name = format!("{}{suffix}", target.channel);
    let opened = match client.open_channel(&channel_name, None).await {
        Ok(opened) => opened,
        Err(source) => {
            close_quietly(client.as_mut()).await;
            return Err(BootstrapError::OpenChannel {
                channel: channel_name,
                source,
            });
        }
    };

    let channel = opened.channel;
    let latest = match channel.latest_committed_offset_token().await {
        Ok(latest) => latest,
        Err(source) => {
            let mut stream = TableStream::<R>::new(client, channel);
            stream.close_channel().await;
            stream.close_client().await;
            return Err(BootstrapError::ReadOffset {
                channel: channel_name,
                source,
            });
        }
    };
    let stream = TableStream::<R>::new(client, channel);

    match &latest {
        Some(token) => info!(channel = %channel_name, latest = %token, "Channel opened"),
        None => info!(channel = %channel_name, latest = "NULL (new channel)", "Channel opened"),
    }
    Ok((stream, latest))
}

async fn close_quietly(client: &mut dyn IngestClient) {
    if let Err(err) = client.close().await {
        error!(client = client.name(), %err, "Error closing client");
    }
}

/// The destination transport selected by `ingest.transport`.
pub fn client_factory(settings: &Settings) -> Result<Arc<dyn ClientFactory>, PipelineError> {
    match settings.transport {
        TransportKind::Memory => Ok(Arc::new(MemoryDestination::new())),
        TransportKind::Rest => {
            let profile = settings.require_profile()?;
            let auth = KeyPairAuth::from_profile(profile).map_err(ConnectorError::from)?;
            Ok(Arc::new(RestClientFactory::new(
                RestSettings {
                    account_url: profile.base_url(),
                    ingest_url: settings.ingest_url.clone(),
                },
                Arc::new(auth),
            )))
        }
    }
}

/// The max customer id source selected by `customers.lookup`.
pub fn customer_lookup(settings: &Settings) -> Result<Box<dyn MaxIdLookup>, PipelineError> {
    Ok(match &settings.lookup {
        CustomerLookup::Static { max_id } => Box::new(StaticLookup(*max_id)),
        CustomerLookup::Postgres { url } => Box::new(PgLookup::new(url)),
        CustomerLookup::SqlApi => {
            let profile = settings.require_profile()?;
            let auth = KeyPairAuth::from_profile(profile).map_err(LookupError::from)?;
            Box::new(SqlApiLookup::new(profile, Arc::new(auth)))
        }
    })
}

/// Runs the configured max-id query against the customer table.
pub async fn max_customer_id(settings: &Settings) -> Result<Option<i64>, PipelineError> {
    let target = IdColumn::new(&settings.customers_table, &settings.customers_id_column)?;
    let lookup = customer_lookup(settings)?;
    let max_id = lookup.max_id(&target).await?;
    info!(table = target.table(), ?max_id, "Max customer id");
    Ok(max_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_config::properties::Properties;
    use std::path::Path;

    fn settings() -> Settings {
        let props: Properties = "\
pipe.orders.name=ORDERS-STREAMING
pipe.order_items.name=ORDER_ITEMS-STREAMING
channel.orders.name=ORDERS_CHANNEL
channel.order_items.name=ORDER_ITEMS_CHANNEL
ingest.transport=memory
customers.lookup=static
customers.max_id=25
"
        .parse()
        .unwrap();
        Settings::from_sources(props, None, Path::new("profile.json")).unwrap()
    }

    #[tokio::test]
    async fn opens_suffixed_channels_with_unique_clients() {
        let dest = MemoryDestination::new();
        let settings = settings();

        let mut first = bootstrap(&dest, &settings, Some(2)).await.unwrap();
        let mut second = bootstrap(&dest, &settings, Some(2)).await.unwrap();

        assert_eq!(
            dest.channel_names("ORDERS-STREAMING"),
            ["ORDERS_CHANNEL_instance_2"]
        );
        assert_eq!(
            dest.channel_names("ORDER_ITEMS-STREAMING"),
            ["ORDER_ITEMS_CHANNEL_instance_2"]
        );

        let clients = dest.client_names();
        assert_eq!(clients.len(), 4);
        assert!(clients[0].starts_with("ORDERS_CLIENT_"));
        assert!(clients[1].starts_with("ORDER_ITEMS_CLIENT_"));
        assert_ne!(clients[0], clients[2]);

        first.session.close().await;
        second.session.close().await;
    }

    #[tokio::test]
    async fn reads_back_resume_offsets() {
        let dest = MemoryDestination::new();
        dest.seed_channel("ORDERS-STREAMING", "ORDERS_CHANNEL", "order_99".into());

        let mut boot = bootstrap(&dest, &settings(), None).await.unwrap();
        assert_eq!(boot.resume.orders, Some(OffsetToken::from("order_99")));
        assert_eq!(boot.resume.order_items, None);
        boot.session.close().await;
    }

    #[tokio::test]
    async fn static_lookup_comes_from_settings() {
        assert_eq!(max_customer_id(&settings()).await.unwrap(), Some(25));
    }

    #[test]
    fn rest_factory_needs_a_profile() {
        let props: Properties = "\
pipe.orders.name=P
pipe.order_items.name=P2
channel.orders.name=C
channel.order_items.name=C2
ingest.transport=memory
customers.lookup=static
"
        .parse()
        .unwrap();
        let mut settings = Settings::from_sources(props, None, Path::new("profile.json")).unwrap();
        settings.transport = TransportKind::Rest;
        assert!(matches!(
            client_factory(&settings),
            Err(PipelineError::Config(_))
        ));
    }
}
