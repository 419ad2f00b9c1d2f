use crate::{
    error::ConnectorError,
    lookup::{IdColumn, MaxIdLookup, error::LookupError},
};
use async_trait::async_trait;
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tokio_postgres::{Client, Config, NoTls, config::SslMode};
use tracing::{error, info, warn};

/// Max-id lookup against a Postgres mirror of the customer table.
pub struct PgLookup {
    url: String,
}

impl PgLookup {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl MaxIdLookup for PgLookup {
    async fn max_id(&self, target: &IdColumn) -> Result<Option<i64>, LookupError> {
        let client = connect_client(&self.url).await?;
        let query = format!(
            "SELECT MAX({})::BIGINT AS max_id FROM {}",
            target.column(),
            target.table()
        );

        let row = client.query_one(query.as_str(), &[]).await?;
        let max_id: Option<i64> = row.try_get(0)?;
        info!(table = target.table(), column = target.column(), ?max_id, "Max id lookup");
        Ok(max_id)
    }
}

pub(crate) async fn connect_client(url: &str) -> Result<Client, ConnectorError> {
    let config = url
        .parse::<Config>()
        .map_err(|e| ConnectorError::InvalidUrl(e.to_string()))?;

    match config.get_ssl_mode() {
        SslMode::Disable => connect_without_tls(config).await,
        SslMode::Prefer => match connect_with_tls(config.clone()).await {
            Ok(client) => Ok(client),
            Err(error) => {
                warn!(%error, "Postgres TLS handshake failed, retrying without TLS");
                connect_without_tls(config).await
            }
        },
        _ => connect_with_tls(config).await,
    }
}

async fn connect_with_tls(config: Config) -> Result<Client, ConnectorError> {
    let tls = MakeTlsConnector::new(TlsConnector::builder().build()?);
    let (client, connection) = config.connect(tls).await?;
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            error!(%err, "Postgres connection error");
        }
    });
    Ok(client)
}

async fn connect_without_tls(config: Config) -> Result<Client, ConnectorError> {
    let (client, connection) = config.connect(NoTls).await?;
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            error!(%err, "Postgres connection error");
        }
    });
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn malformed_url_is_reported_before_connecting() {
        let lookup = PgLookup::new("postgres://user@host:notaport/db");
        let target = IdColumn::new("customers", "customer_id").unwrap();
        let err = lookup.max_id(&target).await.unwrap_err();
        assert!(matches!(
            err,
            LookupError::Connector(ConnectorError::InvalidUrl(_))
        ));
    }
}
