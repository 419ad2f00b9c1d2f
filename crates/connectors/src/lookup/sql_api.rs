use crate::{
    auth::jwt::{KeyPairAuth, TOKEN_TYPE_HEADER, TOKEN_TYPE_KEYPAIR_JWT},
    lookup::{IdColumn, MaxIdLookup, error::LookupError},
    profile::ConnectionProfile,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::info;

const STATEMENT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    statement: String,
    timeout: u64,
    database: &'a str,
    schema: &'a str,
    warehouse: &'a str,
    role: &'a str,
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    #[serde(default)]
    data: Vec<Vec<JsonValue>>,
}

/// Runs the max-id query through the warehouse's SQL statement endpoint.
pub struct SqlApiLookup {
    http: reqwest::Client,
    base_url: String,
    auth: Arc<KeyPairAuth>,
    profile: ConnectionProfile,
}

impl SqlApiLookup {
    pub fn new(profile: &ConnectionProfile, auth: Arc<KeyPairAuth>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: profile.base_url(),
            auth,
            profile: profile.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/v2/statements", self.base_url)
    }
}

#[async_trait]
impl MaxIdLookup for SqlApiLookup {
    async fn max_id(&self, target: &IdColumn) -> Result<Option<i64>, LookupError> {
        let request = StatementRequest {
            statement: target.max_query(),
            timeout: STATEMENT_TIMEOUT_SECS,
            database: &self.profile.database,
            schema: &self.profile.schema,
            warehouse: &self.profile.warehouse,
            role: &self.profile.role,
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(self.auth.token()?)
            .header(TOKEN_TYPE_HEADER, TOKEN_TYPE_KEYPAIR_JWT)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(LookupError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.json::<StatementResponse>().await?;
        let max_id = parse_max_id(&body.data)?;
        info!(table = target.table(), column = target.column(), ?max_id, "Max id lookup");
        Ok(max_id)
    }
}

/// The statement API returns every cell as a string; SQL NULL comes back
/// as JSON null.
fn parse_max_id(data: &[Vec<JsonValue>]) -> Result<Option<i64>, LookupError> {
    let cell = data
        .first()
        .and_then(|row| row.first())
        .ok_or_else(|| LookupError::UnexpectedResult("empty result set".to_string()))?;

    match cell {
        JsonValue::Null => Ok(None),
        JsonValue::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| LookupError::UnexpectedResult(s.clone())),
        JsonValue::Number(n) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| LookupError::UnexpectedResult(n.to_string())),
        other => Err(LookupError::UnexpectedResult(other.to_string())),
    }
}
