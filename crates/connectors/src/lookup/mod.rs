use crate::lookup::error::LookupError;
use async_trait::async_trait;

pub mod error;
pub mod postgres;
pub mod sql_api;

/// A table/column pair whose maximum value seeds synthetic id ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdColumn {
    table: String,
    column: String,
}

impl IdColumn {
    /// `table` may be qualified (`DB.SCHEMA.TABLE`). Every part must be a
    /// plain identifier since both end up inside the query text.
    pub fn new(table: &str, column: &str) -> Result<Self, LookupError> {
        if table.split('.').any(|part| !is_plain_identifier(part)) {
            return Err(LookupError::InvalidIdentifier(table.to_string()));
        }
        if !is_plain_identifier(column) {
            return Err(LookupError::InvalidIdentifier(column.to_string()));
        }

        Ok(Self {
            table: table.to_string(),
            column: column.to_string(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn max_query(&self) -> String {
        format!("SELECT MAX({}) AS MAX_ID FROM {}", self.column, self.table)
    }
}

fn is_plain_identifier(part: &str) -> bool {
    !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Read-only `SELECT MAX(col)` lookup run once at startup.
#[async_trait]
pub trait MaxIdLookup: Send + Sync {
    /// `None` means the table is empty.
    async fn max_id(&self, target: &IdColumn) -> Result<Option<i64>, LookupError>;
}

/// Fixed answer taken from configuration; used for dry runs.
#[derive(Debug, Clone, Copy)]
pub struct StaticLookup(pub Option<i64>);

#[async_trait]
impl MaxIdLookup for StaticLookup {
    async fn max_id(&self, _target: &IdColumn) -> Result<Option<i64>, LookupError> {
        Ok(self.0)
    }
}
