//! Request and response bodies of the streaming REST endpoints.

use model::records::row::RowData;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Serialize)]
pub(crate) struct OpenChannelRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenChannelResponse {
    pub next_continuation_token: String,
    #[serde(default)]
    pub channel_status: ChannelStatusBody,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChannelStatusBody {
    #[serde(
        default,
        alias = "committed_offset_token",
        alias = "latest_committed_offset_token"
    )]
    pub last_committed_offset_token: Option<String>,
    #[serde(default)]
    pub channel_status_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AppendRowsResponse {
    pub next_continuation_token: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct BulkStatusRequest<'a> {
    pub channel_names: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkStatusResponse {
    #[serde(default)]
    pub channel_statuses: HashMap<String, ChannelStatusBody>,
}

/// One JSON object per line, no trailing newline.
pub(crate) fn encode_ndjson(rows: &[RowData]) -> Result<String, serde_json::Error> {
    let lines = rows
        .iter()
        .map(|row| serde_json::to_string(&row.to_json()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::core::value::{FieldValue, Value};

    #[test]
    fn open_request_omits_missing_token() {
        let body = serde_json::to_string(&OpenChannelRequest { offset_token: None }).unwrap();
        assert_eq!(body, "{}");
    }

    #[test]
    fn status_accepts_either_token_field_name() {
        let a: ChannelStatusBody =
            serde_json::from_str(r#"{"committed_offset_token":"order_9"}"#).unwrap();
        let b: ChannelStatusBody =
            serde_json::from_str(r#"{"last_committed_offset_token":"order_9"}"#).unwrap();
        assert_eq!(a.last_committed_offset_token.as_deref(), Some("order_9"));
        assert_eq!(b.last_committed_offset_token.as_deref(), Some("order_9"));
    }

    #[test]
    fn encodes_one_line_per_row() {
        let rows = vec![
            RowData::new("T", vec![FieldValue::new("ID", Value::from("a"))]),
            RowData::new("T", vec![FieldValue::new("ID", Value::from("b"))]),
        ];
        let body = encode_ndjson(&rows).unwrap();
        assert_eq!(body, "{\"ID\":\"a\"}\n{\"ID\":\"b\"}");
    }
}
