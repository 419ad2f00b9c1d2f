use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

/// Caller-assigned token the destination uses to dedupe appends and report
/// its resume position. Opaque to the destination; meaningful to us.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OffsetToken(Arc<str>);

impl OffsetToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Arc::from(token.into()))
    }

    /// Builds `<prefix><id>`, e.g. `order_42`.
    pub fn with_prefix(prefix: &str, id: &str) -> Self {
        Self::new(format!("{prefix}{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the part after `prefix`, if the token carries it.
    pub fn strip_prefix(&self, prefix: &str) -> Option<&str> {
        self.0.strip_prefix(prefix)
    }
}

impl fmt::Display for OffsetToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for OffsetToken {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for OffsetToken {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Inclusive token range covered by one batch append.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetRange {
    pub start: OffsetToken,
    pub end: OffsetToken,
}

impl OffsetRange {
    pub fn new(start: OffsetToken, end: OffsetToken) -> Self {
        Self { start, end }
    }

    pub fn single(token: OffsetToken) -> Self {
        Self {
            start: token.clone(),
            end: token,
        }
    }
}

impl fmt::Display for OffsetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_token_round_trips_id() {
        let token = OffsetToken::with_prefix("order_", "17");
        assert_eq!(token.as_str(), "order_17");
        assert_eq!(token.strip_prefix("order_"), Some("17"));
        assert_eq!(token.strip_prefix("item_"), None);
    }

    #[test]
    fn token_serializes_as_plain_string() {
        let token = OffsetToken::from("item_3-42");
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, r#""item_3-42""#);
        assert_eq!(serde_json::from_str::<OffsetToken>(&json).unwrap(), token);
    }
}
