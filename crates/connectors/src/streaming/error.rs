use crate::{auth::error::AuthError, streaming::state::ChannelState};
use thiserror::Error;

/// Failures of a single destination call. None of them are retried locally.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The channel is not in a state that allows the requested call.
    #[error("Channel {channel} is {state}, expected OPEN")]
    InvalidState { channel: String, state: ChannelState },

    /// The owning client was closed before the call.
    #[error("Client {0} is closed")]
    ClientClosed(String),

    /// The destination refused the append.
    #[error("Append to {channel} rejected: {reason}")]
    Rejected { channel: String, reason: String },

    /// The destination answered with a non-success status.
    #[error("{channel}: destination returned {status}: {body}")]
    Status {
        channel: String,
        status: u16,
        body: String,
    },

    /// The destination answered with something we could not interpret.
    #[error("{channel}: malformed response: {reason}")]
    MalformedResponse { channel: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to encode rows: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}
