//! Errors raised while handling client frames.

use thiserror::Error;

use crate::connection::ConnectionId;

/// Failure to process one inbound frame. Always scoped to the connection
/// that sent it.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message is not a JSON array with a type tag")]
    NotArray,

    #[error("{kind} message is missing {field}")]
    Missing {
        kind: &'static str,
        field: &'static str,
    },

    #[error("invalid event: {0}")]
    InvalidEvent(serde_json::Error),

    #[error("connection {0} is closed")]
    ConnectionClosed(ConnectionId),
}

impl RelayError {
    /// True for errors caused by the frame contents rather than connection
    /// state.
    pub fn is_parse_error(&self) -> bool {
        !matches!(self, RelayError::ConnectionClosed(_))
    }
}
