//! Shared error types for decoding frames off the wire.

use thiserror::Error;

/// A frame that could not be turned into a [`crate::ServerMessage`].
///
/// Protocol errors are a developer concern only: the client logs them and
/// keeps processing, it never surfaces them to the dashboard.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame is not JSON, or has no string `type` field.
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),
    /// The envelope was fine but the payload does not match its type.
    #[error("invalid `{kind}` payload: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ProtocolError {
    pub(crate) fn payload(kind: &str, source: serde_json::Error) -> Self {
        ProtocolError::InvalidPayload {
            kind: kind.to_string(),
            source,
        }
    }
}
