//! Error types for event encoding and decoding.

use thiserror::Error;

/// Errors that can occur while encoding or decoding file events.
#[derive(Debug, Error)]
pub enum EventError {
    /// MessagePack serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] rmp_serde::encode::Error),

    /// MessagePack deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] rmp_serde::decode::Error),

    /// JSON encoding or decoding failed
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The event carried a `kind` tag this protocol does not know.
    ///
    /// This is an unrecoverable protocol error; the sender and receiver
    /// disagree on the event vocabulary.
    #[error("unexpected file event kind: {0}")]
    UnknownKind(String),
}
