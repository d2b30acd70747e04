//! Error types for file-cache.

use file_core::ConsistencyError;
use file_types::EventError;
use thiserror::Error;

/// Errors returned when ingesting an event.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The event does not fit the replica; resync the file.
    #[error("consistency error: {0}")]
    Consistency(#[from] ConsistencyError),

    /// The event could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] EventError),

    /// The cache no longer accepts events.
    #[error("file cache has been disposed")]
    Disposed,
}

/// Errors returned to consumers waiting for a file version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// The file closed while the wait was outstanding.
    #[error("file closed at requested version: {file_path}")]
    FileClosed {
        /// The file.
        file_path: String,
    },

    /// The file is at a different version than requested.
    ///
    /// Either the requested version was already superseded or a version
    /// was skipped. Any result derived from it must be discarded.
    #[error("file {file_path} at unexpected version: requested {requested}, actual {actual}")]
    VersionMismatch {
        /// The file.
        file_path: String,
        /// Version the caller asked for.
        requested: u64,
        /// Version the replica holds.
        actual: u64,
    },

    /// The cache was disposed before the version arrived.
    #[error("file cache has been disposed")]
    Disposed,
}

/// Result type alias for event ingestion.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consistency_error_converts() {
        let err: CacheError = ConsistencyError::NotOpen {
            file_path: "/a".into(),
        }
        .into();
        assert!(matches!(err, CacheError::Consistency(_)));
        assert_eq!(err.to_string(), "consistency error: file is not open: /a");
    }

    #[test]
    fn protocol_error_converts() {
        let err: CacheError = EventError::UnknownKind("rename".into()).into();
        assert!(matches!(err, CacheError::Protocol(_)));
        assert!(err.to_string().contains("rename"));
    }

    #[test]
    fn read_error_display() {
        let err = ReadError::VersionMismatch {
            file_path: "/a".into(),
            requested: 3,
            actual: 4,
        };
        assert_eq!(
            err.to_string(),
            "file /a at unexpected version: requested 3, actual 4"
        );
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CacheError>();
        assert_send_sync::<ReadError>();
    }
}
