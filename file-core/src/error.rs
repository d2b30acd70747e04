//! Error types for replica validation.

use file_types::{Point, Range};
use thiserror::Error;

/// A range could not be resolved against a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// `start` comes after `end`.
    #[error("range {range} is reversed")]
    Reversed {
        /// The offending range.
        range: Range,
    },

    /// The row is past the last line of the buffer.
    #[error("row {row} is out of bounds (buffer has {line_count} lines)")]
    RowOutOfBounds {
        /// Requested row.
        row: u32,
        /// Number of lines in the buffer.
        line_count: usize,
    },

    /// The column is past the end of its line.
    #[error("column {} is out of bounds at {point} (line has {line_len} chars)", .point.column)]
    ColumnOutOfBounds {
        /// Requested point.
        point: Point,
        /// Length of the line, excluding its terminator.
        line_len: usize,
    },
}

/// An incoming event does not fit the current replica state.
///
/// The event is rejected without touching the replica. Only the named file
/// is affected; the client recovers by sending a `sync` for it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsistencyError {
    /// `open` for a file that already has a replica.
    #[error("file is already open: {file_path}")]
    AlreadyOpen {
        /// The file.
        file_path: String,
    },

    /// `close` or `edit` for a file without a replica.
    #[error("file is not open: {file_path}")]
    NotOpen {
        /// The file.
        file_path: String,
    },

    /// An edit's version is not the replica's version plus one.
    #[error("version mismatch for {file_path}: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The file.
        file_path: String,
        /// The only version the next edit may carry.
        expected: u64,
        /// The version the edit carried.
        actual: u64,
    },

    /// The text inside `old_range` differs from the edit's `old_text`.
    #[error("text mismatch for {file_path} at {range}: expected {expected:?}, found {actual:?}")]
    TextMismatch {
        /// The file.
        file_path: String,
        /// The edit's `old_range`.
        range: Range,
        /// The edit's `old_text`.
        expected: String,
        /// What the replica holds in that range.
        actual: String,
    },

    /// The edit's `old_range` does not exist in the replica.
    #[error("invalid edit range for {file_path}: {source}")]
    InvalidRange {
        /// The file.
        file_path: String,
        /// Why the range could not be resolved.
        #[source]
        source: RangeError,
    },
}

impl ConsistencyError {
    /// The file the rejected event was addressed to.
    pub fn file_path(&self) -> &str {
        match self {
            ConsistencyError::AlreadyOpen { file_path }
            | ConsistencyError::NotOpen { file_path }
            | ConsistencyError::VersionMismatch { file_path, .. }
            | ConsistencyError::TextMismatch { file_path, .. }
            | ConsistencyError::InvalidRange { file_path, .. } => file_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_mismatch_display() {
        let err = ConsistencyError::VersionMismatch {
            file_path: "/a".into(),
            expected: 2,
            actual: 1,
        };
        assert_eq!(err.to_string(), "version mismatch for /a: expected 2, got 1");
        assert_eq!(err.file_path(), "/a");
    }

    #[test]
    fn invalid_range_keeps_source() {
        let err = ConsistencyError::InvalidRange {
            file_path: "/b".into(),
            source: RangeError::RowOutOfBounds {
                row: 9,
                line_count: 1,
            },
        };
        assert!(err.to_string().contains("row 9 is out of bounds"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn column_error_display() {
        let err = RangeError::ColumnOutOfBounds {
            point: Point::new(0, 7),
            line_len: 5,
        };
        assert_eq!(
            err.to_string(),
            "column 7 is out of bounds at 0:7 (line has 5 chars)"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ConsistencyError>();
    }
}
