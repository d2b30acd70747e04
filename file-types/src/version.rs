//! File version identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one specific state of a file.
///
/// `version` is the file's change counter: it grows by exactly one per
/// applied edit and only jumps when the file is (re)opened or resynced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileVersion {
    /// Path of the file on the remote host.
    pub file_path: String,
    /// Change counter of the file at this state.
    pub version: u64,
}

impl FileVersion {
    /// Create a new file version.
    pub fn new(file_path: impl Into<String>, version: u64) -> Self {
        Self {
            file_path: file_path.into(),
            version,
        }
    }
}

impl fmt::Display for FileVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.file_path, self.version)
    }
}
