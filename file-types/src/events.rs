//! File events.
//!
//! [`FileEvent`] is what the editing client sends. [`LocalFileEvent`] is the
//! canonical form the server republishes: the same shapes minus `sync`,
//! which is always translated into an `open` or a whole-buffer `edit`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{EventError, FileVersion, Range};

/// A file was opened with the given contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOpen {
    /// Path and starting version.
    pub file_version: FileVersion,
    /// Full text of the file.
    pub contents: String,
}

/// A file was closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileClose {
    /// Path and the version the file was at when closed.
    pub file_version: FileVersion,
}

/// A single range replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEdit {
    /// Path and the version after this edit.
    pub file_version: FileVersion,
    /// Span replaced, in coordinates before the edit.
    pub old_range: Range,
    /// Text that occupied `old_range` before the edit.
    pub old_text: String,
    /// Span of the inserted text, in coordinates after the edit.
    pub new_range: Range,
    /// Text inserted in place of `old_text`.
    pub new_text: String,
}

/// Out-of-band resynchronization with the full buffer contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSync {
    /// Path and the version the contents correspond to.
    pub file_version: FileVersion,
    /// Full text of the file.
    pub contents: String,
}

/// Events received from the editing client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FileEvent {
    /// File opened
    Open(FileOpen),
    /// File closed
    Close(FileClose),
    /// Incremental edit
    Edit(FileEdit),
    /// Full resync
    Sync(FileSync),
}

/// Canonical events published by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LocalFileEvent {
    /// File opened
    Open(FileOpen),
    /// File closed
    Close(FileClose),
    /// Incremental edit
    Edit(FileEdit),
}

/// The `kind` tag of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `open`
    Open,
    /// `close`
    Close,
    /// `edit`
    Edit,
    /// `sync`
    Sync,
}

impl EventKind {
    /// Wire tag for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Open => "open",
            EventKind::Close => "close",
            EventKind::Edit => "edit",
            EventKind::Sync => "sync",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const FILE_EVENT_KINDS: &[&str] = &["open", "close", "edit", "sync"];
const LOCAL_EVENT_KINDS: &[&str] = &["open", "close", "edit"];

/// Only the tag, used to tell an unknown kind apart from a malformed payload.
#[derive(Deserialize)]
struct KindProbe {
    kind: String,
}

impl FileEvent {
    /// Path and version carried by the event.
    pub fn file_version(&self) -> &FileVersion {
        match self {
            FileEvent::Open(e) => &e.file_version,
            FileEvent::Close(e) => &e.file_version,
            FileEvent::Edit(e) => &e.file_version,
            FileEvent::Sync(e) => &e.file_version,
        }
    }

    /// Path of the file the event applies to.
    pub fn file_path(&self) -> &str {
        &self.file_version().file_path
    }

    /// The event's `kind` tag.
    pub fn kind(&self) -> EventKind {
        match self {
            FileEvent::Open(_) => EventKind::Open,
            FileEvent::Close(_) => EventKind::Close,
            FileEvent::Edit(_) => EventKind::Edit,
            FileEvent::Sync(_) => EventKind::Sync,
        }
    }

    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EventError> {
        rmp_serde::to_vec_named(self).map_err(EventError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EventError> {
        decode_bytes(bytes, FILE_EVENT_KINDS)
    }

    /// Serialize to a single line of JSON.
    pub fn to_json(&self) -> Result<String, EventError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self, EventError> {
        decode_json(json, FILE_EVENT_KINDS)
    }
}

impl LocalFileEvent {
    /// Path and version carried by the event.
    pub fn file_version(&self) -> &FileVersion {
        match self {
            LocalFileEvent::Open(e) => &e.file_version,
            LocalFileEvent::Close(e) => &e.file_version,
            LocalFileEvent::Edit(e) => &e.file_version,
        }
    }

    /// Path of the file the event applies to.
    pub fn file_path(&self) -> &str {
        &self.file_version().file_path
    }

    /// The event's `kind` tag. Never [`EventKind::Sync`].
    pub fn kind(&self) -> EventKind {
        match self {
            LocalFileEvent::Open(_) => EventKind::Open,
            LocalFileEvent::Close(_) => EventKind::Close,
            LocalFileEvent::Edit(_) => EventKind::Edit,
        }
    }

    /// Build an `open` event.
    pub fn open(file_version: FileVersion, contents: impl Into<String>) -> Self {
        LocalFileEvent::Open(FileOpen {
            file_version,
            contents: contents.into(),
        })
    }

    /// Build a `close` event.
    pub fn close(file_version: FileVersion) -> Self {
        LocalFileEvent::Close(FileClose { file_version })
    }

    /// Build an `edit` event.
    pub fn edit(
        file_version: FileVersion,
        old_range: Range,
        old_text: impl Into<String>,
        new_range: Range,
        new_text: impl Into<String>,
    ) -> Self {
        LocalFileEvent::Edit(FileEdit {
            file_version,
            old_range,
            old_text: old_text.into(),
            new_range,
            new_text: new_text.into(),
        })
    }

    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EventError> {
        rmp_serde::to_vec_named(self).map_err(EventError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EventError> {
        decode_bytes(bytes, LOCAL_EVENT_KINDS)
    }

    /// Serialize to a single line of JSON.
    pub fn to_json(&self) -> Result<String, EventError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self, EventError> {
        decode_json(json, LOCAL_EVENT_KINDS)
    }
}

impl From<LocalFileEvent> for FileEvent {
    fn from(event: LocalFileEvent) -> Self {
        match event {
            LocalFileEvent::Open(e) => FileEvent::Open(e),
            LocalFileEvent::Close(e) => FileEvent::Close(e),
            LocalFileEvent::Edit(e) => FileEvent::Edit(e),
        }
    }
}

fn decode_bytes<T>(bytes: &[u8], known: &[&str]) -> Result<T, EventError>
where
    T: for<'de> Deserialize<'de>,
{
    rmp_serde::from_slice(bytes).map_err(|err| {
        match rmp_serde::from_slice::<KindProbe>(bytes) {
            Ok(probe) if !known.contains(&probe.kind.as_str()) => {
                EventError::UnknownKind(probe.kind)
            }
            _ => EventError::Deserialization(err),
        }
    })
}

fn decode_json<T>(json: &str, known: &[&str]) -> Result<T, EventError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_str(json).map_err(|err| match serde_json::from_str::<KindProbe>(json) {
        Ok(probe) if !known.contains(&probe.kind.as_str()) => EventError::UnknownKind(probe.kind),
        _ => EventError::Json(err),
    })
}
