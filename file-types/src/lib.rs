//! # file-types
//!
//! Wire format types for the open-files synchronization protocol.
//!
//! An editing client streams versioned mutation events for the files it has
//! open; the server keeps authoritative replicas of those files. This crate
//! provides the types shared by every layer:
//! - [`FileVersion`] - a `(path, version)` pair naming one state of a file
//! - [`Point`], [`Range`] - half-open row/column spans inside a buffer
//! - [`FileEvent`] - events received from the client (includes `sync`)
//! - [`LocalFileEvent`] - canonical events republished by the server
//! - [`EventError`] - codec errors

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod events;
mod range;
mod version;

pub use error::EventError;
pub use events::{
    EventKind, FileClose, FileEdit, FileEvent, FileOpen, FileSync, LocalFileEvent,
};
pub use range::{Point, Range};
pub use version::FileVersion;
