//! # file-core
//!
//! Pure logic for open-files (no I/O, instant tests).
//!
//! This crate implements the replica state machine without any channels,
//! locks or async, so every transition can be tested directly.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects:
//! - [`ReplicaTable::apply`] validates one client event and either rejects it
//!   untouched or returns the canonical event to publish
//! - [`VersionTable`] records the last known version of every file
//!
//! Publishing events and waking waiters is done by file-cache, which drives
//! these types from behind its single lock.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod error;
pub mod replicas;
pub mod versions;

pub use buffer::BufferReplica;
pub use error::{ConsistencyError, RangeError};
pub use replicas::{Applied, ReplicaTable};
pub use versions::{FileStatus, VersionTable};
