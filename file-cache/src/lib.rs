//! # file-cache
//!
//! Server-side cache of the files a remote editor has open.
//!
//! [`FileCache`] keeps one authoritative replica per open file, validates
//! every incoming event against it, and republishes canonical events to
//! any number of subscribers. Consumers that need a specific state of a
//! file call [`FileCache::get_buffer_at_version`] and are woken once that
//! version has been applied.
//!
//! ## Architecture
//!
//! ```text
//! client events ──► FileCache::on_event
//!                        │  (single lock: validate → apply → publish)
//!                        ├──► FileVersionNotifier ──► pending version waits
//!                        └──► EventBus ──► observe_file_events() streams
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use openfiles_cache::FileCache;
//! use file_types::{FileEvent, FileOpen, FileVersion};
//!
//! let cache = FileCache::new();
//! cache.on_event(FileEvent::Open(FileOpen {
//!     file_version: FileVersion::new("/src/main.rs", 0),
//!     contents: "fn main() {}".into(),
//! }))?;
//!
//! let replica = cache.get_buffer_at_version(FileVersion::new("/src/main.rs", 0)).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bus;
pub mod cache;
pub mod error;
pub mod metrics;
pub mod notifier;

pub use bus::{EventBus, FileEventStream};
pub use cache::FileCache;
pub use error::{CacheError, ReadError};
pub use metrics::{CacheMetrics, MetricsSnapshot};
pub use notifier::{FileVersionNotifier, VersionWait};

pub use file_core::{BufferReplica, ConsistencyError, FileStatus};
