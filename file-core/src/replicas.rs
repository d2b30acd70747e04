//! The replica table state machine.
//!
//! [`ReplicaTable`] owns every open replica and turns each client
//! [`FileEvent`] into either a rejection or exactly one canonical
//! [`LocalFileEvent`]. It performs no I/O and no locking. The caller
//! serializes calls and publishes the returned event.
//!
//! Validation happens before any mutation, so a rejected event leaves the
//! table exactly as it was.

use std::collections::HashMap;

use file_types::{FileEdit, FileEvent, FileSync, FileVersion, LocalFileEvent};

use crate::buffer::BufferReplica;
use crate::error::ConsistencyError;

/// Result of applying an accepted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// The table changed; publish this canonical event.
    Published(LocalFileEvent),
    /// A `sync` older than the replica arrived and was dropped.
    StaleSync {
        /// Version of the replica that superseded the sync.
        current: u64,
    },
}

/// Every open replica, keyed by file path.
#[derive(Debug, Default)]
pub struct ReplicaTable {
    replicas: HashMap<String, BufferReplica>,
}

impl ReplicaTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and apply one client event.
    ///
    /// - `open` creates a replica; fails if one exists.
    /// - `close` removes the replica and reports its current version.
    /// - `edit` requires version = current + 1 and matching `old_text`.
    /// - `sync` opens, or replaces the whole buffer, or is dropped as stale
    ///   when older than the replica. It never fails.
    pub fn apply(&mut self, event: FileEvent) -> Result<Applied, ConsistencyError> {
        match event {
            FileEvent::Open(open) => self
                .open(open.file_version, open.contents)
                .map(Applied::Published),
            FileEvent::Close(close) => self
                .close(&close.file_version.file_path)
                .map(Applied::Published),
            FileEvent::Edit(edit) => self.edit(edit).map(Applied::Published),
            FileEvent::Sync(sync) => Ok(self.sync(sync)),
        }
    }

    /// Get the replica for a path.
    pub fn get(&self, file_path: &str) -> Option<&BufferReplica> {
        self.replicas.get(file_path)
    }

    /// Check if a path has a replica.
    pub fn contains(&self, file_path: &str) -> bool {
        self.replicas.contains_key(file_path)
    }

    /// Number of open replicas.
    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    /// Check if no file is open.
    pub fn is_empty(&self) -> bool {
        self.replicas.is_empty()
    }

    /// Paths of all open files, sorted.
    pub fn open_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.replicas.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// A synthetic `open` for every replica at its current version and text.
    ///
    /// Replaying these rebuilds the table from scratch. Sorted by path.
    pub fn open_events(&self) -> Vec<LocalFileEvent> {
        let mut entries: Vec<(&String, &BufferReplica)> = self.replicas.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
            .into_iter()
            .map(|(path, replica)| {
                LocalFileEvent::open(FileVersion::new(path.clone(), replica.version()), replica.text())
            })
            .collect()
    }

    /// Remove every replica, returning a `close` for each. Sorted by path.
    pub fn close_all(&mut self) -> Vec<LocalFileEvent> {
        let mut closed: Vec<(String, BufferReplica)> = self.replicas.drain().collect();
        closed.sort_by(|a, b| a.0.cmp(&b.0));
        closed
            .into_iter()
            .map(|(path, replica)| LocalFileEvent::close(FileVersion::new(path, replica.version())))
            .collect()
    }

    fn open(
        &mut self,
        file_version: FileVersion,
        contents: String,
    ) -> Result<LocalFileEvent, ConsistencyError> {
        if self.replicas.contains_key(&file_version.file_path) {
            return Err(ConsistencyError::AlreadyOpen {
                file_path: file_version.file_path,
            });
        }
        Ok(self.insert_open(file_version, contents))
    }

    fn insert_open(&mut self, file_version: FileVersion, contents: String) -> LocalFileEvent {
        let replica = BufferReplica::new(&contents, file_version.version);
        self.replicas.insert(file_version.file_path.clone(), replica);
        LocalFileEvent::open(file_version, contents)
    }

    fn close(&mut self, file_path: &str) -> Result<LocalFileEvent, ConsistencyError> {
        let replica = self
            .replicas
            .remove(file_path)
            .ok_or_else(|| ConsistencyError::NotOpen {
                file_path: file_path.to_string(),
            })?;
        // The client's version is not trusted here; report what we hold.
        Ok(LocalFileEvent::close(FileVersion::new(file_path, replica.version())))
    }

    fn edit(&mut self, edit: FileEdit) -> Result<LocalFileEvent, ConsistencyError> {
        let file_path = &edit.file_version.file_path;
        let replica = self
            .replicas
            .get(file_path)
            .ok_or_else(|| ConsistencyError::NotOpen {
                file_path: file_path.clone(),
            })?;

        let current = replica.version();
        let incoming = edit.file_version.version;
        if current.checked_add(1) != Some(incoming) {
            return Err(ConsistencyError::VersionMismatch {
                file_path: file_path.clone(),
                expected: current.saturating_add(1),
                actual: incoming,
            });
        }

        let actual = replica
            .text_in_range(&edit.old_range)
            .map_err(|source| ConsistencyError::InvalidRange {
                file_path: file_path.clone(),
                source,
            })?;
        if actual != edit.old_text {
            return Err(ConsistencyError::TextMismatch {
                file_path: file_path.clone(),
                range: edit.old_range,
                expected: edit.old_text,
                actual,
            });
        }

        let updated = replica
            .with_edit(&edit.old_range, &edit.new_text, incoming)
            .map_err(|source| ConsistencyError::InvalidRange {
                file_path: file_path.clone(),
                source,
            })?;
        self.replicas.insert(file_path.clone(), updated);

        Ok(LocalFileEvent::Edit(edit))
    }

    fn sync(&mut self, sync: FileSync) -> Applied {
        let FileSync {
            file_version,
            contents,
        } = sync;

        if !self.replicas.contains_key(&file_version.file_path) {
            return Applied::Published(self.insert_open(file_version, contents));
        }
        let replica = &self.replicas[&file_version.file_path];

        // Messages can arrive out of order; a later update already won.
        if file_version.version < replica.version() {
            return Applied::StaleSync {
                current: replica.version(),
            };
        }

        let old_range = replica.range();
        let old_text = replica.text();
        let updated = BufferReplica::new(&contents, file_version.version);
        let new_range = updated.range();
        self.replicas.insert(file_version.file_path.clone(), updated);

        Applied::Published(LocalFileEvent::edit(
            file_version,
            old_range,
            old_text,
            new_range,
            contents,
        ))
    }
}
