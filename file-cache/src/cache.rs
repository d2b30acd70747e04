//! The file cache.
//!
//! [`FileCache`] owns the replica table, the version notifier and the
//! event bus behind one lock. Applying an event, publishing its canonical
//! form, updating the notifier and waking waiters all happen while that
//! lock is held, so no reader can observe a file mid-transition. The lock
//! is never held across an await.
//!
//! Callers must still deliver events for one file in order: the cache
//! validates ordering, it does not restore it.

use std::sync::atomic::Ordering;
use std::sync::{Mutex, MutexGuard, PoisonError};

use file_core::{Applied, BufferReplica, FileStatus, ReplicaTable};
use file_types::{EventKind, FileEvent, FileVersion, LocalFileEvent};

use crate::bus::{EventBus, FileEventStream};
use crate::error::{CacheError, CacheResult, ReadError};
use crate::metrics::CacheMetrics;
use crate::notifier::FileVersionNotifier;

/// State guarded by the cache lock.
#[derive(Debug, Default)]
struct CacheState {
    replicas: ReplicaTable,
    notifier: FileVersionNotifier,
    bus: EventBus,
    disposed: bool,
}

impl CacheState {
    /// Hand a canonical event to the notifier, then to subscribers.
    fn publish(&mut self, event: LocalFileEvent) {
        self.notifier.on_event(&event);
        self.bus.publish(&event);
    }
}

/// Authoritative replicas of the files open in a remote editor.
#[derive(Debug, Default)]
pub struct FileCache {
    state: Mutex<CacheState>,
    metrics: CacheMetrics,
}

impl FileCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // Every transition completes before the guard drops, so the
        // state is consistent even if a holder panicked.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ingest one client event.
    ///
    /// On error nothing changes and nothing is published; the client should
    /// resend the affected file with a `sync` event. A `sync` older than
    /// the replica is dropped silently (counted in
    /// [`CacheMetrics::stale_syncs`]).
    pub fn on_event(&self, event: FileEvent) -> CacheResult<()> {
        let mut state = self.lock();
        if state.disposed {
            return Err(CacheError::Disposed);
        }

        let kind = event.kind();
        let file_version = event.file_version().clone();

        match state.replicas.apply(event) {
            Ok(Applied::Published(local)) => {
                tracing::debug!(
                    "Applied {} for {} (published {})",
                    kind,
                    file_version,
                    local.kind()
                );
                self.metrics.events_applied.fetch_add(1, Ordering::Relaxed);
                if kind == EventKind::Sync {
                    self.metrics.resyncs.fetch_add(1, Ordering::Relaxed);
                }
                self.metrics.record_published(&local);
                state.publish(local);
                Ok(())
            }
            Ok(Applied::StaleSync { current }) => {
                tracing::warn!(
                    "Dropping stale sync for {} (replica already at {})",
                    file_version,
                    current
                );
                self.metrics.events_applied.fetch_add(1, Ordering::Relaxed);
                self.metrics.stale_syncs.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Rejected {} for {}: {}", kind, file_version, e);
                self.metrics.events_rejected.fetch_add(1, Ordering::Relaxed);
                Err(e.into())
            }
        }
    }

    /// Decode a MessagePack-encoded client event and ingest it.
    pub fn on_encoded_event(&self, bytes: &[u8]) -> CacheResult<()> {
        let event = FileEvent::from_bytes(bytes).map_err(|e| {
            tracing::warn!("Undecodable file event ({} bytes): {}", bytes.len(), e);
            self.metrics.events_rejected.fetch_add(1, Ordering::Relaxed);
            e
        })?;
        self.on_event(event)
    }

    /// Current replica of an open file.
    pub fn get_buffer(&self, file_path: &str) -> Option<BufferReplica> {
        self.lock().replicas.get(file_path).cloned()
    }

    /// The replica at exactly `file_version`, waiting for it if necessary.
    ///
    /// Fails with [`ReadError::FileClosed`] if the file is closed when the
    /// wait ends, and with [`ReadError::VersionMismatch`] if the file is at
    /// any other version by then.
    pub async fn get_buffer_at_version(
        &self,
        file_version: FileVersion,
    ) -> Result<BufferReplica, ReadError> {
        let wait = {
            let mut state = self.lock();
            if state.disposed {
                return Err(ReadError::Disposed);
            }
            state
                .notifier
                .wait_for_buffer_at_version(file_version.clone())
        };
        wait.await?;

        let state = self.lock();
        match state.replicas.get(&file_version.file_path) {
            None => Err(ReadError::FileClosed {
                file_path: file_version.file_path,
            }),
            Some(replica) if replica.version() != file_version.version => {
                Err(ReadError::VersionMismatch {
                    file_path: file_version.file_path,
                    requested: file_version.version,
                    actual: replica.version(),
                })
            }
            Some(replica) => Ok(replica.clone()),
        }
    }

    /// Subscribe to canonical events.
    ///
    /// The stream starts with a synthetic `open` for every file open right
    /// now, at its current version and text, followed by every event
    /// published after this call. The snapshot and the subscription are
    /// taken under the same lock.
    pub fn observe_file_events(&self) -> FileEventStream {
        let mut state = self.lock();
        let replay = state.replicas.open_events();
        state.bus.subscribe(replay)
    }

    /// Close every file and shut the cache down.
    ///
    /// Subscribers receive a `close` for each open file and then their
    /// streams end. Outstanding version waits fail. Calling this again does
    /// nothing.
    pub fn dispose(&self) {
        let mut state = self.lock();
        if state.disposed {
            return;
        }
        state.disposed = true;

        let closes = state.replicas.close_all();
        let closed = closes.len();
        for close in closes {
            self.metrics.record_published(&close);
            state.publish(close);
        }
        state.notifier.dispose();
        state.bus.close();

        tracing::info!("File cache disposed ({} files closed)", closed);
    }

    /// Check if [`FileCache::dispose`] has run.
    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    /// Paths of all open files, sorted.
    pub fn open_files(&self) -> Vec<String> {
        self.lock().replicas.open_paths()
    }

    /// Last version seen for an open file.
    pub fn file_status(&self, file_path: &str) -> Option<FileStatus> {
        self.lock().notifier.status(file_path)
    }

    /// Number of registered event subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.lock().bus.subscriber_count()
    }

    /// Number of outstanding version waits.
    pub fn pending_waiters(&self) -> usize {
        self.lock().notifier.pending_waiters()
    }

    /// Activity counters.
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }
}

impl Drop for FileCache {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use file_types::{FileClose, FileEdit, FileOpen, FileSync, Range};
    use std::sync::Arc;
    use std::time::Duration;

    fn open(path: &str, contents: &str, version: u64) -> FileEvent {
        FileEvent::Open(FileOpen {
            file_version: FileVersion::new(path, version),
            contents: contents.into(),
        })
    }

    fn close(path: &str, version: u64) -> FileEvent {
        FileEvent::Close(FileClose {
            file_version: FileVersion::new(path, version),
        })
    }

    fn append(path: &str, version: u64, column: u32, text: &str) -> FileEvent {
        let at = Range::from_coords((0, column), (0, column));
        FileEvent::Edit(FileEdit {
            file_version: FileVersion::new(path, version),
            old_range: at,
            old_text: String::new(),
            new_range: Range::from_coords((0, column), (0, column + text.chars().count() as u32)),
            new_text: text.into(),
        })
    }

    fn sync(path: &str, contents: &str, version: u64) -> FileEvent {
        FileEvent::Sync(FileSync {
            file_version: FileVersion::new(path, version),
            contents: contents.into(),
        })
    }

    #[test]
    fn hello_becomes_hi() {
        let cache = FileCache::new();
        cache.on_event(open("/a", "hello", 0)).unwrap();
        cache
            .on_event(FileEvent::Edit(FileEdit {
                file_version: FileVersion::new("/a", 1),
                old_range: Range::from_coords((0, 0), (0, 5)),
                old_text: "hello".into(),
                new_range: Range::from_coords((0, 0), (0, 2)),
                new_text: "hi".into(),
            }))
            .unwrap();

        let replica = cache.get_buffer("/a").unwrap();
        assert_eq!(replica.text(), "hi");
        assert_eq!(replica.version(), 1);

        let err = cache
            .on_event(FileEvent::Edit(FileEdit {
                file_version: FileVersion::new("/a", 1),
                old_range: Range::from_coords((0, 0), (0, 2)),
                old_text: "hi".into(),
                new_range: Range::from_coords((0, 0), (0, 1)),
                new_text: "h".into(),
            }))
            .unwrap_err();
        assert!(matches!(
            err,
            CacheError::Consistency(file_core::ConsistencyError::VersionMismatch { .. })
        ));
        assert_eq!(cache.get_buffer("/a").unwrap().text(), "hi");
    }

    #[test]
    fn rejected_event_publishes_nothing() {
        let cache = FileCache::new();
        cache.on_event(open("/a", "", 0)).unwrap();
        let mut events = cache.observe_file_events();
        events.drain();

        assert!(cache.on_event(append("/a", 5, 0, "x")).is_err());
        assert!(cache.on_event(open("/a", "again", 0)).is_err());
        assert!(events.drain().is_empty());

        let metrics = cache.metrics().snapshot();
        assert_eq!(metrics.events_rejected, 2);
        assert_eq!(metrics.events_applied, 1);
    }

    #[test]
    fn stale_sync_is_silent_but_counted() {
        let cache = FileCache::new();
        cache.on_event(open("/a", "abc", 4)).unwrap();
        let mut events = cache.observe_file_events();
        events.drain();

        cache.on_event(sync("/a", "old", 3)).unwrap();

        assert!(events.drain().is_empty());
        assert_eq!(cache.get_buffer("/a").unwrap().text(), "abc");
        assert_eq!(cache.metrics().snapshot().stale_syncs, 1);
    }

    #[test]
    fn sync_on_unopened_file_publishes_open() {
        let cache = FileCache::new();
        let mut events = cache.observe_file_events();

        cache.on_event(sync("/a", "world", 5)).unwrap();

        assert_eq!(
            events.drain(),
            vec![LocalFileEvent::open(FileVersion::new("/a", 5), "world")]
        );
        let replica = cache.get_buffer("/a").unwrap();
        assert_eq!((replica.text(), replica.version()), ("world".to_string(), 5));
        assert_eq!(cache.metrics().snapshot().resyncs, 1);
    }

    #[test]
    fn file_status_follows_events() {
        let cache = FileCache::new();
        assert_eq!(cache.file_status("/a"), None);

        cache.on_event(open("/a", "", 2)).unwrap();
        cache.on_event(append("/a", 3, 0, "x")).unwrap();
        assert_eq!(cache.file_status("/a"), Some(FileStatus { version: 3 }));

        cache.on_event(close("/a", 3)).unwrap();
        assert_eq!(cache.file_status("/a"), None);
        assert!(cache.open_files().is_empty());
    }

    #[test]
    fn encoded_events_are_decoded_and_applied() {
        let cache = FileCache::new();
        let bytes = open("/bin", "data", 1).to_bytes().unwrap();
        cache.on_encoded_event(&bytes).unwrap();
        assert_eq!(cache.get_buffer("/bin").unwrap().text(), "data");

        let err = cache.on_encoded_event(&[0xc1]).unwrap_err();
        assert!(matches!(err, CacheError::Protocol(_)));
    }

    #[tokio::test]
    async fn buffer_at_current_version_resolves_immediately() {
        let cache = FileCache::new();
        cache.on_event(open("/a", "abc", 7)).unwrap();

        let replica = cache
            .get_buffer_at_version(FileVersion::new("/a", 7))
            .await
            .unwrap();
        assert_eq!(replica.text(), "abc");
    }

    #[tokio::test]
    async fn superseded_version_is_mismatch() {
        let cache = FileCache::new();
        cache.on_event(open("/a", "", 0)).unwrap();
        cache.on_event(append("/a", 1, 0, "x")).unwrap();

        let err = cache
            .get_buffer_at_version(FileVersion::new("/a", 0))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ReadError::VersionMismatch {
                file_path: "/a".into(),
                requested: 0,
                actual: 1,
            }
        );
    }

    #[tokio::test]
    async fn waiter_resolves_when_version_arrives() {
        let cache = Arc::new(FileCache::new());
        cache.on_event(open("/a", "", 0)).unwrap();

        let reader = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_buffer_at_version(FileVersion::new("/a", 2)).await })
        };

        while cache.pending_waiters() == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        cache.on_event(append("/a", 1, 0, "a")).unwrap();
        cache.on_event(append("/a", 2, 1, "b")).unwrap();

        let replica = reader.await.unwrap().unwrap();
        assert_eq!(replica.text(), "ab");
        assert_eq!(replica.version(), 2);
    }

    #[tokio::test]
    async fn dispose_closes_files_and_ends_streams() {
        let cache = FileCache::new();
        cache.on_event(open("/b", "", 1)).unwrap();
        cache.on_event(open("/a", "", 2)).unwrap();
        let mut events = cache.observe_file_events();

        cache.dispose();
        cache.dispose();

        let mut seen = Vec::new();
        while let Some(event) = events.recv().await {
            seen.push(event);
        }
        assert_eq!(
            seen,
            vec![
                LocalFileEvent::open(FileVersion::new("/a", 2), ""),
                LocalFileEvent::open(FileVersion::new("/b", 1), ""),
                LocalFileEvent::close(FileVersion::new("/a", 2)),
                LocalFileEvent::close(FileVersion::new("/b", 1)),
            ]
        );

        assert!(cache.is_disposed());
        assert!(cache.get_buffer("/a").is_none());
        assert!(matches!(
            cache.on_event(open("/c", "", 0)),
            Err(CacheError::Disposed)
        ));
        assert_eq!(
            cache.get_buffer_at_version(FileVersion::new("/a", 2)).await,
            Err(ReadError::Disposed)
        );
        assert_eq!(cache.observe_file_events().recv().await, None);
    }
}
