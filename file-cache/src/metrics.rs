//! Operational counters.

use std::sync::atomic::{AtomicU64, Ordering};

use file_types::LocalFileEvent;

/// Counters for cache activity.
///
/// All counters are monotonically increasing for the life of the cache.
/// Thread-safe via `AtomicU64`, readable without taking the cache lock.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    /// Client events accepted (including stale syncs).
    pub events_applied: AtomicU64,
    /// Client events rejected by validation or decoding.
    pub events_rejected: AtomicU64,
    /// `sync` events dropped because the replica was already newer.
    pub stale_syncs: AtomicU64,
    /// `sync` events that replaced or created a replica.
    pub resyncs: AtomicU64,
    /// Canonical `open` events published.
    pub opens: AtomicU64,
    /// Canonical `edit` events published.
    pub edits: AtomicU64,
    /// Canonical `close` events published (including on dispose).
    pub closes: AtomicU64,
}

/// Point-in-time copy of [`CacheMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// See [`CacheMetrics::events_applied`].
    pub events_applied: u64,
    /// See [`CacheMetrics::events_rejected`].
    pub events_rejected: u64,
    /// See [`CacheMetrics::stale_syncs`].
    pub stale_syncs: u64,
    /// See [`CacheMetrics::resyncs`].
    pub resyncs: u64,
    /// See [`CacheMetrics::opens`].
    pub opens: u64,
    /// See [`CacheMetrics::edits`].
    pub edits: u64,
    /// See [`CacheMetrics::closes`].
    pub closes: u64,
}

impl CacheMetrics {
    /// Count a published canonical event.
    pub(crate) fn record_published(&self, event: &LocalFileEvent) {
        let counter = match event {
            LocalFileEvent::Open(_) => &self.opens,
            LocalFileEvent::Edit(_) => &self.edits,
            LocalFileEvent::Close(_) => &self.closes,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_applied: self.events_applied.load(Ordering::Relaxed),
            events_rejected: self.events_rejected.load(Ordering::Relaxed),
            stale_syncs: self.stale_syncs.load(Ordering::Relaxed),
            resyncs: self.resyncs.load(Ordering::Relaxed),
            opens: self.opens.load(Ordering::Relaxed),
            edits: self.edits.load(Ordering::Relaxed),
            closes: self.closes.load(Ordering::Relaxed),
        }
    }
}
