//! Wait-until-version support.
//!
//! [`FileVersionNotifier`] sits on the canonical event stream and lets
//! consumers wait until a file reaches a version. It is updated
//! synchronously as each event is published, so ingestion never waits on
//! a consumer; waiters are completed through one-shot channels as a side
//! effect of the update.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use file_core::{FileStatus, VersionTable};
use file_types::{FileVersion, LocalFileEvent};
use tokio::sync::oneshot;

use crate::error::ReadError;

type WaitResult = Result<(), ReadError>;

struct Waiter {
    target: u64,
    tx: oneshot::Sender<WaitResult>,
}

/// Tracks the last known version of every file and wakes version waiters.
#[derive(Default)]
pub struct FileVersionNotifier {
    versions: VersionTable,
    waiters: HashMap<String, Vec<Waiter>>,
    disposed: bool,
}

impl std::fmt::Debug for FileVersionNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileVersionNotifier")
            .field("files", &self.versions.len())
            .field("pending_waiters", &self.pending_waiters())
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl FileVersionNotifier {
    /// Create a notifier that has seen no events.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a canonical event and complete every waiter it satisfies.
    ///
    /// `open` and `edit` complete waiters whose target is at or below the
    /// new version. `close` fails every waiter on the file with
    /// [`ReadError::FileClosed`], whatever its target.
    pub fn on_event(&mut self, event: &LocalFileEvent) {
        self.versions.record(event);
        self.prune_abandoned();

        let file_path = event.file_path();
        let Some(waiters) = self.waiters.remove(file_path) else {
            return;
        };

        match event {
            LocalFileEvent::Close(_) => {
                for waiter in waiters {
                    let _ = waiter.tx.send(Err(ReadError::FileClosed {
                        file_path: file_path.to_string(),
                    }));
                }
            }
            LocalFileEvent::Open(_) | LocalFileEvent::Edit(_) => {
                let version = event.file_version().version;
                let (ready, pending): (Vec<Waiter>, Vec<Waiter>) =
                    waiters.into_iter().partition(|w| w.target <= version);
                for waiter in ready {
                    let _ = waiter.tx.send(Ok(()));
                }
                let pending: Vec<Waiter> =
                    pending.into_iter().filter(|w| !w.tx.is_closed()).collect();
                if !pending.is_empty() {
                    self.waiters.insert(file_path.to_string(), pending);
                }
            }
        }
    }

    /// Wait until the file reaches or passes `file_version.version`.
    ///
    /// Completes immediately when the version was already seen, even if no
    /// one was waiting at the time. Dropping the returned future abandons
    /// the wait without affecting anyone else.
    pub fn wait_for_buffer_at_version(&mut self, file_version: FileVersion) -> VersionWait {
        if self.disposed {
            return VersionWait::ready(Err(ReadError::Disposed));
        }
        if self.versions.has_reached(&file_version) {
            return VersionWait::ready(Ok(()));
        }

        self.prune_abandoned();
        let (tx, rx) = oneshot::channel();
        self.waiters
            .entry(file_version.file_path)
            .or_default()
            .push(Waiter {
                target: file_version.version,
                tx,
            });
        VersionWait::pending(rx)
    }

    /// What is known about a file, if it is open.
    pub fn status(&self, file_path: &str) -> Option<FileStatus> {
        self.versions.status(file_path)
    }

    /// Number of waits still outstanding.
    pub fn pending_waiters(&self) -> usize {
        self.waiters
            .values()
            .flatten()
            .filter(|w| !w.tx.is_closed())
            .count()
    }

    /// Drop waiters whose future was dropped, and paths left with none.
    ///
    /// Runs on every event and every new wait, so abandoned waits on paths
    /// that never see another event are still reclaimed.
    fn prune_abandoned(&mut self) {
        self.waiters.retain(|_, waiters| {
            waiters.retain(|w| !w.tx.is_closed());
            !waiters.is_empty()
        });
    }

    /// Fail every outstanding wait with [`ReadError::Disposed`] and refuse new ones.
    pub fn dispose(&mut self) {
        self.disposed = true;
        for (_, waiters) in self.waiters.drain() {
            for waiter in waiters {
                let _ = waiter.tx.send(Err(ReadError::Disposed));
            }
        }
    }
}

/// Future returned by [`FileVersionNotifier::wait_for_buffer_at_version`].
#[derive(Debug)]
#[must_use = "a version wait does nothing unless awaited"]
pub struct VersionWait {
    state: WaitState,
}

#[derive(Debug)]
enum WaitState {
    Ready(Option<WaitResult>),
    Pending(oneshot::Receiver<WaitResult>),
}

impl VersionWait {
    fn ready(result: WaitResult) -> Self {
        Self {
            state: WaitState::Ready(Some(result)),
        }
    }

    fn pending(rx: oneshot::Receiver<WaitResult>) -> Self {
        Self {
            state: WaitState::Pending(rx),
        }
    }
}

impl Future for VersionWait {
    type Output = WaitResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            WaitState::Ready(result) => {
                Poll::Ready(result.take().unwrap_or(Err(ReadError::Disposed)))
            }
            // A dropped sender means the notifier itself is gone.
            WaitState::Pending(rx) => Pin::new(rx)
                .poll(cx)
                .map(|received| received.unwrap_or(Err(ReadError::Disposed))),
        }
    }
}
