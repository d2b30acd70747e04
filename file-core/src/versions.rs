//! Last-known-version bookkeeping.
//!
//! [`VersionTable`] follows the canonical event stream and remembers the
//! latest version of every open file. It records every event whether or
//! not anyone is waiting, so a waiter that shows up late is answered from
//! history. A closed file is forgotten, so the table only ever holds as
//! many entries as there are open files.

use std::collections::HashMap;

use file_types::{FileVersion, LocalFileEvent};

/// What is known about one open file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStatus {
    /// Latest version seen on the event stream.
    pub version: u64,
}

/// Latest version per open file, built from canonical events.
#[derive(Debug, Clone, Default)]
pub struct VersionTable {
    files: HashMap<String, FileStatus>,
}

impl VersionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one canonical event.
    ///
    /// `open` sets the version. `edit` sets the event's version: one past
    /// the previous for a client edit, or the resynced version for a
    /// whole-buffer replacement. `close` forgets the file.
    pub fn record(&mut self, event: &LocalFileEvent) {
        let file_version = event.file_version();
        match event {
            LocalFileEvent::Open(_) | LocalFileEvent::Edit(_) => {
                self.files.insert(
                    file_version.file_path.clone(),
                    FileStatus {
                        version: file_version.version,
                    },
                );
            }
            LocalFileEvent::Close(_) => {
                self.files.remove(&file_version.file_path);
            }
        }
    }

    /// What is known about a file, if it is open.
    pub fn status(&self, file_path: &str) -> Option<FileStatus> {
        self.files.get(file_path).copied()
    }

    /// True if the file has been seen at or past the requested version.
    pub fn has_reached(&self, file_version: &FileVersion) -> bool {
        self.status(&file_version.file_path)
            .is_some_and(|status| status.version >= file_version.version)
    }

    /// Number of open files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if no file is open.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use file_types::Range;

    fn edit(path: &str, version: u64) -> LocalFileEvent {
        LocalFileEvent::edit(
            FileVersion::new(path, version),
            Range::default(),
            "",
            Range::from_coords((0, 0), (0, 1)),
            "x",
        )
    }

    #[test]
    fn unknown_file_has_no_status() {
        let table = VersionTable::new();
        assert_eq!(table.status("/a"), None);
        assert!(!table.has_reached(&FileVersion::new("/a", 0)));
    }

    #[test]
    fn open_and_edits_advance_version() {
        let mut table = VersionTable::new();
        table.record(&LocalFileEvent::open(FileVersion::new("/a", 3), ""));
        table.record(&edit("/a", 4));
        table.record(&edit("/a", 5));

        assert_eq!(table.status("/a"), Some(FileStatus { version: 5 }));
        assert!(table.has_reached(&FileVersion::new("/a", 4)));
        assert!(table.has_reached(&FileVersion::new("/a", 5)));
        assert!(!table.has_reached(&FileVersion::new("/a", 6)));
    }

    #[test]
    fn close_forgets_file() {
        let mut table = VersionTable::new();
        table.record(&LocalFileEvent::open(FileVersion::new("/a", 1), ""));
        table.record(&LocalFileEvent::close(FileVersion::new("/a", 1)));

        assert_eq!(table.status("/a"), None);
        assert!(!table.has_reached(&FileVersion::new("/a", 1)));
        assert!(table.is_empty());
    }

    #[test]
    fn open_close_cycles_do_not_accumulate() {
        let mut table = VersionTable::new();
        table.record(&LocalFileEvent::open(FileVersion::new("/kept", 0), ""));
        for i in 0..1000 {
            let fv = FileVersion::new(format!("/tmp/{i}"), 0);
            table.record(&LocalFileEvent::open(fv.clone(), ""));
            table.record(&LocalFileEvent::close(fv));
        }
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn reopen_resets_version() {
        let mut table = VersionTable::new();
        table.record(&LocalFileEvent::open(FileVersion::new("/a", 9), ""));
        table.record(&LocalFileEvent::close(FileVersion::new("/a", 9)));
        table.record(&LocalFileEvent::open(FileVersion::new("/a", 0), ""));

        assert_eq!(table.status("/a").map(|s| s.version), Some(0));
    }

    #[test]
    fn resync_edit_can_jump_versions() {
        let mut table = VersionTable::new();
        table.record(&LocalFileEvent::open(FileVersion::new("/a", 1), ""));
        table.record(&edit("/a", 40));
        assert_eq!(table.status("/a").map(|s| s.version), Some(40));
    }
}
