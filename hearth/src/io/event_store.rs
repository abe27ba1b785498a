//! Event log persistence.
//!
//! The log is the single source of truth; every state the engine exposes is a
//! replay of it. [`FileEventStore`] serializes all access across processes by
//! holding an exclusive advisory lock on the log file for the whole
//! read-modify-write cycle, and always rewrites the full array.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use fs2::FileExt;
use tracing::{debug, instrument};

use crate::core::events::Event;
use crate::core::merge::merge_events;
use crate::error::StoreError;

/// Storage backend for the event log.
pub trait EventStore: Send + Sync {
    /// Append one event at the end of the log.
    fn add(&self, event: &Event) -> Result<(), StoreError>;

    /// All events in log order.
    fn get_all(&self) -> Result<Vec<Event>, StoreError>;

    /// Replace the whole log.
    fn set_all(&self, events: &[Event]) -> Result<(), StoreError>;
}

impl<T: EventStore + ?Sized> EventStore for Arc<T> {
    fn add(&self, event: &Event) -> Result<(), StoreError> {
        (**self).add(event)
    }

    fn get_all(&self) -> Result<Vec<Event>, StoreError> {
        (**self).get_all()
    }

    fn set_all(&self, events: &[Event]) -> Result<(), StoreError> {
        (**self).set_all(events)
    }
}

/// In-memory store for tests and throwaway engines.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    events: Mutex<Vec<Event>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for MemoryEventStore {
    fn add(&self, event: &Event) -> Result<(), StoreError> {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        events.push(event.clone());
        Ok(())
    }

    fn get_all(&self) -> Result<Vec<Event>, StoreError> {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(events.clone())
    }

    fn set_all(&self, events: &[Event]) -> Result<(), StoreError> {
        let mut stored = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        *stored = events.to_vec();
        Ok(())
    }
}

/// Event log stored as a pretty-printed JSON array in a single file.
#[derive(Debug, Clone)]
pub struct FileEventStore {
    path: PathBuf,
}

impl FileEventStore {
    /// The file and its directory are created lazily on first access.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Merge-on-write: union the on-disk log with `local`, keyed by
    /// `(kind, timestamp)`. On-disk order wins; unseen local events follow in
    /// local order. Returns the merged log as written.
    #[instrument(skip_all, fields(path = %self.path.display(), local = local.len()))]
    pub fn save_merged(&self, local: &[Event]) -> Result<Vec<Event>, StoreError> {
        let mut log = self.lock()?;
        let existing = log.read()?;
        let merged = merge_events(&existing, local);
        debug!(
            existing = existing.len(),
            merged = merged.len(),
            "merged event log"
        );
        log.write(&merged)?;
        Ok(merged)
    }

    /// The log file's text as last written, read under the lock so a
    /// concurrent rewrite is never seen half done.
    pub fn read_raw(&self) -> Result<String, StoreError> {
        self.lock()?.read_raw()
    }

    fn lock(&self) -> Result<LockedLog<'_>, StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| StoreError::io(parent, source))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|source| StoreError::io(&self.path, source))?;
        FileExt::lock_exclusive(&file).map_err(|source| StoreError::Lock {
            path: self.path.clone(),
            source,
        })?;
        Ok(LockedLog {
            file,
            path: &self.path,
        })
    }
}

impl EventStore for FileEventStore {
    fn add(&self, event: &Event) -> Result<(), StoreError> {
        let mut log = self.lock()?;
        let mut events = log.read()?;
        events.push(event.clone());
        log.write(&events)
    }

    fn get_all(&self) -> Result<Vec<Event>, StoreError> {
        self.lock()?.read()
    }

    fn set_all(&self, events: &[Event]) -> Result<(), StoreError> {
        self.lock()?.write(events)
    }
}

/// An open log file holding the exclusive lock until dropped.
struct LockedLog<'a> {
    file: File,
    path: &'a Path,
}

impl LockedLog<'_> {
    fn read_raw(&mut self) -> Result<String, StoreError> {
        let mut contents = String::new();
        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.read_to_string(&mut contents))
            .map_err(|source| StoreError::io(self.path, source))?;
        Ok(contents)
    }

    fn read(&mut self) -> Result<Vec<Event>, StoreError> {
        let contents = self.read_raw()?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
            path: self.path.to_path_buf(),
            source,
        })
    }

    fn write(&mut self, events: &[Event]) -> Result<(), StoreError> {
        let mut buf = serde_json::to_vec_pretty(events)
            .map_err(|err| StoreError::io(self.path, std::io::Error::other(err)))?;
        buf.push(b'\n');
        self.file
            .set_len(0)
            .and_then(|()| self.file.seek(SeekFrom::Start(0)))
            .and_then(|_| self.file.write_all(&buf))
            .and_then(|()| self.file.flush())
            .map_err(|source| StoreError::io(self.path, source))?;
        debug!(events = events.len(), path = %self.path.display(), "wrote event log");
        Ok(())
    }
}

impl Drop for LockedLog<'_> {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            debug!(err = %err, path = %self.path.display(), "unlock event log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::EventPayload;
    use crate::test_support::{EventLog, created, created_under};
    use std::thread;

    fn sample() -> EventLog {
        let mut log = EventLog::new();
        log.push(created("R", "root"));
        log.push(created_under("C", "child", "R"));
        log.push(EventPayload::task_completed("C"));
        log
    }

    #[test]
    fn missing_file_and_directory_read_as_empty_log() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = FileEventStore::new(temp.path().join("nested/.hearth/events.json"));

        assert!(store.get_all().expect("get_all").is_empty());
        assert!(store.path().exists());
    }

    #[test]
    fn empty_file_reads_as_empty_log() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("events.json");
        fs::write(&path, "\n").expect("write");

        let store = FileEventStore::new(&path);
        assert!(store.get_all().expect("get_all").is_empty());
    }

    #[test]
    fn add_then_get_all_preserves_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = FileEventStore::new(temp.path().join("events.json"));
        let log = sample();

        for event in log.events() {
            store.add(event).expect("add");
        }
        assert_eq!(store.get_all().expect("get_all"), log.events());
    }

    #[test]
    fn set_all_replaces_and_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = FileEventStore::new(temp.path().join("events.json"));
        let log = sample();
        store.add(&log.events()[0]).expect("add");

        store.set_all(log.events()).expect("set_all");
        let loaded = store.get_all().expect("get_all");
        assert_eq!(loaded, log.events());

        store.set_all(&loaded).expect("set_all again");
        assert_eq!(store.get_all().expect("get_all"), loaded);

        let raw = fs::read_to_string(store.path()).expect("read");
        assert!(raw.starts_with('['));
        assert!(raw.ends_with("]\n"));
        assert!(raw.contains("\"type\": \"task_created\""));
    }

    #[test]
    fn shorter_rewrite_truncates_previous_contents() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = FileEventStore::new(temp.path().join("events.json"));
        let log = sample();
        store.set_all(log.events()).expect("set_all");

        store.set_all(&log.events()[..1]).expect("shrink");
        assert_eq!(store.get_all().expect("get_all"), &log.events()[..1]);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("events.json");
        fs::write(&path, "[{\"type\": \"nope\"}]").expect("write");

        let err = FileEventStore::new(&path).get_all().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn save_merged_keeps_disk_events_and_appends_unseen_local() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = FileEventStore::new(temp.path().join("events.json"));
        let log = sample();
        store.set_all(&log.events()[..2]).expect("set_all");

        let local = vec![log.events()[0].clone(), log.events()[2].clone()];
        let merged = store.save_merged(&local).expect("merge");
        assert_eq!(merged, log.events());

        let again = store.save_merged(&merged).expect("merge again");
        assert_eq!(again, log.events());
        assert_eq!(store.get_all().expect("get_all"), log.events());
    }

    #[test]
    fn concurrent_writers_do_not_lose_events() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("events.json");
        let writers = 4;
        let per_writer = 10;

        let handles: Vec<_> = (0..writers)
            .map(|writer| {
                let store = FileEventStore::new(&path);
                thread::spawn(move || {
                    for n in 0..per_writer {
                        let event = Event::new(
                            EventPayload::task_created(format!("W{writer}-{n}"), "t"),
                            chrono::DateTime::from_timestamp(writer * 1000 + n, 0)
                                .expect("timestamp"),
                        );
                        store.add(&event).expect("add");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("join");
        }

        let events = FileEventStore::new(&path).get_all().expect("get_all");
        assert_eq!(events.len(), (writers * per_writer) as usize);
    }

    #[test]
    fn memory_store_implements_contract() {
        let store = Arc::new(MemoryEventStore::new());
        let log = sample();
        store.add(&log.events()[0]).expect("add");
        assert_eq!(store.get_all().expect("get_all").len(), 1);

        store.set_all(log.events()).expect("set_all");
        assert_eq!(store.get_all().expect("get_all"), log.events());
    }
}
