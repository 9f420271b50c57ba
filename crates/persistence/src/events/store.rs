//! JSONL Event Store - append-only writer

use crate::error::PersistenceResult;
use chrono::Utc;
use paybank_core::Event;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Event Store - writes audit events to daily files: `data/events/2026-10-18.jsonl`
pub struct EventStore {
    base_path: PathBuf,
    event_counter: AtomicU64,
    current_writer: Mutex<Option<EventWriter>>,
}

struct EventWriter {
    date: String,
    writer: BufWriter<File>,
}

impl EventStore {
    /// Open the store, creating `base_path` if needed.
    pub fn new<P: AsRef<Path>>(base_path: P) -> PersistenceResult<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;

        let event_counter = Self::load_event_counter(&base_path);

        Ok(Self {
            base_path,
            event_counter: AtomicU64::new(event_counter),
            current_writer: Mutex::new(None),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Next free counter value, scanning existing files. Unreadable lines are skipped.
    fn load_event_counter(base_path: &Path) -> u64 {
        let mut max_id: u64 = 0;

        if let Ok(entries) = fs::read_dir(base_path) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().map_or(false, |ext| ext == "jsonl") {
                    if let Ok(content) = fs::read_to_string(&path) {
                        for line in content.lines() {
                            if let Ok(event) = serde_json::from_str::<Event>(line) {
                                // EVT_000123 -> 123
                                if let Some(num) = event
                                    .event_id
                                    .strip_prefix("EVT_")
                                    .and_then(|n| n.parse::<u64>().ok())
                                {
                                    max_id = max_id.max(num);
                                }
                            }
                        }
                    }
                }
            }
        }

        max_id + 1
    }

    fn file_path(&self, date: &str) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", date))
    }

    fn current_date() -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }

    pub fn next_event_id(&self) -> String {
        let id = self.event_counter.fetch_add(1, Ordering::SeqCst);
        format!("EVT_{:06}", id)
    }

    pub fn append(&self, event: &Event) -> PersistenceResult<()> {
        let date = Self::current_date();
        let json = serde_json::to_string(event)?;

        let mut guard = self.current_writer.lock();

        let needs_new_file = guard.as_ref().map_or(true, |w| w.date != date);
        if needs_new_file {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.file_path(&date))?;
            *guard = Some(EventWriter {
                date,
                writer: BufWriter::new(file),
            });
        }

        if let Some(ref mut w) = *guard {
            writeln!(w.writer, "{}", json)?;
            w.writer.flush()?;
        }

        Ok(())
    }

    /// All event files, oldest first.
    pub fn list_files(&self) -> PersistenceResult<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().map_or(false, |ext| ext == "jsonl") {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }

    pub fn flush(&self) -> PersistenceResult<()> {
        let mut guard = self.current_writer.lock();
        if let Some(ref mut w) = *guard {
            w.writer.flush()?;
        }
        Ok(())
    }

    pub fn reader(&self) -> super::EventReader {
        super::EventReader::new(&self.base_path)
    }
}

impl Drop for EventStore {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paybank_core::EventKind;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn opened(store: &EventStore) -> Event {
        let id = store.next_event_id();
        Event::new(&id, EventKind::AccountOpened, "alice", "ACC_1").with_amount(dec!(0), "RON")
    }

    #[test]
    fn test_event_store_append() {
        let dir = tempdir().unwrap();
        let store = EventStore::new(dir.path()).unwrap();

        store.append(&opened(&store)).unwrap();
        store.flush().unwrap();

        let files = store.list_files().unwrap();
        assert_eq!(files.len(), 1);

        let content = fs::read_to_string(&files[0]).unwrap();
        assert!(content.contains("EVT_000001"));
        assert!(content.contains("account_opened"));
    }

    #[test]
    fn test_event_store_counter() {
        let dir = tempdir().unwrap();
        let store = EventStore::new(dir.path()).unwrap();

        assert_eq!(store.next_event_id(), "EVT_000001");
        assert_eq!(store.next_event_id(), "EVT_000002");
    }

    #[test]
    fn test_event_store_reload_counter() {
        let dir = tempdir().unwrap();

        {
            let store = EventStore::new(dir.path()).unwrap();
            store.append(&opened(&store)).unwrap();
            store.append(&opened(&store)).unwrap();
        }

        let store = EventStore::new(dir.path()).unwrap();
        assert_eq!(store.next_event_id(), "EVT_000003");
    }

    #[test]
    fn test_counter_skips_garbage_lines() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("2026-01-01.jsonl"), "not json\n").unwrap();

        let store = EventStore::new(dir.path()).unwrap();
        assert_eq!(store.next_event_id(), "EVT_000001");
    }
}
