//! Event Reader - reads the audit log back for inspection

use crate::error::PersistenceResult;
use paybank_core::{Event, EventKind};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

pub struct EventReader {
    base_path: PathBuf,
}

impl EventReader {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn read_file(&self, file_path: &Path) -> PersistenceResult<Vec<Event>> {
        let reader = BufReader::new(File::open(file_path)?);
        let mut events = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str(&line)?);
        }

        Ok(events)
    }

    /// Events for one day (`YYYY-MM-DD`); empty if no file exists.
    pub fn read_date(&self, date: &str) -> PersistenceResult<Vec<Event>> {
        let path = self.base_path.join(format!("{}.jsonl", date));
        if path.exists() {
            self.read_file(&path)
        } else {
            Ok(Vec::new())
        }
    }

    pub fn read_all(&self) -> PersistenceResult<Vec<Event>> {
        let mut all = Vec::new();
        if !self.base_path.exists() {
            return Ok(all);
        }

        let mut files: Vec<PathBuf> = fs::read_dir(&self.base_path)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().map_or(false, |ext| ext == "jsonl"))
            .collect();
        files.sort();

        for file in files {
            all.extend(self.read_file(&file)?);
        }
        Ok(all)
    }

    pub fn read_filtered(&self, filter: &EventFilter) -> PersistenceResult<Vec<Event>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|e| filter.matches(e))
            .collect())
    }
}

/// Builder-style filter over audit events
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub actor_id: Option<String>,
    pub subject_id: Option<String>,
    pub kinds: Option<Vec<EventKind>>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actor(mut self, actor_id: &str) -> Self {
        self.actor_id = Some(actor_id.to_string());
        self
    }

    pub fn subject(mut self, subject_id: &str) -> Self {
        self.subject_id = Some(subject_id.to_string());
        self
    }

    pub fn kinds(mut self, kinds: Vec<EventKind>) -> Self {
        self.kinds = Some(kinds);
        self
    }

    pub fn matches(&self, event: &Event) -> bool {
        if let Some(ref actor) = self.actor_id {
            if &event.actor_id != actor {
                return false;
            }
        }
        if let Some(ref subject) = self.subject_id {
            if &event.subject_id != subject {
                return false;
            }
        }
        if let Some(ref kinds) = self.kinds {
            if !kinds.contains(&event.kind) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventStore;
    use tempfile::tempdir;

    #[test]
    fn test_read_back_with_filter() {
        let dir = tempdir().unwrap();
        let store = EventStore::new(dir.path()).unwrap();

        let id = store.next_event_id();
        store
            .append(&Event::new(&id, EventKind::PartyCreated, "alice", "PTY_1"))
            .unwrap();
        let id = store.next_event_id();
        store
            .append(&Event::new(&id, EventKind::PartyCancelled, "alice", "PTY_1"))
            .unwrap();
        let id = store.next_event_id();
        store
            .append(&Event::new(&id, EventKind::AccountOpened, "bob", "ACC_9"))
            .unwrap();

        let reader = store.reader();
        assert_eq!(reader.read_all().unwrap().len(), 3);

        let alice = reader
            .read_filtered(&EventFilter::new().actor("alice"))
            .unwrap();
        assert_eq!(alice.len(), 2);

        let cancelled = reader
            .read_filtered(&EventFilter::new().kinds(vec![EventKind::PartyCancelled]))
            .unwrap();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].subject_id, "PTY_1");
    }

    #[test]
    fn test_missing_date_is_empty() {
        let dir = tempdir().unwrap();
        let reader = EventReader::new(dir.path());
        assert!(reader.read_date("1999-01-01").unwrap().is_empty());
    }
}
