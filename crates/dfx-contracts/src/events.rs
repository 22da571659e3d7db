use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

pub type EventPayload = Map<String, Value>;

/// Keys every event carries; payload entries with these names are dropped.
pub const RESERVED_KEYS: [&str; 4] = ["type", "session_id", "seq", "ts"];

#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("failed to write event log {path}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("event log lock poisoned")]
    Poisoned,
}

/// Append-only JSON-lines log of one analysis session.
///
/// Each line is one compact object holding `type`, `session_id`, a
/// per-session `seq` and an RFC 3339 `ts`, followed by the payload.
/// Clones share the file handle and the sequence, so analyses running on
/// scoped threads log through the same writer and `seq` orders their lines.
#[derive(Debug, Clone)]
pub struct EventWriter {
    log: Arc<SessionLog>,
}

#[derive(Debug)]
struct SessionLog {
    path: PathBuf,
    session_id: String,
    next_seq: AtomicU64,
    file: Mutex<Option<File>>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            log: Arc::new(SessionLog {
                path: path.into(),
                session_id: session_id.into(),
                next_seq: AtomicU64::new(0),
                file: Mutex::new(None),
            }),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.log.session_id
    }

    /// Records an event whose payload is a JSON object built with `json!`.
    ///
    /// A non-object payload is kept under `detail`.
    pub fn record(&self, event_type: &str, payload: Value) -> Result<Value, EventLogError> {
        let payload = match payload {
            Value::Object(map) => map,
            Value::Null => EventPayload::new(),
            other => EventPayload::from_iter([("detail".to_string(), other)]),
        };
        self.emit(event_type, payload)
    }

    pub fn emit(&self, event_type: &str, payload: EventPayload) -> Result<Value, EventLogError> {
        let mut file = self.log.file.lock().map_err(|_| EventLogError::Poisoned)?;
        if file.is_none() {
            *file = Some(self.open()?);
        }

        // Sequence is taken under the file lock so line order matches `seq`.
        let seq = self.log.next_seq.fetch_add(1, Ordering::Relaxed);
        let mut event = EventPayload::new();
        event.insert("type".to_string(), Value::from(event_type));
        event.insert("session_id".to_string(), Value::from(self.session_id()));
        event.insert("seq".to_string(), Value::from(seq));
        event.insert("ts".to_string(), Value::from(now_utc_iso()));
        event.extend(
            payload
                .into_iter()
                .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str())),
        );

        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');
        if let Some(handle) = file.as_mut() {
            handle.write_all(&line).map_err(|source| self.io_error(source))?;
        }
        Ok(Value::Object(event))
    }

    fn open(&self) -> Result<File, EventLogError> {
        if let Some(parent) = self.log.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
            }
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log.path)
            .map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: io::Error) -> EventLogError {
        EventLogError::Io {
            path: self.log.path.display().to_string(),
            source,
        }
    }
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::thread;

    use chrono::DateTime;
    use serde_json::json;

    use super::*;

    fn read_events(path: &Path) -> Vec<Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn record_writes_one_line_per_event() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("events.jsonl");
        let writer = EventWriter::new(&path, "session-123");

        let emitted = writer
            .record("analysis_started", json!({"analysis": "object_description"}))
            .unwrap();
        writer.record("analysis_completed", Value::Null).unwrap();

        let events = read_events(&path);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], emitted);
        assert_eq!(events[0]["type"], json!("analysis_started"));
        assert_eq!(events[0]["session_id"], json!("session-123"));
        assert_eq!(events[0]["analysis"], json!("object_description"));
        assert_eq!(events[0]["seq"], json!(0));
        assert_eq!(events[1]["seq"], json!(1));
        DateTime::parse_from_rfc3339(events[0]["ts"].as_str().unwrap_or("")).unwrap();
    }

    #[test]
    fn payload_cannot_rewrite_envelope() {
        let temp = tempfile::tempdir().unwrap();
        let writer = EventWriter::new(temp.path().join("events.jsonl"), "session-123");

        let emitted = writer
            .record(
                "category_missing",
                json!({"type": "forged", "session_id": "other", "seq": 99, "category": "cost"}),
            )
            .unwrap();
        assert_eq!(emitted["type"], json!("category_missing"));
        assert_eq!(emitted["session_id"], json!("session-123"));
        assert_eq!(emitted["seq"], json!(0));
        assert_eq!(emitted["category"], json!("cost"));
    }

    #[test]
    fn scalar_payload_is_kept_as_detail() {
        let temp = tempfile::tempdir().unwrap();
        let writer = EventWriter::new(temp.path().join("events.jsonl"), "s");
        let emitted = writer.record("note", json!("staged")).unwrap();
        assert_eq!(emitted["detail"], json!("staged"));
    }

    #[test]
    fn clones_share_sequence_across_threads() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("nested").join("events.jsonl");
        let writer = EventWriter::new(&path, "session-123");

        thread::scope(|scope| {
            for idx in 0..4 {
                let writer = writer.clone();
                scope.spawn(move || writer.record("tick", json!({"idx": idx})).map(|_| ()));
            }
        });

        let seqs: Vec<u64> = read_events(&path)
            .iter()
            .map(|event| event["seq"].as_u64().unwrap())
            .collect();
        assert_eq!(seqs, vec![0, 1, 2, 3]);
    }
}
