//! Persistence boundary.
//!
//! Durable storage is an external collaborator. The core calls a sink as a
//! fire-and-forget side effect after a turn completes; a failing sink is
//! logged and must never corrupt in-memory runtime state.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::error::PersistenceError;
use warden_types::{AuditEvent, MemoryItem, SessionId};

/// One memory item as persisted: category plus the five feature groups,
/// stamped and keyed by session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryWriteRecord {
    pub category: String,
    #[serde(flatten)]
    pub item: MemoryItem,
    pub created_at: DateTime<Utc>,
    pub session_id: SessionId,
}

/// Session lifecycle transitions worth recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionLifecycle {
    Started,
    Ended,
}

/// Outbound persistence capability.
pub trait PersistenceSink: Send + Sync {
    fn record_audit_event(
        &self,
        session_id: SessionId,
        event: &AuditEvent,
    ) -> Result<(), PersistenceError>;

    fn record_memory_write(&self, write: &MemoryWriteRecord) -> Result<(), PersistenceError>;

    fn record_session(
        &self,
        session_id: SessionId,
        lifecycle: SessionLifecycle,
    ) -> Result<(), PersistenceError>;
}

/// In-memory sink for tests and the REPL.
#[derive(Debug, Default)]
pub struct InMemorySink {
    audit: Mutex<Vec<(SessionId, AuditEvent)>>,
    writes: Mutex<Vec<MemoryWriteRecord>>,
    sessions: Mutex<Vec<(SessionId, SessionLifecycle)>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn audit_events(&self) -> Vec<(SessionId, AuditEvent)> {
        self.audit.lock().clone()
    }

    pub fn memory_writes(&self) -> Vec<MemoryWriteRecord> {
        self.writes.lock().clone()
    }

    pub fn sessions(&self) -> Vec<(SessionId, SessionLifecycle)> {
        self.sessions.lock().clone()
    }
}

impl PersistenceSink for InMemorySink {
    fn record_audit_event(
        &self,
        session_id: SessionId,
        event: &AuditEvent,
    ) -> Result<(), PersistenceError> {
        self.audit.lock().push((session_id, event.clone()));
        Ok(())
    }

    fn record_memory_write(&self, write: &MemoryWriteRecord) -> Result<(), PersistenceError> {
        self.writes.lock().push(write.clone());
        Ok(())
    }

    fn record_session(
        &self,
        session_id: SessionId,
        lifecycle: SessionLifecycle,
    ) -> Result<(), PersistenceError> {
        self.sessions.lock().push((session_id, lifecycle));
        Ok(())
    }
}

/// Append-only JSON-lines sink; one tagged line per record.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn append(&self, line: &serde_json::Value) -> Result<(), PersistenceError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut serialized = serde_json::to_string(line)?;
        serialized.push('\n');
        file.write_all(serialized.as_bytes())?;
        Ok(())
    }
}

impl PersistenceSink for JsonlSink {
    fn record_audit_event(
        &self,
        session_id: SessionId,
        event: &AuditEvent,
    ) -> Result<(), PersistenceError> {
        self.append(&serde_json::json!({
            "record_type": "audit_event",
            "session_id": session_id,
            "event": event,
        }))
    }

    fn record_memory_write(&self, write: &MemoryWriteRecord) -> Result<(), PersistenceError> {
        self.append(&serde_json::json!({
            "record_type": "memory_write",
            "write": write,
        }))
    }

    fn record_session(
        &self,
        session_id: SessionId,
        lifecycle: SessionLifecycle,
    ) -> Result<(), PersistenceError> {
        self.append(&serde_json::json!({
            "record_type": "session",
            "session_id": session_id,
            "lifecycle": lifecycle,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_types::Fields;

    fn event() -> AuditEvent {
        AuditEvent {
            event_type: "void_command".to_string(),
            details: Fields::new(),
            at: Utc::now(),
        }
    }

    #[test]
    fn in_memory_sink_collects_everything() {
        let sink = InMemorySink::new();
        let sid = SessionId::new();
        sink.record_session(sid, SessionLifecycle::Started).unwrap();
        sink.record_audit_event(sid, &event()).unwrap();
        sink.record_memory_write(&MemoryWriteRecord {
            category: "working".to_string(),
            item: MemoryItem {
                geo: Fields::new(),
                inte: Fields::new(),
                gauge: Fields::new(),
                ptr: Fields::new(),
                obs: Fields::new(),
            },
            created_at: Utc::now(),
            session_id: sid,
        })
        .unwrap();

        assert_eq!(sink.sessions().len(), 1);
        assert_eq!(sink.audit_events().len(), 1);
        assert_eq!(sink.memory_writes().len(), 1);
    }

    #[test]
    fn jsonl_sink_appends_tagged_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warden.jsonl");
        let sink = JsonlSink::new(&path);
        let sid = SessionId::new();

        sink.record_session(sid, SessionLifecycle::Started).unwrap();
        sink.record_audit_event(sid, &event()).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = raw
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["record_type"], "session");
        assert_eq!(lines[1]["record_type"], "audit_event");
        assert_eq!(lines[1]["event"]["event_type"], "void_command");
    }

    #[test]
    fn memory_write_record_flattens_feature_groups() {
        let record = MemoryWriteRecord {
            category: "classical".to_string(),
            item: MemoryItem {
                geo: Fields::new(),
                inte: Fields::new(),
                gauge: Fields::new(),
                ptr: Fields::new(),
                obs: Fields::new(),
            },
            created_at: Utc::now(),
            session_id: SessionId::new(),
        };
        let v = serde_json::to_value(&record).unwrap();
        assert_eq!(v["category"], "classical");
        assert!(v.get("geo").is_some());
        assert!(v.get("obs").is_some());
        assert!(v.get("item").is_none());
    }
}
