use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// One state-machine transition or credential change, as recorded in `events.jsonl`.
///
/// Image payloads never appear here; only their MIME type and size.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionStarted {
        provider: String,
        model: String,
    },
    CredentialStatus {
        status: String,
        source: String,
    },
    ImageSelected {
        mime_type: String,
        bytes: usize,
        view: String,
    },
    ImageRejected {
        mime_type: String,
        reason: String,
        view: String,
    },
    GenerationStarted {
        generation: u64,
        model: String,
        view: String,
    },
    GenerationSucceeded {
        generation: u64,
        latency_ms: u64,
        search_terms_bytes: usize,
        view: String,
    },
    GenerationFailed {
        generation: u64,
        kind: String,
        message: String,
        credential_expired: bool,
        view: String,
    },
    GenerationDiscarded {
        generation: u64,
        current: u64,
    },
    SessionReset {
        view: String,
    },
    SectionCopied {
        section: String,
        clipboard: bool,
    },
    SessionFinished {
        generations: u64,
    },
}

/// Append-only JSONL writer for session events.
///
/// - default fields are `type`, `session_id`, `ts`
/// - one compact JSON object per line
/// - a log built with [`EventLog::disabled`] still returns the event but writes nothing
#[derive(Debug, Clone)]
pub struct EventLog {
    inner: Arc<EventLogInner>,
}

#[derive(Debug)]
struct EventLogInner {
    path: Option<PathBuf>,
    session_id: String,
    lock: Mutex<()>,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self::build(Some(path.into()), session_id.into())
    }

    pub fn disabled(session_id: impl Into<String>) -> Self {
        Self::build(None, session_id.into())
    }

    fn build(path: Option<PathBuf>, session_id: String) -> Self {
        Self {
            inner: Arc::new(EventLogInner {
                path,
                session_id,
                lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    pub fn emit(&self, event: &SessionEvent) -> anyhow::Result<Value> {
        let mut row = Map::new();
        row.insert(
            "session_id".to_string(),
            Value::String(self.inner.session_id.clone()),
        );
        row.insert("ts".to_string(), Value::String(now_utc_iso()));
        if let Value::Object(fields) = serde_json::to_value(event)? {
            for (key, value) in fields {
                row.insert(key, value);
            }
        }
        let row = Value::Object(row);

        let Some(path) = self.inner.path.as_ref() else {
            return Ok(row);
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let line = serde_json::to_string(&row)?;
        let _guard = self
            .inner
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("event log lock poisoned"))?;
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;

        Ok(row)
    }
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::DateTime;
    use serde_json::{json, Value};

    use super::*;

    #[test]
    fn emit_writes_compact_jsonl_line() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let log = EventLog::new(&path, "session-123");

        let emitted = log.emit(&SessionEvent::ImageSelected {
            mime_type: "image/png".to_string(),
            bytes: 2048,
            view: "image_selected".to_string(),
        })?;

        let content = fs::read_to_string(&path)?;
        let line = content.lines().next().unwrap_or("");
        let parsed: Value = serde_json::from_str(line)?;

        assert_eq!(parsed, emitted);
        assert_eq!(parsed["type"], json!("image_selected"));
        assert_eq!(parsed["session_id"], json!("session-123"));
        assert_eq!(parsed["mime_type"], json!("image/png"));
        assert_eq!(parsed["bytes"], json!(2048));

        let ts = parsed["ts"].as_str().unwrap_or("");
        DateTime::parse_from_rfc3339(ts)?;
        Ok(())
    }

    #[test]
    fn emit_appends_lines() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("nested").join("events.jsonl");
        let log = EventLog::new(&path, "session-123");

        log.emit(&SessionEvent::SessionReset {
            view: "idle".to_string(),
        })?;
        log.emit(&SessionEvent::SessionFinished { generations: 2 })?;

        let content = fs::read_to_string(&path)?;
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: Value = serde_json::from_str(lines[0])?;
        let second: Value = serde_json::from_str(lines[1])?;
        assert_eq!(first["type"], json!("session_reset"));
        assert_eq!(second["type"], json!("session_finished"));
        assert_eq!(second["generations"], json!(2));
        Ok(())
    }

    #[test]
    fn disabled_log_returns_event_without_writing() -> anyhow::Result<()> {
        let log = EventLog::disabled("session-off");
        assert!(log.path().is_none());
        let emitted = log.emit(&SessionEvent::GenerationDiscarded {
            generation: 1,
            current: 2,
        })?;
        assert_eq!(emitted["type"], json!("generation_discarded"));
        assert_eq!(emitted["session_id"], json!("session-off"));
        Ok(())
    }
}
