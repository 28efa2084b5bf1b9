// Trace module
// Append-only JSONL record of served recommendations


use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::Result;

pub const TRACE_FILE_NAME: &str = "traces.jsonl";

/// Writer for `<logs_dir>/traces.jsonl`.
///
/// Each line is one JSON object carrying `id`, `ts` and the payload fields.
/// Clones share the same write lock, so lines from concurrent requests never
/// interleave within this process.
#[derive(Debug, Clone)]
pub struct TraceLog {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl TraceLog {
    #[inline]
    pub fn new<P: AsRef<Path>>(logs_dir: P) -> Self {
        Self {
            path: logs_dir.as_ref().join(TRACE_FILE_NAME),
            lock: Arc::new(Mutex::new(())),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one trace line and return its id.
    ///
    /// Object payloads are flattened next to `id` and `ts`; any other JSON
    /// value is stored under `payload`.
    #[inline]
    pub fn append<T: Serialize>(&self, payload: &T) -> Result<String> {
        let id = Uuid::new_v4().to_string();

        let mut record = Map::new();
        record.insert("id".to_string(), Value::String(id.clone()));
        record.insert(
            "ts".to_string(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );

        match serde_json::to_value(payload).context("Failed to serialize trace payload")? {
            Value::Object(fields) => {
                for (key, value) in fields {
                    if key != "id" && key != "ts" {
                        record.insert(key, value);
                    }
                }
            }
            other => {
                record.insert("payload".to_string(), other);
            }
        }

        let line = serde_json::to_string(&record).context("Failed to encode trace line")?;
        self.write_line(&line)?;

        debug!("Wrote trace {} to {}", id, self.path.display());
        Ok(id)
    }

    fn write_line(&self, line: &str) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("Trace log lock poisoned"))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}
