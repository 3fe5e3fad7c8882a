// Import tracing
// Append-only JSONL record of a bulk import: start, each rejected row, final counts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// What happened at one point of an import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ImportEvent {
    Started {
        method: String,
        operator: String,
        standard_run_id: i64,
    },
    RowFailed {
        line: u64,
        name: Option<String>,
        reason: String,
    },
    Finished {
        compounds_created: usize,
        retention_times_created: usize,
        retention_times_updated: usize,
        rows_skipped: usize,
        rows_failed: usize,
    },
}

/// A single line of the trace file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    pub timestamp: DateTime<Utc>,

    #[serde(flatten)]
    pub event: ImportEvent,
}

impl TraceEntry {
    pub fn new(event: ImportEvent) -> Self {
        TraceEntry {
            timestamp: Utc::now(),
            event,
        }
    }

    /// Serialize to JSON line (with newline)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

/// Appends entries to a JSONL trace file, creating it on first write.
///
/// Entries are written immediately and are not part of any database transaction; a
/// trace without a `Finished` entry describes an import that did not commit.
pub struct TraceWriter {
    file_path: PathBuf,
}

impl TraceWriter {
    pub fn new(file_path: PathBuf) -> Self {
        TraceWriter { file_path }
    }

    pub fn write(&self, event: ImportEvent) -> Result<(), TraceError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;

        let json_line = TraceEntry::new(event).to_json_line()?;
        file.write_all(json_line.as_bytes())?;
        file.flush()?;

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

/// Read trace entries from a JSONL file
pub fn read_trace_file(path: &Path) -> Result<Vec<TraceEntry>, TraceError> {
    let contents = std::fs::read_to_string(path)?;
    let mut entries = Vec::new();

    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let entry: TraceEntry = serde_json::from_str(line)?;
        entries.push(entry);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_trace_writer_appends() {
        let temp_dir = TempDir::new().unwrap();
        let trace_path = temp_dir.path().join("import.jsonl");
        let writer = TraceWriter::new(trace_path.clone());

        writer
            .write(ImportEvent::Started {
                method: "HILIC".to_string(),
                operator: "Lance".to_string(),
                standard_run_id: 1,
            })
            .unwrap();
        writer
            .write(ImportEvent::RowFailed {
                line: 3,
                name: Some("mystery".to_string()),
                reason: "bad formula".to_string(),
            })
            .unwrap();

        let entries = read_trace_file(writer.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(matches!(entries[0].event, ImportEvent::Started { standard_run_id: 1, .. }));
        assert_eq!(
            entries[1].event,
            ImportEvent::RowFailed {
                line: 3,
                name: Some("mystery".to_string()),
                reason: "bad formula".to_string(),
            }
        );
    }

    #[test]
    fn test_json_line_format() {
        let entry = TraceEntry::new(ImportEvent::Finished {
            compounds_created: 2,
            retention_times_created: 2,
            retention_times_updated: 0,
            rows_skipped: 1,
            rows_failed: 0,
        });
        let json_line = entry.to_json_line().unwrap();

        assert!(json_line.ends_with('\n'));

        let value: serde_json::Value = serde_json::from_str(json_line.trim()).unwrap();
        assert_eq!(value["event"], "finished");
        assert_eq!(value["rows_skipped"], 1);
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_read_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = read_trace_file(&temp_dir.path().join("absent.jsonl"));
        assert!(matches!(result, Err(TraceError::IoError(_))));
    }
}
