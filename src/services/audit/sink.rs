//! Audit sinks.
//!
//! An audit sink receives one finished record per call (a JSON object per line in the
//! normal path). It is kept apart from the application log so audit lines can be routed
//! on their own.
use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
    sync::Mutex,
};

use thiserror::Error;

/// `tracing` target used for audit records.
pub const AUDIT_TARGET: &str = "audit";

#[derive(Debug, Error)]
pub enum AuditSinkError {
    #[error("audit event serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("audit sink write failed: {0}")]
    Write(#[from] std::io::Error),
    #[error("audit sink lock poisoned")]
    Poisoned,
}

pub trait AuditSink: Send + Sync {
    fn write_record(&self, record: &str) -> Result<(), AuditSinkError>;
}

/// Emits records as `tracing` events under the `audit` target.
#[derive(Debug, Clone, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn write_record(&self, record: &str) -> Result<(), AuditSinkError> {
        tracing::info!(target: AUDIT_TARGET, "AUDIT_EVENT {record}");
        Ok(())
    }
}

/// Appends records to a dedicated file, one per line.
#[derive(Debug)]
pub struct FileAuditSink {
    file: Mutex<File>,
}

impl FileAuditSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditSinkError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn write_record(&self, record: &str) -> Result<(), AuditSinkError> {
        let mut file = self.file.lock().map_err(|_| AuditSinkError::Poisoned)?;
        // Single write per record keeps lines from interleaving.
        let mut line = String::with_capacity(record.len() + 1);
        line.push_str(record);
        line.push('\n');
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

/// Collects records in memory (tests, local tooling).
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    records: Mutex<Vec<String>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<String> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Records that parse as JSON objects.
    pub fn json_records(&self) -> Vec<serde_json::Value> {
        self.records()
            .iter()
            .filter_map(|r| serde_json::from_str(r).ok())
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn write_record(&self, record: &str) -> Result<(), AuditSinkError> {
        self.records
            .lock()
            .map_err(|_| AuditSinkError::Poisoned)?
            .push(record.to_string());
        Ok(())
    }
}
