// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Audit sink.
//!
//! Every committed mutation emits one [`ChangeLogEntry`] per touched row. Entries are
//! handed to the sink only after the whole operation succeeded, so a rejected mutation
//! never reaches it.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Kind of change recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Saved,
    Deleted,
}

impl ChangeAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Saved => "saved",
            Self::Deleted => "deleted",
        }
    }
}

/// Append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLogEntry {
    pub table_name: String,
    pub table_row: u64,
    /// Serialized row as it was saved or just before deletion
    pub data: serde_json::Value,
    pub action: ChangeAction,
    pub timestamp: DateTime<Utc>,
}

/// Write-only destination for audit records.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: ChangeLogEntry);
}

/// Sink that drops every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _entry: ChangeLogEntry) {}
}

/// Sink that emits every record as a structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: ChangeLogEntry) {
        info!(
            table = %entry.table_name,
            row = entry.table_row,
            action = entry.action.as_str(),
            data = %entry.data,
            "audit"
        );
    }
}

/// In-memory sink that also answers history queries.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<ChangeLogEntry>>,
}

impl MemoryAuditSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record for one row, oldest first.
    #[must_use]
    pub fn history(&self, table_name: &str, table_row: u64) -> Vec<ChangeLogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.table_name == table_name && e.table_row == table_row)
            .cloned()
            .collect()
    }

    /// Every record, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<ChangeLogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: ChangeLogEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}
